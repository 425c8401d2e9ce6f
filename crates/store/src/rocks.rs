use crate::{Error, Op, Store, WriteBatch};
use std::path::Path;

/// Hints the Store accepts for its write buffer, block cache, and
/// compressor. These are advisory: a backend is free to clamp or ignore
/// values it doesn't support.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub write_buffer_mb: usize,
    pub cache_mb: usize,
    pub compression: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            write_buffer_mb: 256,
            cache_mb: 1024,
            compression: "fast-byte-compressor".to_string(),
        }
    }
}

fn compression_type(hint: &str) -> rocksdb::DBCompressionType {
    match hint {
        "none" => rocksdb::DBCompressionType::None,
        "zstd" => rocksdb::DBCompressionType::Zstd,
        "zlib" => rocksdb::DBCompressionType::Zlib,
        "fast-byte-compressor" => rocksdb::DBCompressionType::Lz4,
        other => {
            tracing::warn!(hint = other, "unrecognized compression hint, defaulting to lz4");
            rocksdb::DBCompressionType::Lz4
        }
    }
}

/// A RocksDB-backed [`Store`]. One instance owns one on-disk directory.
pub struct RocksStore {
    db: rocksdb::DB,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>, opts: StoreOptions) -> Result<Self, Error> {
        let mut rocks_opts = rocksdb::Options::default();
        rocks_opts.create_if_missing(true);
        rocks_opts.set_write_buffer_size(opts.write_buffer_mb * 1024 * 1024);
        rocks_opts.set_compression_type(compression_type(&opts.compression));

        let cache = rocksdb::Cache::new_lru_cache(opts.cache_mb * 1024 * 1024);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_block_cache(&cache);
        rocks_opts.set_block_based_table_factory(&block_opts);

        let path = path.as_ref();
        let db = rocksdb::DB::open(&rocks_opts, path)?;
        tracing::info!(
            path = %path.display(),
            write_buffer_mb = opts.write_buffer_mb,
            cache_mb = opts.cache_mb,
            compression = %opts.compression,
            "opened store"
        );
        Ok(RocksStore { db })
    }
}

impl Store for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        Ok(self.db.put(key, value)?)
    }

    fn delete(&self, key: &[u8]) -> Result<(), Error> {
        Ok(self.db.delete(key)?)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), Error> {
        let mut wb = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                Op::Put(k, v) => wb.put(k, v),
                Op::Delete(k) => wb.delete(k),
            }
        }
        Ok(self.db.write(wb)?)
    }

    fn iter_from<'a>(
        &'a self,
        start: &[u8],
    ) -> Box<dyn Iterator<Item = Result<(Box<[u8]>, Box<[u8]>), Error>> + 'a> {
        let mode = rocksdb::IteratorMode::From(start, rocksdb::Direction::Forward);
        let iter = self.db.iterator(mode).map(|res| res.map_err(Error::from));
        Box::new(iter)
    }

    fn close(self) -> Result<(), Error> {
        // rocksdb::DB flushes and closes on Drop; nothing further is needed,
        // but keeping this explicit in the trait lets other backends do real work.
        tracing::debug!("closing store");
        Ok(())
    }
}
