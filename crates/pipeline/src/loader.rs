//! Loads a fully-merged spill run into a [`Store`], in ascending key order,
//! read-merging each key against whatever the store already holds so a
//! re-run over the same corpus is idempotent rather than duplicating
//! postings.

use crate::error::Error;
use posindex_position::{DedupPolicy, PositionList};
use posindex_spill::SpillReader;
use posindex_store::{Store, WriteBatch};
use std::path::Path;

/// Stream `merged_spill` into `store`, flushing a [`WriteBatch`] every
/// `batch_size` records.
pub fn load<S: Store>(merged_spill: &Path, store: &S, batch_size: usize, dedup_policy: DedupPolicy) -> Result<LoadStats, Error> {
    let mut reader = SpillReader::open(merged_spill)?;
    let mut batch = WriteBatch::new();
    let mut stats = LoadStats::default();

    loop {
        let record = reader.next_record()?;
        let Some((key, incoming)) = record else { break };

        let merged = match store.get(&key)? {
            Some(existing) if !existing.is_empty() => {
                let existing_list = PositionList::deserialize(&existing)?;
                existing_list.merge(incoming, dedup_policy)
            }
            _ => incoming,
        };

        batch.put(key, merged.serialize());
        stats.keys_loaded += 1;

        if batch.len() >= batch_size {
            store.write_batch(std::mem::take(&mut batch))?;
            stats.batches_flushed += 1;
        }
    }

    if !batch.is_empty() {
        store.write_batch(batch)?;
        stats.batches_flushed += 1;
    }

    Ok(stats)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoadStats {
    pub keys_loaded: usize,
    pub batches_flushed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use posindex_position::Position;
    use posindex_spill::SpillWriter;
    use posindex_store::RocksStore;

    fn write_spill(path: &Path, entries: &[(&str, Vec<Position>)]) {
        let mut writer = SpillWriter::create(path).unwrap();
        for (key, positions) in entries {
            let mut list = PositionList::from_positions(positions.clone());
            list.sort_dedup(DedupPolicy::default());
            writer.write_record(key.as_bytes(), &list).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn loads_fresh_keys_into_empty_store() {
        let spill_dir = tempfile::tempdir().unwrap();
        let spill_path = spill_dir.path().join("merged.spill");
        write_spill(&spill_path, &[("fox", vec![Position::new(1, 1, 0, 3, 0)])]);

        let store_dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(store_dir.path(), Default::default()).unwrap();

        let stats = load(&spill_path, &store, 100, DedupPolicy::default()).unwrap();
        assert_eq!(stats.keys_loaded, 1);

        let value = store.get(b"fox").unwrap().unwrap();
        let list = PositionList::deserialize(&value).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn rerun_merges_rather_than_duplicates() {
        let spill_dir = tempfile::tempdir().unwrap();
        let spill_path = spill_dir.path().join("merged.spill");
        write_spill(&spill_path, &[("fox", vec![Position::new(1, 1, 0, 3, 0)])]);

        let store_dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(store_dir.path(), Default::default()).unwrap();

        load(&spill_path, &store, 100, DedupPolicy::default()).unwrap();
        load(&spill_path, &store, 100, DedupPolicy::default()).unwrap();

        let value = store.get(b"fox").unwrap().unwrap();
        let list = PositionList::deserialize(&value).unwrap();
        assert_eq!(list.len(), 1, "re-loading the same posting must not duplicate it");
    }
}
