//! Run configuration: budgets and knobs that govern one `build` invocation.
//! Deserializable from a JSON file; CLI flags layered on top take
//! precedence, matching clap's own `file-defaults < file < CLI < env` rule.

use posindex_position::DedupPolicy;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of source rows fetched and extracted per streaming batch.
    pub batch_size: usize,
    /// Bump-allocator threshold (bytes) after which an in-memory
    /// accumulator spills to disk and starts fresh.
    pub spill_threshold_bytes: usize,
    /// Write-batch entries flushed to the store at a time during load.
    pub store_batch_size: usize,
    /// Upper bound (MiB) on the external merge's in-memory buffers; caps
    /// the accumulator's effective spill threshold alongside
    /// `spill_threshold_bytes`.
    pub memory_budget_mb: usize,
    /// Maximum number of spill files fused in a single external-merge pass.
    pub merge_fanin: usize,
    /// Number of extraction worker threads.
    pub threads: usize,
    /// Hint to the Store for its write-buffer size (MiB).
    pub write_buffer_mb: usize,
    /// Hint to the Store for its block-cache size (MiB).
    pub cache_mb: usize,
    /// Hint to the Store for which compressor to use.
    pub compression: String,
    /// Above this size (bytes), wiping an existing output directory
    /// requires explicit confirmation.
    pub size_threshold_bytes: u64,
    /// One stopword per line, lowercased. Required by every run.
    pub stopwords_path: Option<PathBuf>,
    /// Whether to keep intermediate spill files after a successful run
    /// (useful for debugging a failed load stage without re-extracting).
    pub preserve_spills: bool,
    #[serde(skip)]
    pub dedup_policy: DedupPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            batch_size: 10_000,
            spill_threshold_bytes: 1 << 28,
            store_batch_size: 10_000,
            memory_budget_mb: 256,
            merge_fanin: 10,
            threads: 4,
            write_buffer_mb: 256,
            cache_mb: 1024,
            compression: "fast-byte-compressor".to_string(),
            size_threshold_bytes: 1 << 30,
            stopwords_path: None,
            preserve_spills: false,
            dedup_policy: DedupPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, crate::Error> {
        serde_json::from_str(s).map_err(|e| crate::Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.batch_size == 0 {
            return Err(crate::Error::Config("batch_size must be nonzero".into()));
        }
        if self.store_batch_size == 0 {
            return Err(crate::Error::Config("store_batch_size must be nonzero".into()));
        }
        if self.merge_fanin < 2 {
            return Err(crate::Error::Config("merge_fanin must be at least 2".into()));
        }
        if self.threads == 0 {
            return Err(crate::Error::Config("threads must be nonzero".into()));
        }
        Ok(())
    }
}
