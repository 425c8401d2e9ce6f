//! Prepares each flavor's output directory before a run, per the one-way
//! rules: create if absent, keep if `preserve_existing`, refuse a large
//! deletion without confirmation, otherwise wipe and recreate.

use crate::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct IndexDirPolicy {
    pub preserve_existing: bool,
    pub size_threshold_bytes: u64,
    pub confirmed: bool,
}

impl Default for IndexDirPolicy {
    fn default() -> Self {
        IndexDirPolicy {
            preserve_existing: false,
            size_threshold_bytes: 1 << 30,
            confirmed: false,
        }
    }
}

/// Ensure `dir` is ready to receive a fresh flavor's output, per
/// `policy`. Returns the same path for chaining.
pub fn prepare(dir: &Path, policy: IndexDirPolicy) -> Result<PathBuf, Error> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(dir.to_path_buf());
    }

    if policy.preserve_existing {
        tracing::info!(?dir, "preserving existing index directory");
        return Ok(dir.to_path_buf());
    }

    let size = dir_size(dir)?;
    if size >= policy.size_threshold_bytes && !policy.confirmed {
        return Err(Error::Config(format!(
            "refusing to delete {dir:?} ({size} bytes >= threshold {}): pass confirmation to proceed",
            policy.size_threshold_bytes
        )));
    }

    fs::remove_dir_all(dir)?;
    fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

fn dir_size(dir: &Path) -> Result<u64, Error> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}
