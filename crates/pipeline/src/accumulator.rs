//! In-memory key accumulation with threshold-triggered spilling, the
//! positional-index analog of `doc::combine::Accumulator`'s
//! MemTable-then-SpillWriter pattern.

use crate::error::Error;
use posindex_position::{DedupPolicy, PositionList};
use posindex_spill::SpillWriter;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Accumulates `key -> PositionList` postings in memory, spilling to a new
/// file once the accumulated byte estimate crosses `threshold_bytes`. Each
/// spill is already key-sorted (the map is a `BTreeMap`) and
/// dedup-collapsed, so the external merge stage only has to fuse runs, never
/// resort them.
pub struct Accumulator {
    table: BTreeMap<Vec<u8>, PositionList>,
    bytes_estimate: usize,
    threshold_bytes: usize,
    dedup_policy: DedupPolicy,
    spill_dir: PathBuf,
    next_spill_id: usize,
    spills: Vec<PathBuf>,
}

impl Accumulator {
    pub fn new(spill_dir: impl Into<PathBuf>, threshold_bytes: usize, dedup_policy: DedupPolicy) -> Self {
        Accumulator {
            table: BTreeMap::new(),
            bytes_estimate: 0,
            threshold_bytes,
            dedup_policy,
            spill_dir: spill_dir.into(),
            next_spill_id: 0,
            spills: Vec::new(),
        }
    }

    /// Add one extracted posting, spilling first if the accumulator is
    /// already over threshold.
    pub fn add(&mut self, key: Vec<u8>, position: posindex_position::Position) -> Result<(), Error> {
        if self.bytes_estimate >= self.threshold_bytes && !self.table.is_empty() {
            self.spill()?;
        }

        self.bytes_estimate += key.len() + POSITION_BYTE_ESTIMATE;
        self.table.entry(key).or_insert_with(PositionList::new).add(position);
        Ok(())
    }

    /// Force a spill of whatever is currently accumulated, resetting the
    /// in-memory table. No-op if the table is empty.
    pub fn spill(&mut self) -> Result<(), Error> {
        if self.table.is_empty() {
            return Ok(());
        }

        let path = self.spill_dir.join(format!("spill-{:06}.spill", self.next_spill_id));
        self.next_spill_id += 1;

        let mut writer = SpillWriter::create(&path)?;
        for (key, mut list) in std::mem::take(&mut self.table) {
            list.sort_dedup(self.dedup_policy);
            writer.write_record(&key, &list)?;
        }
        writer.finish()?;

        self.spills.push(path);
        self.bytes_estimate = 0;
        Ok(())
    }

    /// Flush any remaining in-memory contents and return every spill path
    /// produced over the accumulator's lifetime, in creation order.
    pub fn finish(mut self) -> Result<Vec<PathBuf>, Error> {
        self.spill()?;
        Ok(self.spills)
    }

    pub fn spill_dir(&self) -> &Path {
        &self.spill_dir
    }
}

/// Rough fixed per-position memory cost used to decide when to spill. We
/// don't track exact heap usage (no arena allocator backs this table), so
/// this triggers spills on accumulated posting count rather than true
/// resident bytes.
const POSITION_BYTE_ESTIMATE: usize = 40;

#[cfg(test)]
mod tests {
    use super::*;
    use posindex_position::Position;
    use posindex_spill::SpillReader;

    #[test]
    fn accumulates_without_spilling_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = Accumulator::new(dir.path(), 1 << 20, DedupPolicy::default());
        acc.add(b"fox".to_vec(), Position::new(1, 1, 0, 3, 0)).unwrap();
        let spills = acc.finish().unwrap();
        assert_eq!(spills.len(), 1);

        let mut reader = SpillReader::open(&spills[0]).unwrap();
        let (key, list) = reader.next_record().unwrap().unwrap();
        assert_eq!(key, b"fox");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn exceeding_threshold_triggers_multiple_spills() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = Accumulator::new(dir.path(), 100, DedupPolicy::default());
        for i in 0..10 {
            acc.add(format!("key{i}").into_bytes(), Position::new(1, 1, 0, 3, 0)).unwrap();
        }
        let spills = acc.finish().unwrap();
        assert!(spills.len() > 1);
    }

    #[test]
    fn empty_accumulator_finishes_with_no_spills() {
        let dir = tempfile::tempdir().unwrap();
        let acc = Accumulator::new(dir.path(), 1 << 20, DedupPolicy::default());
        assert!(acc.finish().unwrap().is_empty());
    }
}
