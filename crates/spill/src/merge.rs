//! K-way external merge of sorted spill runs, with fan-in passes so the
//! number of simultaneously open files stays bounded regardless of how many
//! spills a run produced.

use crate::format::{Error, SpillReader, SpillWriter};
use posindex_position::{DedupPolicy, PositionList};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct MergeConfig {
    /// Maximum number of spills fused in a single merge pass.
    pub fanin: usize,
    pub dedup_policy: DedupPolicy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            fanin: 10,
            dedup_policy: DedupPolicy::default(),
        }
    }
}

struct HeapItem {
    key: Vec<u8>,
    list: PositionList,
    reader_idx: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for HeapItem {}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

fn next_valid(reader: &mut SpillReader) -> Result<Option<(Vec<u8>, PositionList)>, Error> {
    reader.next_record()
}

/// Fuse the given already-sorted spill files into a single sorted,
/// key-deduplicated output file. Each contributing file may hold at most
/// one buffered record at a time, bounding merge memory to `O(fanin)`.
pub fn merge_into(
    input_paths: &[PathBuf],
    output_path: &Path,
    cfg: MergeConfig,
) -> Result<usize, Error> {
    let mut readers: Vec<SpillReader> = input_paths
        .iter()
        .map(SpillReader::open)
        .collect::<Result<_, _>>()?;

    let mut heap: BinaryHeap<Reverse<HeapItem>> = BinaryHeap::with_capacity(readers.len());
    for (idx, reader) in readers.iter_mut().enumerate() {
        if let Some((key, list)) = next_valid(reader)? {
            heap.push(Reverse(HeapItem {
                key,
                list,
                reader_idx: idx,
            }));
        }
    }

    let mut writer = SpillWriter::create(output_path)?;
    let mut written = 0usize;

    while let Some(Reverse(top)) = heap.pop() {
        let HeapItem {
            key,
            mut list,
            reader_idx,
        } = top;

        if let Some((next_key, next_list)) = next_valid(&mut readers[reader_idx])? {
            heap.push(Reverse(HeapItem {
                key: next_key,
                list: next_list,
                reader_idx,
            }));
        }

        while let Some(Reverse(peeked)) = heap.peek() {
            if peeked.key != key {
                break;
            }
            let Reverse(next_top) = heap.pop().unwrap();
            list = list.merge(next_top.list, cfg.dedup_policy);

            if let Some((refill_key, refill_list)) = next_valid(&mut readers[next_top.reader_idx])? {
                heap.push(Reverse(HeapItem {
                    key: refill_key,
                    list: refill_list,
                    reader_idx: next_top.reader_idx,
                }));
            }
        }

        writer.write_record(&key, &list)?;
        written += 1;
    }

    writer.finish()?;
    Ok(written)
}

/// Collapse an arbitrary number of sorted spills into one fully merged,
/// key-ascending, key-deduplicated run. Performs successive fan-in-bounded
/// passes when there are more spills than `cfg.fanin`; intermediate spills
/// from prior passes are deleted once consumed.
pub fn external_merge(
    spill_paths: Vec<PathBuf>,
    tmp_dir: &Path,
    cfg: MergeConfig,
) -> Result<PathBuf, Error> {
    if spill_paths.is_empty() {
        let empty = tmp_dir.join("merge-empty.spill");
        SpillWriter::create(&empty)?.finish()?;
        return Ok(empty);
    }

    let mut current = spill_paths;
    let mut is_original = true;
    let mut pass = 0usize;

    while current.len() > 1 {
        let mut next_round = Vec::new();
        for (i, chunk) in current.chunks(cfg.fanin.max(2)).enumerate() {
            let out_path = tmp_dir.join(format!("merge-pass{pass}-{i}.spill"));
            merge_into(chunk, &out_path, cfg)?;
            next_round.push(out_path);
        }

        if !is_original {
            for p in &current {
                let _ = std::fs::remove_file(p);
            }
        }

        current = next_round;
        is_original = false;
        pass += 1;
    }

    Ok(current.into_iter().next().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SpillReader;
    use posindex_position::Position;

    fn write_spill(dir: &Path, name: &str, entries: &[(&str, Vec<Position>)]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = SpillWriter::create(&path).unwrap();
        let mut sorted: Vec<_> = entries.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        for (key, positions) in sorted {
            let mut list = PositionList::from_positions(positions);
            list.sort_dedup(DedupPolicy::default());
            writer.write_record(key.as_bytes(), &list).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn merges_two_spills_fusing_shared_keys() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_spill(
            dir.path(),
            "a.spill",
            &[
                ("brown", vec![Position::new(1, 1, 10, 15, 1)]),
                ("fox", vec![Position::new(1, 1, 16, 19, 1)]),
            ],
        );
        let b = write_spill(
            dir.path(),
            "b.spill",
            &[("fox", vec![Position::new(2, 1, 0, 3, 2)])],
        );

        let out = dir.path().join("out.spill");
        let written = merge_into(&[a, b], &out, MergeConfig::default()).unwrap();
        assert_eq!(written, 2);

        let mut reader = SpillReader::open(&out).unwrap();
        let (k0, v0) = reader.next_record().unwrap().unwrap();
        assert_eq!(k0, b"brown");
        assert_eq!(v0.len(), 1);

        let (k1, v1) = reader.next_record().unwrap().unwrap();
        assert_eq!(k1, b"fox");
        assert_eq!(v1.len(), 2);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn external_merge_collapses_more_spills_than_fanin() {
        let dir = tempfile::tempdir().unwrap();
        let mut spills = Vec::new();
        for i in 0..25 {
            let name = format!("spill-{i}.spill");
            spills.push(write_spill(
                dir.path(),
                &name,
                &[("k", vec![Position::new(i, 0, 0, 1, 0)])],
            ));
        }

        let cfg = MergeConfig {
            fanin: 4,
            ..Default::default()
        };
        let merged = external_merge(spills, dir.path(), cfg).unwrap();

        let mut reader = SpillReader::open(&merged).unwrap();
        let (key, list) = reader.next_record().unwrap().unwrap();
        assert_eq!(key, b"k");
        assert_eq!(list.len(), 25);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn external_merge_of_no_spills_yields_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let merged = external_merge(vec![], dir.path(), MergeConfig::default()).unwrap();
        let mut reader = SpillReader::open(&merged).unwrap();
        assert!(reader.next_record().unwrap().is_none());
    }
}
