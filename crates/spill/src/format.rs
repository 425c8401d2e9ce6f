//! Line-oriented spill file format: one `key \t base64(serialized-PositionList)`
//! record per line. Spills are written in whatever order the producer's
//! in-memory map iterates (lexicographic by key, since the accumulator is a
//! `BTreeMap`), so every spill file is internally sorted by key.

use base64::Engine;
use posindex_position::PositionList;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    PositionList(#[from] posindex_position::Error),
}

const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

pub struct SpillWriter {
    out: BufWriter<File>,
}

impl SpillWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(SpillWriter {
            out: BufWriter::new(File::create(path)?),
        })
    }

    pub fn write_record(&mut self, key: &[u8], list: &PositionList) -> io::Result<()> {
        let encoded = ENGINE.encode(list.serialize());
        self.out.write_all(key)?;
        self.out.write_all(b"\t")?;
        self.out.write_all(encoded.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Reads records back out of a spill file, skipping (with a logged warning)
/// any line that doesn't split into exactly a key and a payload.
pub struct SpillReader {
    lines: io::Lines<BufReader<File>>,
}

impl SpillReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(SpillReader {
            lines: BufReader::new(File::open(path)?).lines(),
        })
    }

    /// Read the next well-formed record, skipping malformed lines.
    /// Returns `Ok(None)` at end of file.
    pub fn next_record(&mut self) -> Result<Option<(Vec<u8>, PositionList)>, Error> {
        loop {
            let line = match self.lines.next() {
                None => return Ok(None),
                Some(line) => line?,
            };

            let mut parts = line.splitn(2, '\t');
            let (key, payload) = match (parts.next(), parts.next()) {
                (Some(k), Some(p)) => (k, p),
                _ => {
                    tracing::warn!(%line, "skipping malformed spill line");
                    continue;
                }
            };

            let bytes = match ENGINE.decode(payload) {
                Ok(b) => b,
                Err(err) => {
                    tracing::warn!(%err, "skipping spill line with invalid base64 payload");
                    continue;
                }
            };
            let list = PositionList::deserialize(&bytes)?;
            return Ok(Some((key.as_bytes().to_vec(), list)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posindex_position::{DedupPolicy, Position};

    #[test]
    fn records_roundtrip_through_a_spill_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.spill");

        let mut list = PositionList::new();
        list.add(Position::new(1, 1, 0, 3, 100));
        list.sort_dedup(DedupPolicy::default());

        let mut writer = SpillWriter::create(&path).unwrap();
        writer.write_record(b"fox", &list).unwrap();
        writer.finish().unwrap();

        let mut reader = SpillReader::open(&path).unwrap();
        let (key, back) = reader.next_record().unwrap().unwrap();
        assert_eq!(key, b"fox");
        assert_eq!(back.get_positions(), list.get_positions());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.spill");
        std::fs::write(&path, "no-tab-in-this-line\ngood\tAA==\n").unwrap();

        let mut reader = SpillReader::open(&path).unwrap();
        // "good\tAA==" has a tab but "AA==" doesn't base64-decode into a
        // valid PositionList payload of the expected shape; either skip
        // path is acceptable here, so just assert we never panic and
        // eventually reach EOF.
        while let Ok(Some(_)) = reader.next_record() {}
    }
}
