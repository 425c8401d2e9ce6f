use crate::codec::{self, CodecError};
use crate::position::{is_duplicate, AnnotationKind, DedupPolicy, Date, Position, StitchExt};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("corrupt position list payload")]
    CorruptPayload(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// An ordered, deduplicated collection of [`Position`]s: the in-memory form
/// of a single posting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionList {
    positions: Vec<Position>,
}

impl PositionList {
    pub fn new() -> Self {
        PositionList { positions: Vec::new() }
    }

    pub fn from_positions(positions: Vec<Position>) -> Self {
        PositionList { positions }
    }

    pub fn add(&mut self, p: Position) {
        self.positions.push(p);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// A read-only view of the positions. Safe to iterate as long as no
    /// mutating method is called concurrently; `PositionList` is not `Sync`
    /// across mutation the way a lock-guarded type would be, so callers own
    /// that discipline themselves (mutation requires `&mut self`).
    pub fn get_positions(&self) -> &[Position] {
        &self.positions
    }

    /// Stable ascending sort by the four-field comparator. Does not dedup.
    pub fn sort(&mut self) {
        self.positions.sort_by_key(Position::sort_key);
    }

    /// Sort and collapse duplicates (exact or fuzzy, per `policy`) in a
    /// single forward sweep: each candidate is compared only against the
    /// most recently retained position, which is sufficient because
    /// duplicates only ever occur among positions already adjacent in
    /// `(document_id, sentence_id, begin_char, end_char)` order.
    pub fn sort_dedup(&mut self, policy: DedupPolicy) {
        self.sort();
        let mut out: Vec<Position> = Vec::with_capacity(self.positions.len());
        for p in self.positions.drain(..) {
            match out.last() {
                Some(last) if is_duplicate(last, &p, policy) => continue,
                _ => out.push(p),
            }
        }
        self.positions = out;
    }

    /// Merge `other` into `self`: union of both lists, sorted and
    /// deduplicated. Commutative and associative modulo the comparator.
    pub fn merge(mut self, other: PositionList, policy: DedupPolicy) -> PositionList {
        self.positions.extend(other.positions);
        self.sort_dedup(policy);
        self
    }

    /// Serialize to the self-describing binary block of the position list
    /// format, deflate-compressed. An empty list serializes to zero bytes.
    /// Always sorts first, so every caller gets sorted output regardless of
    /// whether it already sorted or deduplicated the list itself.
    pub fn serialize(&self) -> Vec<u8> {
        if self.positions.is_empty() {
            return Vec::new();
        }

        let mut sorted: Vec<&Position> = self.positions.iter().collect();
        sorted.sort_by_key(|p| p.sort_key());

        let mut raw = Vec::new();
        Self::write_raw_block(&sorted, &mut raw).expect("writing to Vec never fails");

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).expect("writing to Vec never fails");
        encoder.finish().expect("deflate of in-memory buffer never fails")
    }

    fn write_raw_block<W: Write>(positions: &[&Position], w: &mut W) -> io::Result<()> {
        let n = positions.len();
        w.write_i32::<LittleEndian>(n as i32)?;

        let doc: Vec<i32> = positions.iter().map(|p| p.document_id).collect();
        let sent: Vec<i32> = positions.iter().map(|p| p.sentence_id).collect();
        let begin: Vec<i32> = positions.iter().map(|p| p.begin_char).collect();
        let end: Vec<i32> = positions.iter().map(|p| p.end_char).collect();

        codec::write_column(w, &doc)?;
        codec::write_column(w, &sent)?;
        codec::write_column(w, &begin)?;
        codec::write_column(w, &end)?;

        for p in positions {
            w.write_i64::<LittleEndian>(p.date)?;
        }

        // Stitch extension: a presence byte, then (synonym_id, kind) pairs if set.
        let has_stitch = positions.iter().any(|p| p.stitch.is_some());
        w.write_u8(has_stitch as u8)?;
        if has_stitch {
            for p in positions {
                let ext = p.stitch.unwrap_or(StitchExt {
                    synonym_id: -1,
                    annotation_kind: AnnotationKind::Date,
                });
                w.write_i32::<LittleEndian>(ext.synonym_id)?;
                w.write_u8(ext.annotation_kind as u8)?;
            }
        }

        Ok(())
    }

    /// Deserialize bytes previously produced by [`Self::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<PositionList, Error> {
        if bytes.is_empty() {
            return Ok(PositionList::new());
        }

        let mut decoder = DeflateDecoder::new(bytes);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;

        let mut cursor = io::Cursor::new(raw);
        let n = cursor.read_i32::<LittleEndian>().map_err(|_| CodecError::Truncated)?;
        if n < 0 || n as i64 > 200_000_000 {
            return Err(CodecError::ImplausibleLength(n as i64).into());
        }
        let n = n as usize;

        let doc = codec::read_column(&mut cursor)?;
        let sent = codec::read_column(&mut cursor)?;
        let begin = codec::read_column(&mut cursor)?;
        let end = codec::read_column(&mut cursor)?;
        if doc.len() != n || sent.len() != n || begin.len() != n || end.len() != n {
            return Err(CodecError::ImplausibleLength(n as i64).into());
        }

        let mut dates = Vec::with_capacity(n);
        for _ in 0..n {
            dates.push(cursor.read_i64::<LittleEndian>().map_err(|_| CodecError::Truncated)?);
        }

        let has_stitch = cursor.read_u8().map_err(|_| CodecError::Truncated)? != 0;
        let mut stitches: Vec<Option<StitchExt>> = vec![None; n];
        if has_stitch {
            for slot in stitches.iter_mut() {
                let synonym_id = cursor.read_i32::<LittleEndian>().map_err(|_| CodecError::Truncated)?;
                let kind_byte = cursor.read_u8().map_err(|_| CodecError::Truncated)?;
                let kind = AnnotationKind::from_u8(kind_byte).ok_or(CodecError::Truncated)?;
                *slot = Some(StitchExt {
                    synonym_id,
                    annotation_kind: kind,
                });
            }
        }

        let mut positions = Vec::with_capacity(n);
        for i in 0..n {
            if begin[i] < 0 || begin[i] > end[i] {
                return Err(CodecError::ImplausibleLength(begin[i] as i64).into());
            }
            positions.push(Position {
                document_id: doc[i],
                sentence_id: sent[i],
                begin_char: begin[i],
                end_char: end[i],
                date: dates[i] as Date,
                stitch: stitches[i],
            });
        }

        Ok(PositionList { positions })
    }
}

impl IntoIterator for PositionList {
    type Item = Position;
    type IntoIter = std::vec::IntoIter<Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_iter()
    }
}

impl FromIterator<Position> for PositionList {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        PositionList {
            positions: iter.into_iter().collect(),
        }
    }
}
