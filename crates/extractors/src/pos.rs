use crate::extractor::{Extraction, Extractor};
use crate::rows::Batch;
use crate::sanitize::make_key;
use posindex_position::Position;

/// One key per part-of-speech tag, keyed directly off the tag string itself
/// with no stopword filtering — function words carry POS signal that
/// unigram extraction discards.
pub struct PosExtractor;

impl Extractor for PosExtractor {
    fn flavor(&self) -> &'static str {
        "pos"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        batch
            .annotations
            .iter()
            .filter_map(|row| {
                let tag = row.pos.as_deref()?;
                let tag = tag.trim();
                if tag.is_empty() {
                    return None;
                }
                let key = make_key(&[tag]);
                let pos = Position::new(row.document_id, row.sentence_id, row.begin_char, row.end_char, row.date);
                Some((key, pos))
            })
            .collect()
    }
}
