use crate::extractor::{Extraction, Extractor};
use crate::rows::Batch;
use crate::sanitize::make_key;
use crate::stopwords::StopwordSet;
use posindex_position::Position;

/// One key per lemma, skipping stopwords and empty/missing lemmas.
pub struct UnigramExtractor {
    stopwords: StopwordSet,
}

impl UnigramExtractor {
    pub fn new(stopwords: StopwordSet) -> Self {
        UnigramExtractor { stopwords }
    }

    /// True when `row.lemma` should contribute a unigram posting.
    pub(crate) fn admits(&self, lemma: &Option<String>) -> Option<&str> {
        let lemma = lemma.as_deref()?;
        let trimmed = lemma.trim();
        if trimmed.is_empty() {
            return None;
        }
        if self.stopwords.contains(trimmed) {
            return None;
        }
        Some(trimmed)
    }
}

impl Extractor for UnigramExtractor {
    fn flavor(&self) -> &'static str {
        "unigram"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        batch
            .annotations
            .iter()
            .filter_map(|row| {
                let lemma = self.admits(&row.lemma)?;
                let key = make_key(&[lemma]);
                let pos = Position::new(row.document_id, row.sentence_id, row.begin_char, row.end_char, row.date);
                Some((key, pos))
            })
            .collect()
    }
}
