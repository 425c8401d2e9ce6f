use crate::extractor::{Extraction, Extractor};
use crate::rows::{Batch, DependencyRow};
use crate::sanitize::make_key;
use crate::stopwords::StopwordSet;
use posindex_position::Position;

/// Relations carrying no indexable semantic content; dependency postings
/// for these are dropped regardless of the tokens involved.
const RELATION_BLACKLIST: &[&str] = &["punct", "det", "case", "cc"];

/// One key per `(head, relation, dependent)` triple, skipping blacklisted
/// relations and pairs where either token is a stopword.
pub struct DependencyExtractor {
    stopwords: StopwordSet,
}

impl DependencyExtractor {
    pub fn new(stopwords: StopwordSet) -> Self {
        DependencyExtractor { stopwords }
    }

    fn admits(&self, row: &DependencyRow) -> bool {
        if RELATION_BLACKLIST.contains(&row.relation.as_str()) {
            return false;
        }
        if self.stopwords.contains(&row.head_token) || self.stopwords.contains(&row.dependent_token) {
            return false;
        }
        true
    }
}

impl Extractor for DependencyExtractor {
    fn flavor(&self) -> &'static str {
        "dependency"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        batch
            .dependencies
            .iter()
            .filter(|row| self.admits(row))
            .map(|row| {
                let key = make_key(&[&row.head_token.to_lowercase(), &row.relation, &row.dependent_token.to_lowercase()]);
                let begin = row.head_begin.min(row.dep_begin);
                let end = row.head_end.max(row.dep_end);
                let pos = Position::new(row.document_id, row.sentence_id, begin, end, row.date);
                (key, pos)
            })
            .collect()
    }
}
