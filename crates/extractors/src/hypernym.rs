use crate::extractor::{Extraction, Extractor};
use crate::rows::{Batch, DependencyRow};
use crate::sanitize::make_key;
use crate::stopwords::StopwordSet;
use posindex_position::Position;

/// Relations treated as signaling a hypernym/hyponym relationship between
/// their head and dependent (e.g. "cities such as Paris" via `nmod:such_as`).
const RELATION_ALLOWLIST: &[&str] = &["nmod:such_as", "nmod:as", "nmod:including", "conj:and", "conj:or"];

/// One key per `(head, dependent)` pair for dependency rows whose relation
/// is in the hypernym allow-list and whose tokens are not stopwords. Unlike
/// [`DependencyExtractor`](crate::dependency::DependencyExtractor), the
/// relation itself is not part of the key: hypernym postings group by the
/// term pair regardless of which allow-listed relation produced it.
pub struct HypernymExtractor {
    stopwords: StopwordSet,
}

impl HypernymExtractor {
    pub fn new(stopwords: StopwordSet) -> Self {
        HypernymExtractor { stopwords }
    }

    fn admits(&self, row: &DependencyRow) -> bool {
        RELATION_ALLOWLIST.contains(&row.relation.as_str())
            && !self.stopwords.contains(&row.head_token)
            && !self.stopwords.contains(&row.dependent_token)
    }
}

impl Extractor for HypernymExtractor {
    fn flavor(&self) -> &'static str {
        "hypernym"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        batch
            .dependencies
            .iter()
            .filter(|row| self.admits(row))
            .map(|row: &DependencyRow| {
                let key = make_key(&[&row.head_token.to_lowercase(), &row.dependent_token.to_lowercase()]);
                let begin = row.head_begin.min(row.dep_begin);
                let end = row.head_end.max(row.dep_end);
                let pos = Position::new(row.document_id, row.sentence_id, begin, end, row.date);
                (key, pos)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(head: &str, rel: &str, dependent: &str) -> DependencyRow {
        DependencyRow {
            document_id: 1,
            sentence_id: 1,
            date: 19723,
            head_token: head.to_string(),
            head_begin: 0,
            head_end: 5,
            dependent_token: dependent.to_string(),
            dep_begin: 7,
            dep_end: 14,
            relation: rel.to_string(),
        }
    }

    #[test]
    fn allowlisted_relation_emits_pair_key() {
        let batch = Batch {
            annotations: vec![],
            dependencies: vec![dep("cities", "nmod:such_as", "paris")],
        };
        let out = HypernymExtractor::new(StopwordSet::empty()).extract(&batch);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, b"cities\x00paris".to_vec());
    }

    #[test]
    fn non_allowlisted_relation_is_skipped() {
        let batch = Batch {
            annotations: vec![],
            dependencies: vec![dep("runs", "nsubj", "fox")],
        };
        assert!(HypernymExtractor::new(StopwordSet::empty()).extract(&batch).is_empty());
    }

    #[test]
    fn stopword_head_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stop.txt");
        std::fs::write(&path, "the\n").unwrap();
        let batch = Batch {
            annotations: vec![],
            dependencies: vec![dep("the", "nmod:such_as", "paris")],
        };
        assert!(HypernymExtractor::new(StopwordSet::load(&path).unwrap()).extract(&batch).is_empty());
    }
}
