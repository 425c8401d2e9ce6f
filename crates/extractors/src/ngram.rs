use crate::extractor::{Extraction, Extractor};
use crate::rows::{group_by_sentence, AnnotationRow, Batch};
use crate::sanitize::make_key;
use posindex_position::Position;

fn lemma_of(row: &AnnotationRow) -> Option<&str> {
    let l = row.lemma.as_deref()?;
    if l.trim().is_empty() {
        None
    } else {
        Some(l.trim())
    }
}

/// Consecutive-pair keys within a sentence: `lower(l1) \0 lower(l2)`.
/// Neither token may be null/empty; n-grams are never stopword-filtered.
pub struct BigramExtractor;

impl Extractor for BigramExtractor {
    fn flavor(&self) -> &'static str {
        "bigram"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        let mut out = Vec::new();
        for sentence in group_by_sentence(&batch.annotations, |r| (r.document_id, r.sentence_id)) {
            for pair in sentence.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let (Some(l1), Some(l2)) = (lemma_of(a), lemma_of(b)) else {
                    continue;
                };
                let key = make_key(&[l1, l2]);
                let pos = Position::new(a.document_id, a.sentence_id, a.begin_char, b.end_char, b.date);
                out.push((key, pos));
            }
        }
        out
    }
}

/// Consecutive-triple keys within a sentence: `lower(l1) \0 lower(l2) \0 lower(l3)`.
pub struct TrigramExtractor;

impl Extractor for TrigramExtractor {
    fn flavor(&self) -> &'static str {
        "trigram"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        let mut out = Vec::new();
        for sentence in group_by_sentence(&batch.annotations, |r| (r.document_id, r.sentence_id)) {
            for triple in sentence.windows(3) {
                let (a, b, c) = (&triple[0], &triple[1], &triple[2]);
                let (Some(l1), Some(l2), Some(l3)) = (lemma_of(a), lemma_of(b), lemma_of(c)) else {
                    continue;
                };
                let key = make_key(&[l1, l2, l3]);
                let pos = Position::new(a.document_id, a.sentence_id, a.begin_char, c.end_char, c.date);
                out.push((key, pos));
            }
        }
        out
    }
}
