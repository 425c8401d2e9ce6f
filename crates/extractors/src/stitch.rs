use crate::extractor::{Extraction, Extractor};
use crate::rows::{group_by_sentence, AnnotationRow, Batch, DependencyRow};
use crate::sanitize::sanitize;
use posindex_position::{AnnotationKind, Position};
use posindex_synonyms::{Kind, SynonymTables};
use std::collections::HashMap;
use std::sync::Arc;

/// Cross-joins each sentence's unigram tokens against its co-located Date,
/// NER, POS, and Dependency annotations, so a query can combine a term with
/// one of its annotation kinds in a single postings lookup. The key carries
/// only the term and the annotation *kind*, e.g. `"fox" stitched with POS`;
/// the specific value (`NN`, `PERSON`, `2023-07-04`, `nsubj`, ...) lives in
/// the synonym id tucked into the posting's stitch extension, recoverable on
/// read without widening the key space.
///
/// A DATE stitch is skipped whenever the unigram's own text and the date
/// annotation's text overlap (containment either way) — this is a
/// self-reference, not a real co-occurrence.
pub struct StitchExtractor {
    synonyms: Arc<SynonymTables>,
}

fn kind_name(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Date => "DATE",
        AnnotationKind::Ner => "NER",
        AnnotationKind::Pos => "POS",
        AnnotationKind::Dependency => "DEPENDENCY",
    }
}

fn overlaps(a_begin: i32, a_end: i32, b_begin: i32, b_end: i32) -> bool {
    a_begin < b_end && b_begin < a_end
}

impl StitchExtractor {
    pub fn new(synonyms: Arc<SynonymTables>) -> Self {
        StitchExtractor { synonyms }
    }

    fn term_of(row: &AnnotationRow) -> Option<&str> {
        let lemma = row.lemma.as_deref()?;
        let trimmed = lemma.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// `sanitize(lower(token)) \0 KIND_NAME`.
    fn key(term: &str, kind: AnnotationKind) -> Vec<u8> {
        let mut key = sanitize(&term.to_lowercase()).into_bytes();
        key.push(0);
        key.extend(kind_name(kind).as_bytes());
        key
    }

    fn stitch_one(&self, term: &AnnotationRow, kind: AnnotationKind, value: &str) -> Option<Extraction> {
        let table_kind = match kind {
            AnnotationKind::Date => Kind::Date,
            AnnotationKind::Ner => Kind::Ner,
            AnnotationKind::Pos => Kind::Pos,
            AnnotationKind::Dependency => Kind::Dependency,
        };
        let synonym_id = match self.synonyms.get_or_create(value, table_kind) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(value, kind = kind_name(kind), error = %err, "skipping stitch: synonym registration failed");
                return None;
            }
        };
        let term_lemma = Self::term_of(term)?;
        let key = Self::key(term_lemma, kind);
        let pos = Position::new(term.document_id, term.sentence_id, term.begin_char, term.end_char, term.date)
            .with_stitch(synonym_id, kind);
        Some((key, pos))
    }
}

impl Extractor for StitchExtractor {
    fn flavor(&self) -> &'static str {
        "stitch"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        let mut out = Vec::new();

        let mut deps_by_sentence: HashMap<(i32, i32), Vec<&DependencyRow>> = HashMap::new();
        for dep in &batch.dependencies {
            deps_by_sentence.entry((dep.document_id, dep.sentence_id)).or_default().push(dep);
        }

        for sentence in group_by_sentence(&batch.annotations, |r| (r.document_id, r.sentence_id)) {
            let sentence_key = (sentence[0].document_id, sentence[0].sentence_id);
            let deps = deps_by_sentence.get(&sentence_key).map(|v| v.as_slice()).unwrap_or(&[]);

            for term in sentence {
                if Self::term_of(term).is_none() {
                    continue;
                }

                for annotated in sentence {
                    if let Some(tag) = annotated.pos.as_deref().filter(|t| !t.is_empty()) {
                        if let Some(ext) = self.stitch_one(term, AnnotationKind::Pos, tag) {
                            out.push(ext);
                        }
                    }

                    if let Some(ner) = annotated.ner.as_deref().filter(|n| !n.is_empty() && *n != "O" && *n != "DATE") {
                        if let Some(ext) = self.stitch_one(term, AnnotationKind::Ner, ner) {
                            out.push(ext);
                        }
                    }

                    if annotated.ner.as_deref() == Some("DATE") {
                        if let Some(normalized) = annotated.normalized_ner.as_deref() {
                            // Self-reference is specified only for DATE: a unigram
                            // stitched against its own date span is not a real
                            // co-occurrence. POS/NER self-stitches are legitimate.
                            let self_reference = std::ptr::eq(term, annotated)
                                || overlaps(term.begin_char, term.end_char, annotated.begin_char, annotated.end_char);
                            if chrono::NaiveDate::parse_from_str(normalized, "%Y-%m-%d").is_ok() && !self_reference {
                                if let Some(ext) = self.stitch_one(term, AnnotationKind::Date, normalized) {
                                    out.push(ext);
                                }
                            }
                        }
                    }
                }

                for dep in deps {
                    if let Some(ext) = self.stitch_one(term, AnnotationKind::Dependency, &dep.relation) {
                        out.push(ext);
                    }
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(doc: i32, sent: i32, b: i32, e: i32, lemma: &str, pos: Option<&str>, ner: Option<&str>, normalized_ner: Option<&str>) -> AnnotationRow {
        AnnotationRow {
            document_id: doc,
            sentence_id: sent,
            begin_char: b,
            end_char: e,
            date: 19723,
            token: lemma.to_string(),
            lemma: Some(lemma.to_string()),
            pos: pos.map(String::from),
            ner: ner.map(String::from),
            normalized_ner: normalized_ner.map(String::from),
            annotation_id: None,
        }
    }

    #[test]
    fn term_stitches_with_pos_of_other_token() {
        let dir = tempfile::tempdir().unwrap();
        let synonyms = Arc::new(SynonymTables::open(dir.path()).unwrap());
        let extractor = StitchExtractor::new(synonyms);

        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 3, "fox", Some("NN"), None, None),
                row(1, 1, 4, 9, "quick", Some("JJ"), None, None),
            ],
            dependencies: vec![],
        };

        let out = extractor.extract(&batch);
        let pos_stitches: Vec<_> = out
            .iter()
            .filter(|(k, p)| matches!(p.stitch.map(|s| s.annotation_kind), Some(AnnotationKind::Pos)) && k.ends_with(b"POS"))
            .collect();
        assert!(!pos_stitches.is_empty());
    }

    #[test]
    fn term_stitches_with_its_own_pos_and_ner() {
        let dir = tempfile::tempdir().unwrap();
        let synonyms = Arc::new(SynonymTables::open(dir.path()).unwrap());
        let extractor = StitchExtractor::new(synonyms);

        let batch = Batch {
            annotations: vec![row(1, 1, 0, 5, "paris", Some("NNP"), Some("LOCATION"), None)],
            dependencies: vec![],
        };

        let out = extractor.extract(&batch);
        assert!(out.iter().any(|(k, p)| k.ends_with(b"POS") && matches!(p.stitch.map(|s| s.annotation_kind), Some(AnnotationKind::Pos))));
        assert!(out.iter().any(|(k, p)| k.ends_with(b"NER") && matches!(p.stitch.map(|s| s.annotation_kind), Some(AnnotationKind::Ner))));
    }

    #[test]
    fn date_overlapping_unigram_span_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let synonyms = Arc::new(SynonymTables::open(dir.path()).unwrap());
        let extractor = StitchExtractor::new(synonyms);

        // "2023-07-04" annotated as DATE over the same span as the unigram
        // "2023-07-04" itself: a pure self-reference.
        let batch = Batch {
            annotations: vec![row(1, 1, 0, 10, "2023-07-04", None, Some("DATE"), Some("2023-07-04"))],
            dependencies: vec![],
        };

        let out = extractor.extract(&batch);
        assert!(out.iter().all(|(_, p)| !matches!(p.stitch.map(|s| s.annotation_kind), Some(AnnotationKind::Date))));
    }

    #[test]
    fn non_overlapping_date_does_stitch() {
        let dir = tempfile::tempdir().unwrap();
        let synonyms = Arc::new(SynonymTables::open(dir.path()).unwrap());
        let extractor = StitchExtractor::new(synonyms);

        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 3, "fox", None, None, None),
                row(1, 1, 10, 20, "2023-07-04", None, Some("DATE"), Some("2023-07-04")),
            ],
            dependencies: vec![],
        };

        let out = extractor.extract(&batch);
        let date_stitches: Vec<_> = out
            .iter()
            .filter(|(k, p)| matches!(p.stitch.map(|s| s.annotation_kind), Some(AnnotationKind::Date)) && k.starts_with(b"fox\x00"))
            .collect();
        assert!(!date_stitches.is_empty());
    }
}
