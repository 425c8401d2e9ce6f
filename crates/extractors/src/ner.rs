use crate::extractor::{Extraction, Extractor};
use crate::rows::{group_by_sentence, AnnotationRow, Batch};
use crate::sanitize::sanitize;
use posindex_position::Position;

/// Merges consecutive same-type NER tokens into entity spans. Per the
/// resolved merge rule, tokens merge whenever `annotation_id`s are
/// consecutive integers, regardless of whether their char offsets are also
/// contiguous (upstream tokenization can insert whitespace gaps).
///
/// `DATE`-typed tokens are excluded here: they feed the `date` flavor
/// instead.
pub struct NerExtractor;

struct Entity<'a> {
    tokens: Vec<&'a AnnotationRow>,
}

impl<'a> Entity<'a> {
    /// `UPPER(type) \0 lower(text)` — the type stays uppercase, unlike every
    /// other flavor's key parts.
    fn text_key(&self) -> Vec<u8> {
        let ner_type = self.tokens[0].ner.as_deref().unwrap_or("").to_uppercase();
        let text: Vec<String> = self
            .tokens
            .iter()
            .map(|t| t.normalized_ner.clone().unwrap_or_else(|| t.token.clone()))
            .collect();
        let text = sanitize(&text.join(" ").to_lowercase());

        let mut key = ner_type.into_bytes();
        key.push(0);
        key.extend(text.into_bytes());
        key
    }

    fn position(&self) -> Position {
        let first = self.tokens[0];
        let last = *self.tokens.last().unwrap();
        Position::new(first.document_id, first.sentence_id, first.begin_char, last.end_char, first.date)
    }
}

fn entities_in_sentence(sentence: &[AnnotationRow]) -> Vec<Entity<'_>> {
    let mut entities = Vec::new();
    let mut current: Vec<&AnnotationRow> = Vec::new();

    for row in sentence {
        let Some(ner) = row.ner.as_deref().filter(|n| !n.is_empty() && *n != "O" && *n != "DATE") else {
            if !current.is_empty() {
                entities.push(Entity { tokens: std::mem::take(&mut current) });
            }
            continue;
        };

        let continues = match current.last() {
            None => false,
            Some(prev) => {
                prev.ner.as_deref() == Some(ner)
                    && matches!((prev.annotation_id, row.annotation_id), (Some(p), Some(c)) if c == p + 1)
            }
        };

        if !continues && !current.is_empty() {
            entities.push(Entity { tokens: std::mem::take(&mut current) });
        }
        current.push(row);
    }
    if !current.is_empty() {
        entities.push(Entity { tokens: current });
    }
    entities
}

impl Extractor for NerExtractor {
    fn flavor(&self) -> &'static str {
        "ner"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        let mut out = Vec::new();
        for sentence in group_by_sentence(&batch.annotations, |r| (r.document_id, r.sentence_id)) {
            for entity in entities_in_sentence(sentence) {
                let key = entity.text_key();
                let pos = entity.position();
                out.push((key, pos));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(doc: i32, sent: i32, b: i32, e: i32, ner: Option<&str>, id: Option<i64>) -> AnnotationRow {
        AnnotationRow {
            document_id: doc,
            sentence_id: sent,
            begin_char: b,
            end_char: e,
            date: 19723,
            token: "tok".to_string(),
            lemma: None,
            pos: None,
            ner: ner.map(String::from),
            normalized_ner: None,
            annotation_id: id,
        }
    }

    #[test]
    fn merges_consecutive_same_type_tokens() {
        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 4, Some("PERSON"), Some(10)),
                row(1, 1, 5, 9, Some("PERSON"), Some(11)),
                row(1, 1, 10, 15, Some("O"), None),
            ],
            dependencies: vec![],
        };

        let out = NerExtractor.extract(&batch);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.begin_char, 0);
        assert_eq!(out[0].1.end_char, 9);
    }

    #[test]
    fn non_consecutive_ids_split_entities() {
        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 4, Some("PERSON"), Some(10)),
                row(1, 1, 5, 9, Some("PERSON"), Some(15)),
            ],
            dependencies: vec![],
        };

        let out = NerExtractor.extract(&batch);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn gap_in_char_offsets_still_merges() {
        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 4, Some("ORGANIZATION"), Some(1)),
                row(1, 1, 40, 44, Some("ORGANIZATION"), Some(2)),
            ],
            dependencies: vec![],
        };

        let out = NerExtractor.extract(&batch);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1.end_char, 44);
    }

    #[test]
    fn scenario_5_key_uppercases_type_and_lowercases_text() {
        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 4, Some("PERSON"), Some(1)),
                row(1, 1, 5, 6, Some("PERSON"), Some(2)),
                row(1, 1, 7, 13, Some("PERSON"), Some(3)),
                row(1, 1, 14, 17, Some("PERSON"), Some(4)),
            ],
            dependencies: vec![],
        };
        let out = NerExtractor.extract(&batch);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, b"PERSON\x00tok tok tok tok".to_vec());
    }

    #[test]
    fn date_typed_tokens_are_excluded() {
        let batch = Batch {
            annotations: vec![row(1, 1, 0, 4, Some("DATE"), Some(1))],
            dependencies: vec![],
        };
        assert!(NerExtractor.extract(&batch).is_empty());
    }
}
