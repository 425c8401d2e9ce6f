use crate::extractor::{Extraction, Extractor};
use crate::rows::Batch;
use posindex_position::Position;
use posindex_synonyms::{Kind, SynonymTables};
use std::sync::Arc;

/// One key per NER-type-DATE token whose `normalized_ner` parses as
/// `YYYY-MM-DD`, formatted `YYYYMMDD`. The normalized value is also
/// registered in the `Date` synonym table under its `YYYY-MM-DD` form.
pub struct DateExtractor {
    synonyms: Arc<SynonymTables>,
}

impl DateExtractor {
    pub fn new(synonyms: Arc<SynonymTables>) -> Self {
        DateExtractor { synonyms }
    }

    fn parse_iso_date(s: &str) -> Option<()> {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|_| ())
    }
}

impl Extractor for DateExtractor {
    fn flavor(&self) -> &'static str {
        "date"
    }

    fn extract(&self, batch: &Batch) -> Vec<Extraction> {
        batch
            .annotations
            .iter()
            .filter_map(|row| {
                if row.ner.as_deref() != Some("DATE") {
                    return None;
                }
                let normalized = row.normalized_ner.as_deref()?;
                if Self::parse_iso_date(normalized).is_none() {
                    tracing::debug!(value = normalized, "skipping DATE token with unparseable normalized_ner");
                    return None;
                }
                if let Err(err) = self.synonyms.get_or_create(normalized, Kind::Date) {
                    tracing::warn!(value = normalized, error = %err, "skipping DATE token: synonym registration failed");
                    return None;
                }

                let key = normalized.replace('-', "").into_bytes();
                let pos = Position::new(row.document_id, row.sentence_id, row.begin_char, row.end_char, row.date);
                Some((key, pos))
            })
            .collect()
    }
}
