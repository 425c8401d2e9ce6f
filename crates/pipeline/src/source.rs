//! The relational source the streaming pipeline fetches from. Production
//! deployments back this with a real database connection; tests and the
//! CLI's offline mode use an in-memory implementation.

use crate::error::SourceError;
use posindex_extractors::Batch;

/// A paginated source of annotation/dependency rows, ordered ascending by
/// `(document_id, sentence_id, begin_char)` within each stream. `fetch_batch`
/// is called repeatedly with an increasing `offset` until it returns an
/// empty batch, which signals end of input.
pub trait Source: Send {
    fn fetch_batch(&mut self, offset: usize, limit: usize) -> Result<Batch, SourceError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use posindex_extractors::AnnotationRow;

    /// An in-memory `Source` over a fixed set of rows, used by pipeline
    /// tests so they don't depend on a real database connection.
    pub struct VecSource {
        rows: Vec<AnnotationRow>,
    }

    impl VecSource {
        pub fn new(rows: Vec<AnnotationRow>) -> Self {
            VecSource { rows }
        }
    }

    impl Source for VecSource {
        fn fetch_batch(&mut self, offset: usize, limit: usize) -> Result<Batch, SourceError> {
            let annotations = self.rows.iter().skip(offset).take(limit).cloned().collect();
            Ok(Batch { annotations, dependencies: Vec::new() })
        }
    }
}
