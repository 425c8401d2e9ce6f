mod date;
mod dependency;
mod extractor;
mod hypernym;
mod ner;
mod ngram;
mod pos;
mod rows;
mod sanitize;
mod stitch;
mod stopwords;
mod unigram;

pub use date::DateExtractor;
pub use dependency::DependencyExtractor;
pub use extractor::{Extraction, Extractor};
pub use hypernym::HypernymExtractor;
pub use ner::NerExtractor;
pub use ngram::{BigramExtractor, TrigramExtractor};
pub use pos::PosExtractor;
pub use rows::{group_by_sentence, AnnotationRow, Batch, DependencyRow};
pub use sanitize::{desanitize, make_key, sanitize};
pub use stitch::StitchExtractor;
pub use stopwords::StopwordSet;
pub use unigram::UnigramExtractor;

/// All nine extraction flavors named by their CLI `--flavor` value.
pub const FLAVORS: &[&str] = &[
    "unigram", "bigram", "trigram", "pos", "ner", "date", "dependency", "hypernym", "stitch",
];
