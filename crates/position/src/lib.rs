//! Position and PositionList: the core data type of a positional inverted
//! index. A [`Position`] points at one occurrence in the corpus; a
//! [`PositionList`] is the sorted, deduplicated collection of occurrences
//! persisted for one key.

mod codec;
mod list;
mod position;

pub use codec::CodecError;
pub use list::{Error, PositionList};
pub use position::{is_duplicate, AnnotationKind, DedupPolicy, Date, Position, StitchExt};
