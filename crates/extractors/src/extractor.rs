use crate::rows::Batch;
use posindex_position::Position;

/// A single extracted posting fragment: the key it belongs under and the
/// position it occurred at.
pub type Extraction = (Vec<u8>, Position);

/// The single interface every flavor implements. There is no inheritance
/// chain: each flavor is a distinct struct implementing `extract` over the
/// same `Batch` shape, reading whichever of `annotations`/`dependencies` is
/// relevant to it.
pub trait Extractor: Send + Sync {
    /// Human-readable name of the flavor, used for logging and output
    /// directory naming.
    fn flavor(&self) -> &'static str;

    fn extract(&self, batch: &Batch) -> Vec<Extraction>;
}
