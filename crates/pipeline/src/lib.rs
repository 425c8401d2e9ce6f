//! Streaming fetch -> extract -> accumulate -> spill -> external-merge ->
//! load orchestration: one [`Run`] builds one flavor's output from a
//! [`Source`] into a [`Store`](posindex_store::Store).

mod accumulator;
mod config;
mod error;
mod indexdir;
mod loader;
mod progress;
mod run;
mod source;

pub use accumulator::Accumulator;
pub use config::Config;
pub use error::{Error, SourceError};
pub use indexdir::{prepare as prepare_index_dir, IndexDirPolicy};
pub use loader::{load, LoadStats};
pub use progress::{Progress, RunTimer};
pub use run::{CancelToken, Run, State};
pub use source::Source;
