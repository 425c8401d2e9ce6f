//! The pipeline's error taxonomy and the CLI exit codes each kind maps to.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("spill file error")]
    Spill(#[from] posindex_spill::Error),

    #[error("position list codec error")]
    Position(#[from] posindex_position::Error),

    #[error("store error")]
    Store(#[from] posindex_store::Error),

    #[error("synonym table error")]
    Synonyms(#[from] posindex_synonyms::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("pipeline run in state {state:?}, which does not permit {attempted}")]
    InvalidTransition { state: crate::run::State, attempted: &'static str },
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to fetch from source")]
    Fetch(#[source] anyhow::Error),
}

impl Error {
    /// Process exit code per error kind, matching the CLI's documented
    /// mapping: usage errors exit 2, source errors 3, storage/spill/synonym
    /// errors 4, and a state-machine violation is an internal bug (5).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) => 2,
            Error::Source(_) => 3,
            Error::Spill(_) | Error::Store(_) | Error::Synonyms(_) | Error::Position(_) | Error::Io(_) => 4,
            Error::InvalidTransition { .. } => 5,
        }
    }
}
