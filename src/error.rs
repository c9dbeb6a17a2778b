//! Error types for the scheduler core.
//!
//! Scheduling math and statistics never fail. Only store I/O, configuration
//! loading and session preconditions report errors, and they always do so
//! through these values rather than panicking.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The persisted progress document exists but could not be decoded.
    #[error("progress store at {path} is corrupt: {source}")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No due items matched the loaded vocabulary.
    #[error("no items are due for this session")]
    EmptySession,

    /// A rating was requested with nothing left to rate.
    #[error("no current item to rate (position {position}, queue length {len})")]
    NoCurrentItem { position: usize, len: usize },

    /// Reading, writing or renaming a store file failed.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A deck file exists but is not a valid deck document.
    #[error("deck at {path} is invalid: {source}")]
    InvalidDeck {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid rating grade {0}, expected 1-4")]
    InvalidRating(u8),
}

impl SchedulerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SchedulerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;
