//! Search error taxonomy and integer status codes.

use std::path::PathBuf;
use thiserror::Error;

/// Status returned when a search completes normally.
pub const STATUS_SUCCESS: i32 = 0;
pub const STATUS_MEMORY: i32 = 50;
pub const STATUS_INVALID_OPTIONS: i32 = 75;
pub const STATUS_INVALID_QUERIES: i32 = 101;
/// Distinguished status for a search stopped by the interrupt callback.
pub const STATUS_INTERRUPTED: i32 = 102;
pub const STATUS_INCOMPATIBLE_PLATFORM: i32 = 103;
pub const STATUS_MALFORMED_RPS: i32 = 104;
pub const STATUS_SEQ_SRC: i32 = 105;
pub const STATUS_IO: i32 = 106;
pub const STATUS_INTERNAL: i32 = 255;

/// Errors that can stop a search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Option bundle failed validation before any subject was processed.
    #[error("invalid search options: {0}")]
    InvalidOptions(String),

    /// Query set is empty or could not be encoded.
    #[error("invalid queries: {0}")]
    InvalidQueries(String),

    /// An allocation request could not be honoured.
    #[error("out of memory: {0}")]
    Memory(String),

    /// An RPS file was written on a platform with the opposite byte order.
    #[error("RPS file {} was created on an incompatible platform", path.display())]
    IncompatiblePlatform { path: PathBuf },

    /// An RPS file is truncated or carries an unknown magic number.
    #[error("malformed RPS file {}: {reason}", path.display())]
    MalformedRpsFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The subject sequence source reported a fatal iteration error.
    #[error("sequence source failure: {0}")]
    SequenceSource(String),

    /// The caller's interrupt predicate asked the search to stop.
    #[error("search interrupted")]
    Interrupted,

    /// An internal invariant was violated; never retried.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// Integer status code for the exit/result surface.
    pub fn status(&self) -> i32 {
        match self {
            SearchError::InvalidOptions(_) => STATUS_INVALID_OPTIONS,
            SearchError::InvalidQueries(_) => STATUS_INVALID_QUERIES,
            SearchError::Memory(_) => STATUS_MEMORY,
            SearchError::IncompatiblePlatform { .. } => STATUS_INCOMPATIBLE_PLATFORM,
            SearchError::MalformedRpsFile { .. } => STATUS_MALFORMED_RPS,
            SearchError::Io(_) => STATUS_IO,
            SearchError::SequenceSource(_) => STATUS_SEQ_SRC,
            SearchError::Interrupted => STATUS_INTERRUPTED,
            SearchError::Internal(_) => STATUS_INTERNAL,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, SearchError::Interrupted)
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SearchError::MalformedRpsFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
