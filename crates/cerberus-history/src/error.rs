use cerberus_core::JobId;
use thiserror::Error;

/// Result type alias for history operations
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Errors from history backends
#[derive(Error, Debug)]
pub enum HistoryError {
    /// No record with this id
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Record ids are unique and records are never replaced
    #[error("job already recorded: {0}")]
    DuplicateId(JobId),

    /// Reading or writing the backing file failed
    #[error("history I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but is not a list of job records
    #[error("history file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    /// Encoding records failed
    #[error("history serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background write task panicked or was cancelled
    #[error("history write task failed: {0}")]
    Task(String),
}

impl HistoryError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<HistoryError> for cerberus_core::CerberusError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::NotFound(id) => Self::NotFound { id: id.to_string() },
            HistoryError::DuplicateId(id) => Self::DuplicateId { id: id.to_string() },
            other => Self::History(other.to_string()),
        }
    }
}
