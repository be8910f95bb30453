use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CerberusError>;

/// Errors that can terminate an analysis job or a history query
#[derive(Error, Debug)]
pub enum CerberusError {
    /// Staging the upload or reading a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written
        path: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Engine executable is missing or could not be spawned
    #[error("analysis engine unavailable at {path}: {reason}")]
    EngineUnavailable {
        /// Configured executable path
        path: String,
        /// Why the engine could not be started
        reason: String,
    },

    /// Engine ran but exited with a non-zero status
    #[error("analysis engine exited with code {code}")]
    EngineExecutionFailed {
        /// Exit code (`128 + signal` when killed by a signal)
        code: i32,
    },

    /// Engine exceeded its time budget and was killed
    #[error("analysis engine timed out after {0:?}")]
    Timeout(Duration),

    /// Engine exited 0 but never wrote its report
    #[error("analysis engine reported success but wrote no report at {path}")]
    OutputMissing {
        /// Expected report path
        path: String,
    },

    /// Report is not valid JSON or has the wrong shape
    #[error("analysis report is malformed: {0}")]
    MalformedOutput(String),

    /// Report parsed but lacks required sections
    #[error("analysis report is incomplete: missing {}", .missing.join(", "))]
    IncompleteResult {
        /// Names of the absent sections
        missing: Vec<String>,
    },

    /// No job with this id in the history store
    #[error("job not found: {id}")]
    NotFound {
        /// Requested job id
        id: String,
    },

    /// A record with this id was already inserted
    #[error("job already recorded: {id}")]
    DuplicateId {
        /// Offending job id
        id: String,
    },

    /// History backend failed to load or persist
    #[error("history store error: {0}")]
    History(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`CerberusError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    EngineUnavailable,
    EngineExecutionFailed,
    Timeout,
    OutputMissing,
    MalformedOutput,
    IncompleteResult,
    NotFound,
    DuplicateId,
    History,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Io => "io",
            Self::EngineUnavailable => "engine_unavailable",
            Self::EngineExecutionFailed => "engine_execution_failed",
            Self::Timeout => "timeout",
            Self::OutputMissing => "output_missing",
            Self::MalformedOutput => "malformed_output",
            Self::IncompleteResult => "incomplete_result",
            Self::NotFound => "not_found",
            Self::DuplicateId => "duplicate_id",
            Self::History => "history",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

impl CerberusError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Returns the classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::EngineUnavailable { .. } => ErrorKind::EngineUnavailable,
            Self::EngineExecutionFailed { .. } => ErrorKind::EngineExecutionFailed,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::OutputMissing { .. } => ErrorKind::OutputMissing,
            Self::MalformedOutput(_) => ErrorKind::MalformedOutput,
            Self::IncompleteResult { .. } => ErrorKind::IncompleteResult,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::History(_) => ErrorKind::History,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true if the engine itself failed (missing, crashed, or hung)
    #[must_use]
    pub const fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            Self::EngineUnavailable { .. } | Self::EngineExecutionFailed { .. } | Self::Timeout(_)
        )
    }

    /// Returns true if the engine claimed success but its report is unusable
    #[must_use]
    pub const fn is_output_failure(&self) -> bool {
        matches!(
            self,
            Self::OutputMissing { .. } | Self::MalformedOutput(_) | Self::IncompleteResult { .. }
        )
    }

    /// Returns the engine exit code if this is an execution failure
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::EngineExecutionFailed { code } => Some(*code),
            _ => None,
        }
    }
}
