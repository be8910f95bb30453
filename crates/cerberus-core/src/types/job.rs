use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier minted once per submitted file
///
/// Backed by a UUIDv7, so identifiers minted later sort after earlier ones
/// while the random tail keeps concurrent jobs distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Mint a fresh identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle stage of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Upload accepted, nothing on disk yet
    Received,
    /// Upload copied into a private workspace
    Staged,
    /// Engine subprocess is running
    EngineRunning,
    /// Report parsed and validated
    ResultExtracted,
    /// Record inserted into history
    Persisted,
    /// Job aborted with a classified error
    Failed,
}

impl JobStage {
    /// Returns true if no further transition can happen
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Staged => write!(f, "staged"),
            Self::EngineRunning => write!(f, "engine_running"),
            Self::ResultExtracted => write!(f, "result_extracted"),
            Self::Persisted => write!(f, "persisted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
