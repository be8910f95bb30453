//! The three stages every job passes through before it is recorded.

pub mod engine;
pub mod extract;
pub mod workspace;

pub use engine::{Engine, EngineInvocation};
pub use extract::{extract, parse_report};
pub use workspace::{sanitize_file_name, StagedInput, Workspace, FALLBACK_FILE_NAME};
