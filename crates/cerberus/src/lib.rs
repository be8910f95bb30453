//! Run binaries through the Cerberus analysis engine and keep a history of
//! what it found.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cerberus::{FileHistory, Pipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cerberus::Result<()> {
//!     let history = Arc::new(FileHistory::open("history.json").await?);
//!     let pipeline = Pipeline::builder("bin/cerberus")
//!         .history(history)
//!         .build();
//!
//!     let record = pipeline.submit_path("model.so".as_ref()).await?;
//!     let stats = record.stats();
//!     println!("{}: {} instructions, {} ML operations", record.name, stats.instructions, stats.ml_operations);
//!
//!     for past in pipeline.history().list().await? {
//!         println!("{} {} {}", past.id, past.date, past.name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Enables `file-history`
//! - `file-history` - JSON-file history backend ([`FileHistory`])

#![doc(html_root_url = "https://docs.rs/cerberus/0.3.0")]

// Re-export core types
pub use cerberus_core::*;

// Re-export the pipeline
pub use cerberus_pipeline::{
    api, stages, EngineConfig, EngineOptions, Pipeline, PipelineBuilder, DEFAULT_ENGINE_PATH,
    DEFAULT_OUTPUT_SUFFIX, DEFAULT_TIMEOUT,
};

// Re-export history backends
pub use cerberus_history::{HistoryError, HistoryResult, HistoryStore, MemoryHistory};
#[cfg(feature = "file-history")]
pub use cerberus_history::FileHistory;

// Re-export runtime for convenience
pub use tokio;
pub use serde;
pub use serde_json;
