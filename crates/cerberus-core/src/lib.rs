//! Core types and error taxonomy for the Cerberus analysis job pipeline.
//!
//! This crate provides the foundational types shared by the pipeline, the
//! history store and the command-line front end:
//!
//! - **Types**: the engine's [`AnalysisResult`] report, the immutable
//!   [`JobRecord`] persisted for every successful job, and job identity
//! - **Errors**: one classified failure per job with [`CerberusError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_core::{JobRecord, Result};
//!
//! fn describe(record: &JobRecord) -> Result<()> {
//!     let stats = record.stats();
//!     println!("{}: {} instructions", record.name, stats.instructions);
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/cerberus-core/0.3.0")]

mod error;
pub mod types;

pub use error::{CerberusError, ErrorKind, Result};
pub use types::*;
