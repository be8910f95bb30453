//! Analysis job pipeline.
//!
//! A [`Pipeline`] takes an uploaded binary through four steps:
//!
//! 1. stage it in an isolated scratch directory,
//! 2. run the external analysis engine on it,
//! 3. read and validate the JSON report the engine leaves next to the input,
//! 4. record the report in history.
//!
//! The scratch directory is removed whatever the outcome, and a failed job
//! never reaches history.
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_pipeline::{EngineOptions, Pipeline};
//! use std::time::Duration;
//!
//! let pipeline = Pipeline::builder("bin/cerberus")
//!     .timeout(Duration::from_secs(120))
//!     .options(EngineOptions::new().include_strings(true))
//!     .build();
//!
//! let record = pipeline.submit(&bytes, "model.so").await?;
//! println!("{}: {} ML operations", record.id, record.stats().ml_operations);
//!
//! for past in pipeline.history().search("model").await? {
//!     println!("{} {}", past.date, past.name);
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/cerberus-pipeline/0.3.0")]

pub mod api;
mod config;
mod pipeline;
pub mod stages;

pub use config::*;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use cerberus_core::{CerberusError, Result};
