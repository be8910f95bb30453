//! # cerberus-cli
//!
//! Command-line front end for the Cerberus analysis pipeline.
//!
//! ## Features
//!
//! - **Analyze**: submit one or more binaries, concurrently, to the engine
//! - **History**: list, search, inspect, and export past reports
//! - **Check**: verify the configured engine before running jobs
//! - **Multiple output formats**: Pretty tables, JSON, CSV, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
