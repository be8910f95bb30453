//! Command implementations.

pub mod analyze;
pub mod check;
pub mod config;
pub mod history;

use anyhow::{Context as _, Result};
use cerberus::{EngineOptions, FileHistory, Pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration file
    pub config: Config,

    /// Engine executable after flag/env/config resolution
    pub engine: PathBuf,

    /// History file given on the command line
    pub history_path: Option<PathBuf>,

    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,
}

impl Context {
    /// History file from the command line, the config, or the platform default.
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(path.clone()),
            None => self.config.history_path(),
        }
    }

    /// Open the history file.
    pub async fn history(&self) -> Result<Arc<FileHistory>> {
        let path = self.history_path()?;
        let store = FileHistory::open(&path)
            .await
            .with_context(|| format!("Failed to open history at {}", path.display()))?;
        Ok(Arc::new(store))
    }

    /// Build a pipeline with the configured engine and history.
    pub async fn pipeline(&self) -> Result<Pipeline> {
        self.pipeline_with(EngineOptions::default(), self.config.timeout(), 0)
            .await
    }

    /// Build a pipeline with explicit engine settings.
    pub async fn pipeline_with(
        &self,
        options: EngineOptions,
        timeout: Duration,
        max_jobs: usize,
    ) -> Result<Pipeline> {
        let mut builder = Pipeline::builder(&self.engine)
            .timeout(timeout)
            .options(options)
            .max_concurrent_jobs(max_jobs)
            .history(self.history().await?);

        if let Some(dir) = self.config.scratch_dir() {
            builder = builder.scratch_dir(dir);
        }

        Ok(builder.build())
    }
}
