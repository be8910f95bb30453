//! History queries.

use cerberus_core::{CerberusError, HistoryStats, JobId, JobRecord, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::Pipeline;

/// Read access to completed jobs
pub struct HistoryApi<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> HistoryApi<'a> {
    pub(crate) const fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// All completed jobs, most recent first
    pub async fn list(&self) -> Result<Vec<JobRecord>> {
        Ok(self.pipeline.store().list().await?)
    }

    /// A single job by id
    pub async fn get(&self, id: &JobId) -> Result<JobRecord> {
        Ok(self.pipeline.store().get(id).await?)
    }

    /// Jobs whose file name contains `term`, ignoring case
    pub async fn search(&self, term: &str) -> Result<Vec<JobRecord>> {
        Ok(self.pipeline.store().search(term).await?)
    }

    /// Totals across all jobs
    pub async fn stats(&self) -> Result<HistoryStats> {
        Ok(self.pipeline.store().stats().await?)
    }

    /// Write a job's report to `<dir>/<name>-analysis.json`
    ///
    /// Returns the path written.
    pub async fn export(&self, id: &JobId, dir: &Path) -> Result<PathBuf> {
        let record = self.get(id).await?;
        let path = dir.join(crate::stages::sanitize_file_name(&record.export_file_name()));

        let bytes = serde_json::to_vec_pretty(&record.data)
            .map_err(|e| CerberusError::MalformedOutput(e.to_string()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CerberusError::io(&path, e))?;

        info!(job_id = %id, path = %path.display(), "exported report");
        Ok(path)
    }
}
