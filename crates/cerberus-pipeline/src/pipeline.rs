//! Job orchestration.

use cerberus_core::{AnalysisResult, CerberusError, JobRecord, JobStage, Result};
use cerberus_history::{HistoryStore, MemoryHistory};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::api::HistoryApi;
use crate::config::{EngineConfig, EngineOptions};
use crate::stages::{extract, Engine, StagedInput, Workspace, FALLBACK_FILE_NAME};

/// Runs uploads through staging, the engine, extraction, and history
///
/// Cheap to clone; clones share the workspace, engine settings, history
/// store, and concurrency limit.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    workspace: Workspace,
    engine: Engine,
    history: Arc<dyn HistoryStore>,
    permits: Option<Semaphore>,
}

/// State of one job as it moves through the stages
struct Job<'a> {
    name: &'a str,
    submitted_at: DateTime<Utc>,
    stage: JobStage,
}

impl<'a> Job<'a> {
    fn new(name: &'a str) -> Self {
        Self {
            name,
            submitted_at: Utc::now(),
            stage: JobStage::Received,
        }
    }

    fn advance(&mut self, stage: JobStage) {
        debug!(file = self.name, from = %self.stage, to = %stage, "job stage");
        self.stage = stage;
    }
}

impl Pipeline {
    /// Create a pipeline for the given engine with default settings
    #[must_use]
    pub fn new(engine: impl Into<PathBuf>) -> Self {
        PipelineBuilder::new(engine).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(engine: impl Into<PathBuf>) -> PipelineBuilder {
        PipelineBuilder::new(engine)
    }

    /// Query completed jobs
    #[must_use]
    pub const fn history(&self) -> HistoryApi<'_> {
        HistoryApi::new(self)
    }

    /// Engine adapter
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    /// Workspace manager
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.inner.workspace
    }

    pub(crate) fn store(&self) -> &dyn HistoryStore {
        self.inner.history.as_ref()
    }

    /// Analyse `bytes` submitted under `file_name`
    ///
    /// On success the job has been recorded in history and its record is
    /// returned. On failure nothing is recorded. Either way the job's scratch
    /// directory is gone by the time this returns.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn submit(&self, bytes: &[u8], file_name: &str) -> Result<JobRecord> {
        let mut job = Job::new(file_name);
        let outcome = self.run(&mut job, bytes).await;

        match &outcome {
            Ok(record) => {
                info!(job_id = %record.id, file = file_name, "analysis complete");
            }
            Err(e) => {
                warn!(file = file_name, stage = %job.stage, kind = %e.kind(), error = %e, "analysis failed");
                job.advance(JobStage::Failed);
            }
        }
        outcome
    }

    /// Read a file from disk and submit it under its own file name
    pub async fn submit_path(&self, path: &Path) -> Result<JobRecord> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CerberusError::io(path, e))?;
        let name = path
            .file_name()
            .map_or_else(|| FALLBACK_FILE_NAME.into(), |n| n.to_string_lossy());
        self.submit(&bytes, &name).await
    }

    async fn run(&self, job: &mut Job<'_>, bytes: &[u8]) -> Result<JobRecord> {
        let _permit = match &self.inner.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|e| CerberusError::Config(e.to_string()))?,
            ),
            None => None,
        };

        // One budget covers staging, the engine run, and reading the report.
        let budget = self.inner.engine.config().timeout;
        let deadline = Instant::now() + budget;

        let staged = within(deadline, budget, self.inner.workspace.stage(bytes, job.name)).await?;
        job.advance(JobStage::Staged);

        let analysed = self.analyse(job, &staged, deadline).await;

        // Cleanup happens before any outcome is reported.
        let released = staged.release().await;
        let data = match (analysed, released) {
            (Ok(data), Ok(())) => data,
            (Ok(_), Err(e)) | (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(cleanup)) => {
                warn!(error = %cleanup, "failed to release job directory");
                return Err(e);
            }
        };

        let record = JobRecord::new(job.name, job.submitted_at, data);
        self.inner.history.insert(record.clone()).await?;
        job.advance(JobStage::Persisted);
        Ok(record)
    }

    async fn analyse(
        &self,
        job: &mut Job<'_>,
        staged: &StagedInput,
        deadline: Instant,
    ) -> Result<AnalysisResult> {
        job.advance(JobStage::EngineRunning);
        let engine = &self.inner.engine;
        let invocation = engine.run_until(staged, deadline).await?;

        let data = within(deadline, engine.config().timeout, extract(&invocation.output)).await?;
        job.advance(JobStage::ResultExtracted);
        Ok(data)
    }
}

/// Run `stage` unless the job's `deadline` passes first
async fn within<T>(
    deadline: Instant,
    budget: Duration,
    stage: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout_at(deadline, stage)
        .await
        .map_err(|_| CerberusError::Timeout(budget))?
}

/// Builder for configuring a [`Pipeline`]
pub struct PipelineBuilder {
    engine: EngineConfig,
    scratch_dir: Option<PathBuf>,
    history: Option<Arc<dyn HistoryStore>>,
    max_concurrent_jobs: Option<usize>,
}

impl PipelineBuilder {
    /// Create a new builder for the given engine executable
    #[must_use]
    pub fn new(engine: impl Into<PathBuf>) -> Self {
        Self {
            engine: EngineConfig::new(engine),
            scratch_dir: None,
            history: None,
            max_concurrent_jobs: None,
        }
    }

    /// Replace the whole engine configuration
    #[must_use]
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine = config;
        self
    }

    /// Set the per-job time budget, shared by staging, the engine run, and
    /// reading the report
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.engine = self.engine.timeout(timeout);
        self
    }

    /// Set the engine feature toggles
    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.engine = self.engine.options(options);
        self
    }

    /// Let the engine write to our stdout/stderr
    #[must_use]
    pub fn inherit_stdio(mut self, inherit: bool) -> Self {
        self.engine = self.engine.inherit_stdio(inherit);
        self
    }

    /// Set the scratch root (defaults to `<tmp>/cerberus`)
    #[must_use]
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Set the history backend (defaults to in-memory)
    #[must_use]
    pub fn history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Cap the number of jobs running at once; `0` means unlimited
    #[must_use]
    pub fn max_concurrent_jobs(mut self, limit: usize) -> Self {
        self.max_concurrent_jobs = Some(limit);
        self
    }

    /// Build the pipeline
    #[must_use]
    pub fn build(self) -> Pipeline {
        let workspace = self
            .scratch_dir
            .map_or_else(Workspace::default, Workspace::new);
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(MemoryHistory::new()));
        let permits = self
            .max_concurrent_jobs
            .filter(|&limit| limit > 0)
            .map(Semaphore::new);

        debug!(
            engine = %self.engine.executable.display(),
            scratch = %workspace.root().display(),
            history = history.name(),
            "pipeline configured"
        );

        Pipeline {
            inner: Arc::new(PipelineInner {
                workspace,
                engine: Engine::new(self.engine),
                history,
                permits,
            }),
        }
    }
}
