use async_trait::async_trait;
use cerberus_core::{HistoryStats, JobId, JobRecord};

use crate::error::HistoryResult;

/// Append-only collection of job records
///
/// Implementations serialize inserts internally, so a store can be shared
/// behind an `Arc` by any number of concurrent jobs.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Append a record; fails if its id is already present
    async fn insert(&self, record: JobRecord) -> HistoryResult<()>;

    /// Fetch a record by id
    async fn get(&self, id: &JobId) -> HistoryResult<JobRecord>;

    /// All records, most recent first
    async fn list(&self) -> HistoryResult<Vec<JobRecord>>;

    /// Records whose file name contains `term`, ignoring case, most recent first
    async fn search(&self, term: &str) -> HistoryResult<Vec<JobRecord>> {
        let records = self.list().await?;
        Ok(records
            .into_iter()
            .filter(|record| record.name_matches(term))
            .collect())
    }

    /// Totals across all records
    async fn stats(&self) -> HistoryResult<HistoryStats> {
        let records = self.list().await?;
        Ok(HistoryStats::from_records(&records))
    }
}
