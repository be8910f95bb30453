//! Process-scoped history backend.

use async_trait::async_trait;
use cerberus_core::{JobId, JobRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{HistoryError, HistoryResult};
use crate::store::HistoryStore;

/// Records in insertion order plus an id index
#[derive(Debug, Default)]
pub(crate) struct RecordLog {
    records: Vec<JobRecord>,
    index: HashMap<JobId, usize>,
}

impl RecordLog {
    /// Build from records stored most recent first
    pub(crate) fn from_newest_first(records: Vec<JobRecord>) -> HistoryResult<Self> {
        let mut log = Self::default();
        for record in records.into_iter().rev() {
            log.append(record)?;
        }
        Ok(log)
    }

    pub(crate) fn append(&mut self, record: JobRecord) -> HistoryResult<()> {
        if self.index.contains_key(&record.id) {
            return Err(HistoryError::DuplicateId(record.id));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Undo the most recent append
    pub(crate) fn pop(&mut self) {
        if let Some(record) = self.records.pop() {
            self.index.remove(&record.id);
        }
    }

    pub(crate) fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub(crate) fn newest_first(&self) -> impl Iterator<Item = &JobRecord> {
        self.records.iter().rev()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

/// In-memory history, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryHistory {
    log: RwLock<RecordLog>,
}

impl MemoryHistory {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    /// Returns true if nothing was recorded yet
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: JobRecord) -> HistoryResult<()> {
        let id = record.id.clone();
        self.log.write().await.append(record)?;
        debug!(job_id = %id, "recorded job in memory history");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> HistoryResult<JobRecord> {
        self.log
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound(id.clone()))
    }

    async fn list(&self) -> HistoryResult<Vec<JobRecord>> {
        Ok(self.log.read().await.newest_first().cloned().collect())
    }
}
