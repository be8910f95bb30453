//! JSON-file history backend.
//!
//! The file holds a JSON array of job records, most recent first. It is read
//! once at open; every insert rewrites it through a temporary file in the same
//! directory followed by a rename, so readers never observe a half-written
//! history.

use async_trait::async_trait;
use cerberus_core::{JobId, JobRecord};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{HistoryError, HistoryResult};
use crate::memory::RecordLog;
use crate::store::HistoryStore;

/// History persisted to a JSON file
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    log: RwLock<RecordLog>,
}

impl FileHistory {
    /// Open (or lazily create) the history file at `path`
    ///
    /// A missing file is an empty history; the file and its parent directory
    /// are created on the first insert.
    pub async fn open(path: impl Into<PathBuf>) -> HistoryResult<Self> {
        let path = path.into();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice::<Vec<JobRecord>>(&bytes).map_err(|e| {
                HistoryError::Corrupt {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(HistoryError::io(&path, e)),
        };

        let log = RecordLog::from_newest_first(records)?;
        info!(path = %path.display(), records = log.len(), "opened history file");

        Ok(Self {
            path,
            log: RwLock::new(log),
        })
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, log: &RecordLog) -> HistoryResult<()> {
        let records: Vec<&JobRecord> = log.newest_first().collect();
        let bytes = serde_json::to_vec_pretty(&records)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| HistoryError::Task(e.to_string()))?
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> HistoryResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| HistoryError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| HistoryError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| HistoryError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| HistoryError::io(path, e.error))?;
    Ok(())
}

#[async_trait]
impl HistoryStore for FileHistory {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn insert(&self, record: JobRecord) -> HistoryResult<()> {
        let id = record.id.clone();
        let mut log = self.log.write().await;
        log.append(record)?;

        if let Err(e) = self.persist(&log).await {
            // Keep memory in step with what is on disk.
            log.pop();
            warn!(job_id = %id, path = %self.path.display(), error = %e, "failed to persist history");
            return Err(e);
        }

        debug!(job_id = %id, path = %self.path.display(), "recorded job in history file");
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(name: &str) -> JobRecord {
        let data = serde_json::from_value(serde_json::json!({
            "metadata": {"size": 10},
            "instruction_statistics": {"total_instructions_analyzed": 0, "instruction_types": {}},
            "vendor_field": {"kept": true}
        }))
        .unwrap();
        JobRecord::new(name, Utc::now(), data)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = FileHistory::open(dir.path().join("nested/history.json"))
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/history.json");

        let first = record("first.bin");
        let second = record("second.bin");
        {
            let store = FileHistory::open(&path).await.unwrap();
            store.insert(first.clone()).await.unwrap();
            store.insert(second.clone()).await.unwrap();
        }

        let reopened = FileHistory::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![second, first.clone()]);
        assert_eq!(reopened.get(&first.id).await.unwrap(), first);

        // Stored newest first, same layout as the in-memory listing.
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["name"], "second.bin");
        assert_eq!(raw[1]["data"]["vendor_field"]["kept"], true);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not a list").unwrap();

        assert!(matches!(
            FileHistory::open(&path).await,
            Err(HistoryError::Corrupt { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_are_all_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let store = Arc::new(FileHistory::open(&path).await.unwrap());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.insert(record(&format!("job-{i}.bin"))).await })
            })
            .collect();
        for result in futures_util::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let reopened = FileHistory::open(&path).await.unwrap();
        assert_eq!(reopened.list().await.unwrap().len(), 8);
    }
}
