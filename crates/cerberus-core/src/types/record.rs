use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::{AnalysisResult, AnalysisStats};
use super::job::JobId;

/// Immutable outcome of a successful job
///
/// Serializes as `{id, name, date, data}`, the unit written to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier
    pub id: JobId,

    /// Original file name as submitted
    pub name: String,

    /// Submission timestamp
    pub date: DateTime<Utc>,

    /// Engine report
    pub data: AnalysisResult,
}

impl JobRecord {
    /// Build a record for a freshly completed job
    #[must_use]
    pub fn new(name: impl Into<String>, submitted_at: DateTime<Utc>, data: AnalysisResult) -> Self {
        Self {
            id: JobId::generate(),
            name: name.into(),
            date: submitted_at,
            data,
        }
    }

    /// Headline numbers of the report
    #[must_use]
    pub fn stats(&self) -> AnalysisStats {
        self.data.stats()
    }

    /// File name used when exporting the report
    #[must_use]
    pub fn export_file_name(&self) -> String {
        format!("{}-analysis.json", self.name)
    }

    /// Case-insensitive substring match on the file name
    #[must_use]
    pub fn name_matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(&term.to_lowercase())
    }
}

/// Totals across every record in a history store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Number of completed analyses
    pub analyses: usize,
    /// Instructions analysed across all reports
    pub instructions: u64,
    /// ML operations across all reports
    pub ml_operations: u64,
    /// Framework detections across all reports
    pub frameworks: usize,
}

impl HistoryStats {
    /// Sum the stats of the given records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a JobRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, record| {
            let stats = record.stats();
            acc.analyses += 1;
            // Totals come from engine output and are not trusted to be small.
            acc.instructions = acc.instructions.saturating_add(stats.instructions);
            acc.ml_operations = acc.ml_operations.saturating_add(stats.ml_operations);
            acc.frameworks = acc.frameworks.saturating_add(stats.frameworks);
            acc
        })
    }
}
