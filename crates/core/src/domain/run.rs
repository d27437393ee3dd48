// Run Result Domain Model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a single drained entry ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    Succeeded,
    Failed,
    Interrupted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "SUCCEEDED"),
            RunOutcome::Failed => write!(f, "FAILED"),
            RunOutcome::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// Overall status of a queue drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// The queue drained to empty.
    Completed,
    /// A run failed and the failure policy stopped the drain.
    Halted,
    /// The drain was stopped by cancellation.
    Interrupted,
}

/// Result of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub config: PathBuf,
    pub outcome: RunOutcome,
    pub exit_code: Option<i32>,
    pub duration_ms: i64,
}

/// Ordered record of everything a queue drain did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Wall-clock start of the drain, RFC 3339.
    pub started_at: String,
    pub status: BatchStatus,
    pub records: Vec<RunRecord>,
}

impl BatchReport {
    pub fn new(started_at: impl Into<String>) -> Self {
        Self {
            started_at: started_at.into(),
            status: BatchStatus::Completed,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: RunRecord) {
        self.records.push(record);
    }

    /// True when the drain ran to the end and every run succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.status == BatchStatus::Completed
            && self
                .records
                .iter()
                .all(|r| r.outcome == RunOutcome::Succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome == RunOutcome::Failed)
            .count()
    }
}
