use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{JobId, Outcome};
use crate::error::{BenchError, FailureKind};

/// File-name prefix of persisted reports.
pub const REPORT_PREFIX: &str = "batch_retrieval_results_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedJob {
    #[serde(rename = "dataset")]
    pub id: JobId,
    #[serde(rename = "returncode")]
    pub code: i32,
    #[serde(rename = "error")]
    pub excerpt: String,
    pub kind: FailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedJob {
    #[serde(rename = "dataset")]
    pub id: JobId,
    pub reason: String,
}

/// Aggregated outcome of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    /// Number of jobs the batch was asked to run.
    pub total: usize,
    /// Set when the operator stopped the batch before every job ran.
    pub interrupted: bool,
    pub success: Vec<JobId>,
    pub failed: Vec<FailedJob>,
    pub skipped: Vec<SkippedJob>,
}

impl BatchReport {
    pub fn new(run_id: impl Into<String>, total: usize) -> Self {
        Self {
            run_id: run_id.into(),
            created_at: Utc::now(),
            total,
            interrupted: false,
            success: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record(&mut self, id: JobId, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success.push(id),
            Outcome::Failed {
                kind,
                code,
                excerpt,
            } => self.failed.push(FailedJob {
                id,
                code,
                excerpt,
                kind,
            }),
            Outcome::Skipped { reason } => self.skipped.push(SkippedJob { id, reason }),
        }
    }

    /// Number of jobs with a recorded outcome.
    pub fn recorded(&self) -> usize {
        self.success.len() + self.failed.len() + self.skipped.len()
    }

    /// 1 if any job failed (or, with `fail_on_skipped`, was skipped), else 0.
    pub fn exit_code(&self, fail_on_skipped: bool) -> u8 {
        if !self.failed.is_empty() || (fail_on_skipped && !self.skipped.is_empty()) {
            1
        } else {
            0
        }
    }

    pub fn file_name(run_id: &str) -> String {
        format!("{REPORT_PREFIX}{run_id}.json")
    }

    /// Writes the report as pretty JSON under `dir`, returning the file path.
    pub fn persist(&self, dir: &Path) -> Result<PathBuf, BenchError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(&self.run_id));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}
