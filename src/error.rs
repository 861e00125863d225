use std::path::PathBuf;

use thiserror::Error;

use crate::batch::{BatchState, JobId};

/// Errors that abort a whole batch run.
///
/// Per-job problems never surface here; they are classified into the report.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Datasets directory does not exist: {}", .0.display())]
    DatasetsDirMissing(PathBuf),

    #[error("Duplicate job id in batch: {0}")]
    DuplicateJob(JobId),

    #[error("Invalid batch transition: {from} -> {to}")]
    InvalidTransition { from: BatchState, to: BatchState },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Classifies why a job did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// Required input was absent; the job was never attempted.
    InputMissing,
    /// The child exceeded its wall-clock budget.
    ProcessTimeout,
    /// Non-zero exit or the process could not be launched.
    ProcessError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::InputMissing => write!(f, "InputMissing"),
            FailureKind::ProcessTimeout => write!(f, "ProcessTimeout"),
            FailureKind::ProcessError => write!(f, "ProcessError"),
        }
    }
}
