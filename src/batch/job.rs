use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Exit code recorded when no real exit code is available.
pub const SENTINEL_CODE: i32 = -1;

/// Name of one dataset within a batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Executable form of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub id: JobId,
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub input_path: PathBuf,
}

impl JobDescriptor {
    /// Shell-ish rendering used for log lines and dry runs.
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

/// Raw result of handing a descriptor to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    TimedOut,
    RaisedException(String),
}

/// Final classification of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed {
        kind: FailureKind,
        code: i32,
        excerpt: String,
    },
    Skipped {
        reason: String,
    },
}

impl Outcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success => None,
            Outcome::Failed { kind, .. } => Some(*kind),
            Outcome::Skipped { .. } => Some(FailureKind::InputMissing),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failed { kind, code, .. } => write!(f, "failed ({kind}, code {code})"),
            Outcome::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}
