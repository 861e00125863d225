//! Configuration loaded from `codebench.toml`.
//!
//! The [`BenchConfig`] struct holds every tunable of a batch run. Fields
//! missing from the file fall back to defaults matching the RepoEval layout.
//! The `CODEBENCH_TIMEOUT_SECS` environment variable takes precedence over
//! the file for the per-job timeout.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::batch::PrefixStripStrategy;
use crate::error::BenchError;

pub const DEFAULT_CONFIG_FILE: &str = "codebench.toml";
pub const TIMEOUT_ENV: &str = "CODEBENCH_TIMEOUT_SECS";

/// Top-level configuration loaded from `codebench.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Directory whose sub-directories name the datasets of a batch.
    pub datasets_dir: PathBuf,

    /// Dataset names never scheduled.
    pub exclude: BTreeSet<String>,

    /// Prefix removed from a dataset id before building its input path.
    pub strip_prefix: String,

    /// Separator trimmed once from each end of the stripped name.
    pub separator: char,

    /// Input path template; `{name}` receives the stripped dataset name.
    pub dataset_path_template: String,

    /// Retrieval program and its leading arguments.
    pub program: Vec<String>,

    /// Working directory for the retrieval program. Inherited when unset.
    pub working_dir: Option<PathBuf>,

    /// Per-job wall-clock limit in seconds.
    pub timeout_secs: u64,

    /// Maximum characters kept from a failed job's output.
    pub excerpt_chars: usize,

    /// Where the JSON report is written.
    pub report_dir: PathBuf,

    /// Treat skipped jobs as a batch failure.
    pub fail_on_skipped: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            datasets_dir: PathBuf::from("my_datasets"),
            exclude: BTreeSet::from([
                "repoeval__amazon-science_patchcore-inspection_".to_string()
            ]),
            strip_prefix: "repoeval_".to_string(),
            separator: '_',
            dataset_path_template: "output/repoeval/{name}.jsonl".to_string(),
            program: vec![
                "python3".to_string(),
                "eval_beir_sbert_canonical.py".to_string(),
            ],
            working_dir: None,
            timeout_secs: 3600,
            excerpt_chars: 500,
            report_dir: PathBuf::from("."),
            fail_on_skipped: false,
        }
    }
}

impl BenchConfig {
    /// Loads `path`, or `codebench.toml` in the current directory.
    /// Uses defaults if the default file does not exist; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(raw) = std::env::var(TIMEOUT_ENV)
            && !raw.is_empty()
        {
            config.timeout_secs = raw
                .parse()
                .with_context(|| {
                    format!("{TIMEOUT_ENV} must be a number of seconds, got {raw:?}")
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str::<BenchConfig>(&contents)
            .map_err(BenchError::from)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.program.is_empty() {
            return Err(BenchError::Config("program must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(BenchError::Config("timeout_secs must be positive".into()));
        }
        if !self.dataset_path_template.contains(crate::batch::NAME_PLACEHOLDER) {
            return Err(BenchError::Config(format!(
                "dataset_path_template must contain {}",
                crate::batch::NAME_PLACEHOLDER
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn path_strategy(&self) -> PrefixStripStrategy {
        PrefixStripStrategy::from_config(self)
    }
}
