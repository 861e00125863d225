//! Maps dataset ids to concrete retrieval invocations.
//!
//! The id → input-path rule is pluggable through [`InputPathStrategy`];
//! [`PrefixStripStrategy`] implements the `repoeval_<name>_` convention used
//! by the benchmark's dataset directories.

use std::path::PathBuf;

use super::job::{JobDescriptor, JobId};
use crate::config::BenchConfig;

/// Placeholder substituted with the inner dataset name in path templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Derives the required input file for a job.
pub trait InputPathStrategy: Send + Sync {
    fn input_path(&self, id: &JobId) -> PathBuf;
}

/// Strips a known prefix (and one separator at either end) from the id and
/// substitutes the remainder into a path template.
#[derive(Debug, Clone)]
pub struct PrefixStripStrategy {
    prefix: String,
    separator: char,
    template: String,
}

impl PrefixStripStrategy {
    pub fn new(prefix: impl Into<String>, separator: char, template: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator,
            template: template.into(),
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(
            config.strip_prefix.clone(),
            config.separator,
            config.dataset_path_template.clone(),
        )
    }

    /// `repoeval__owner_repo_` → `owner_repo`. Ids without the prefix pass through.
    pub fn inner_name<'a>(&self, id: &'a JobId) -> &'a str {
        let raw = id.as_str();
        let Some(rest) = raw.strip_prefix(self.prefix.as_str()) else {
            return raw;
        };
        let rest = rest.strip_prefix(self.separator).unwrap_or(rest);
        rest.strip_suffix(self.separator).unwrap_or(rest)
    }
}

impl InputPathStrategy for PrefixStripStrategy {
    fn input_path(&self, id: &JobId) -> PathBuf {
        PathBuf::from(self.template.replace(NAME_PLACEHOLDER, self.inner_name(id)))
    }
}

/// Result of resolving a job before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready(JobDescriptor),
    /// The derived input path does not exist.
    Missing(PathBuf),
}

/// Builds descriptors for every job in a batch.
pub struct JobResolver {
    strategy: Box<dyn InputPathStrategy>,
    program: Vec<String>,
    result_dir: String,
}

impl JobResolver {
    pub fn new(
        strategy: Box<dyn InputPathStrategy>,
        program: Vec<String>,
        result_dir: impl Into<String>,
    ) -> Self {
        Self {
            strategy,
            program,
            result_dir: result_dir.into(),
        }
    }

    /// Builds the descriptor without touching the filesystem.
    pub fn describe(&self, id: &JobId) -> JobDescriptor {
        let input_path = self.strategy.input_path(id);
        let mut command = self.program.clone();
        command.extend([
            "--dataset".to_string(),
            id.to_string(),
            "--dataset_path".to_string(),
            input_path.display().to_string(),
            "--result_dir".to_string(),
            self.result_dir.clone(),
        ]);
        JobDescriptor {
            id: id.clone(),
            command,
            input_path,
        }
    }

    pub fn resolve(&self, id: &JobId) -> Resolution {
        let descriptor = self.describe(id);
        if descriptor.input_path.exists() {
            Resolution::Ready(descriptor)
        } else {
            Resolution::Missing(descriptor.input_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repoeval() -> PrefixStripStrategy {
        PrefixStripStrategy::new("repoeval_", '_', "output/repoeval/{name}.jsonl")
    }

    #[test]
    fn strips_prefix_and_wrapping_separators() {
        let s = repoeval();
        let id = JobId::from("repoeval__amazon-science_patchcore-inspection_");
        assert_eq!(s.inner_name(&id), "amazon-science_patchcore-inspection");
    }

    #[test]
    fn strips_single_separator_prefix() {
        let s = repoeval();
        assert_eq!(
            s.inner_name(&JobId::from("repoeval_huggingface_evaluate")),
            "huggingface_evaluate"
        );
    }

    #[test]
    fn unprefixed_ids_pass_through() {
        let s = repoeval();
        let id = JobId::from("_custom_");
        assert_eq!(s.inner_name(&id), "_custom_");
        assert_eq!(
            s.input_path(&id),
            PathBuf::from("output/repoeval/_custom_.jsonl")
        );
    }

    #[test]
    fn describe_builds_retrieval_invocation() {
        let resolver = JobResolver::new(
            Box::new(repoeval()),
            vec!["python3".into(), "eval_beir_sbert_canonical.py".into()],
            "20250101_120000",
        );
        let desc = resolver.describe(&JobId::from("repoeval__owner_repo_"));
        assert_eq!(
            desc.command,
            vec![
                "python3",
                "eval_beir_sbert_canonical.py",
                "--dataset",
                "repoeval__owner_repo_",
                "--dataset_path",
                "output/repoeval/owner_repo.jsonl",
                "--result_dir",
                "20250101_120000",
            ]
        );
        assert_eq!(desc.input_path, PathBuf::from("output/repoeval/owner_repo.jsonl"));
    }

    #[test]
    fn resolve_checks_input_existence() {
        let tmp = TempDir::new().unwrap();
        let template = format!("{}/{{name}}.jsonl", tmp.path().display());
        let resolver = JobResolver::new(
            Box::new(PrefixStripStrategy::new("repoeval_", '_', template)),
            vec!["true".into()],
            "run",
        );

        fs::write(tmp.path().join("present.jsonl"), "{}\n").unwrap();

        assert!(matches!(
            resolver.resolve(&JobId::from("repoeval_present")),
            Resolution::Ready(_)
        ));
        match resolver.resolve(&JobId::from("repoeval_absent")) {
            Resolution::Missing(path) => assert_eq!(path, tmp.path().join("absent.jsonl")),
            other => panic!("expected Missing, got {other:?}"),
        }
    }
}
