use std::path::Path;

use super::job::{ExecutionResult, Outcome, SENTINEL_CODE};
use crate::error::FailureKind;

/// Default cap on excerpt length, in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

pub const TIMEOUT_EXCERPT: &str = "execution timed out";
pub const NO_OUTPUT_EXCERPT: &str = "no error output";

/// Maps execution results to outcomes. Never retries.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeClassifier {
    excerpt_chars: usize,
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self {
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl OutcomeClassifier {
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    pub fn missing_input(path: &Path) -> Outcome {
        Outcome::Skipped {
            reason: format!("missing input path: {}", path.display()),
        }
    }

    pub fn classify(&self, result: ExecutionResult) -> Outcome {
        match result {
            ExecutionResult::Completed { exit_code: 0, .. } => Outcome::Success,
            ExecutionResult::Completed {
                exit_code,
                stdout,
                stderr,
            } => {
                let source = if !stderr.is_empty() { stderr } else { stdout };
                let excerpt = if source.is_empty() {
                    NO_OUTPUT_EXCERPT.to_string()
                } else {
                    truncate_chars(&source, self.excerpt_chars)
                };
                Outcome::Failed {
                    kind: FailureKind::ProcessError,
                    code: exit_code,
                    excerpt,
                }
            }
            ExecutionResult::TimedOut => Outcome::Failed {
                kind: FailureKind::ProcessTimeout,
                code: SENTINEL_CODE,
                excerpt: TIMEOUT_EXCERPT.to_string(),
            },
            ExecutionResult::RaisedException(message) => Outcome::Failed {
                kind: FailureKind::ProcessError,
                code: SENTINEL_CODE,
                excerpt: truncate_chars(&message, self.excerpt_chars),
            },
        }
    }
}

/// First `max` Unicode scalar values of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
