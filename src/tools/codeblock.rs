//! Extracts code from raw model generations.
//!
//! A generation file is a JSON array (one entry per task) of arrays of
//! candidate strings. Each candidate is reduced to the body of its first
//! fenced code block, or to the trimmed text when it has none.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(\w*)\n(.*?)\n```").expect("code block pattern is valid")
});

const FENCE: &str = "```";

/// Body of the first fenced block in `text`, trimmed; otherwise `text` trimmed.
pub fn extract_code(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    match CODE_BLOCK.captures(text).and_then(|c| c.get(2)) {
        Some(body) => body.as_str().trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub total: usize,
    /// Candidates containing a fence marker.
    pub has_code_block: usize,
    /// Candidates without a fence that extracted to nothing.
    pub no_code_block: usize,
    /// Tasks with no candidates at all.
    pub empty: usize,
}

/// Applies [`extract_code`] to every candidate. Empty tasks become `[""]`.
pub fn extract_all(generations: &[Vec<String>]) -> (Vec<Vec<String>>, ExtractionStats) {
    let mut stats = ExtractionStats {
        total: generations.len(),
        ..Default::default()
    };

    let extracted = generations
        .iter()
        .map(|candidates| {
            if candidates.is_empty() {
                stats.empty += 1;
                return vec![String::new()];
            }
            candidates
                .iter()
                .map(|generation| {
                    let code = extract_code(generation);
                    if generation.contains(FENCE) {
                        stats.has_code_block += 1;
                    } else if code.is_empty() {
                        stats.no_code_block += 1;
                    }
                    code
                })
                .collect()
        })
        .collect();

    (extracted, stats)
}

/// Reads `input`, extracts every candidate and writes pretty JSON to `output`.
pub fn extract_generations_file(
    input: &Path,
    output: &Path,
) -> Result<(Vec<Vec<String>>, ExtractionStats)> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let generations: Vec<Vec<String>> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of string arrays", input.display()))?;

    let (extracted, stats) = extract_all(&generations);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, serde_json::to_string_pretty(&extracted)?)
        .with_context(|| format!("failed to write {}", output.display()))?;

    Ok((extracted, stats))
}
