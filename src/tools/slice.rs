//! Moves the JSONL records of a single task id into their own file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SliceStats {
    pub total: usize,
    pub matched: usize,
    pub remaining: usize,
}

/// Path the untouched input is moved to before it is rewritten.
pub fn backup_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

fn task_id(line: &str) -> Result<Option<String>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    Ok(value
        .get("metadata")
        .and_then(|m| m.get("task_id"))
        .and_then(|t| t.as_str())
        .map(str::to_string))
}

/// Moves lines whose `metadata.task_id` equals `target` from `input` to `output`.
///
/// Blank lines are dropped and unparseable lines stay in `input`. Nothing is
/// written when no line matches. Otherwise `input` is renamed to
/// `<input>.backup` and rewritten with the remaining lines, unless no lines
/// remain, in which case it is left as is.
pub fn slice_by_task_id(input: &Path, output: &Path, target: &str) -> Result<SliceStats> {
    let content =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;

    let mut matched = Vec::new();
    let mut remaining = Vec::new();
    let mut total = 0;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        total += 1;
        match task_id(line) {
            Ok(Some(id)) if id == target => matched.push(line),
            Ok(_) => remaining.push(line),
            Err(e) => {
                warn!(line = line_no + 1, "unparseable JSON line kept in place: {e}");
                remaining.push(line);
            }
        }
    }

    let stats = SliceStats {
        total,
        matched: matched.len(),
        remaining: remaining.len(),
    };

    if matched.is_empty() {
        warn!(task_id = target, "no matching lines, nothing written");
        return Ok(stats);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, join_lines(&matched))
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(matched = stats.matched, path = %output.display(), "wrote matching lines");

    if remaining.is_empty() {
        warn!(path = %input.display(), "every line matched; input left unchanged");
        return Ok(stats);
    }

    let backup = backup_path(input);
    fs::rename(input, &backup)
        .with_context(|| format!("failed to back up {}", input.display()))?;
    fs::write(input, join_lines(&remaining))
        .with_context(|| format!("failed to rewrite {}", input.display()))?;
    info!(backup = %backup.display(), "input rewritten without matching lines");

    Ok(stats)
}

fn join_lines(lines: &[&str]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}
