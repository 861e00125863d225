//! Turns a source tree into RepoEval-style completion tasks.
//!
//! Each file is cut into overlapping windows: up to 20 lines of preceding
//! context form the prompt and the next 5 lines are the ground truth.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const CONTEXT_LINES: usize = 20;
const TARGET_LINES: usize = 5;
const MIN_FILE_LINES: usize = 10;
const MIN_STRIDE: usize = 5;

pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_EXTENSIONS: &[&str] = &[".py", ".st", ".java", ".cpp", ".c", ".js", ".ts"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub task_id: String,
    pub ground_truth: String,
    pub fpath_tuple: Vec<String>,
    pub lineno: usize,
    pub context_start_lineno: usize,
    pub line_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTask {
    pub prompt: String,
    pub metadata: TaskMetadata,
}

/// Components of `path` below the parent of `project_dir`, so the project
/// directory's own name leads the tuple.
fn fpath_tuple(path: &Path, project_dir: &Path) -> Vec<String> {
    let base = project_dir.parent().unwrap_or(Path::new(""));
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// Windows over `lines` (each keeping its line terminator).
pub fn snippets_from_lines(
    lines: &[&str],
    repo_name: &str,
    fpath: &[String],
    window: usize,
) -> Vec<CompletionTask> {
    let mut tasks = Vec::new();
    if lines.len() < MIN_FILE_LINES {
        return tasks;
    }

    let stride = (window / 4).max(MIN_STRIDE);
    for i in (0..lines.len()).step_by(stride) {
        if i + TARGET_LINES >= lines.len() {
            break;
        }
        let context_start = i.saturating_sub(CONTEXT_LINES);
        let gt_end = (i + TARGET_LINES).min(lines.len());

        tasks.push(CompletionTask {
            prompt: lines[context_start..i].concat(),
            metadata: TaskMetadata {
                task_id: format!("{repo_name}/{}/{}", fpath.join("/"), tasks.len()),
                ground_truth: lines[i..gt_end].concat(),
                fpath_tuple: fpath.to_vec(),
                lineno: i,
                context_start_lineno: context_start,
                line_no: i,
            },
        });
    }
    tasks
}

/// Reads one file and windows it. Unreadable files yield no tasks.
pub fn snippets_from_file(
    path: &Path,
    fpath: &[String],
    repo_name: &str,
    window: usize,
) -> Vec<CompletionTask> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), "cannot read file: {e}");
            return Vec::new();
        }
    };
    let content = normalize_newlines(&content);
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    snippets_from_lines(&lines, repo_name, fpath, window)
}

/// Rewrites `\r\n` and lone `\r` line endings as `\n`.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Source files under `project_dir` whose names end with one of `extensions`.
pub fn collect_source_files(project_dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(project_dir)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Builds tasks for every matching file and writes them as JSONL to `output`.
pub fn create_test_data(
    project_dir: &Path,
    repo_name: &str,
    output: &Path,
    extensions: &[String],
    window: usize,
) -> Result<Vec<CompletionTask>> {
    if !project_dir.is_dir() {
        anyhow::bail!("project directory does not exist: {}", project_dir.display());
    }

    let files = collect_source_files(project_dir, extensions);
    info!(count = files.len(), "source files found");

    let mut tasks = Vec::new();
    for file in &files {
        let fpath = fpath_tuple(file, project_dir);
        let file_tasks = snippets_from_file(file, &fpath, repo_name, window);
        debug!(path = %file.display(), tasks = file_tasks.len(), "extracted");
        tasks.extend(file_tasks);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = std::io::BufWriter::new(
        fs::File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    for task in &tasks {
        serde_json::to_writer(&mut out, task)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    info!(tasks = tasks.len(), path = %output.display(), "test data written");

    Ok(tasks)
}
