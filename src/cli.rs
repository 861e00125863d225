//! Command-line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (retrieve, extract-code,
//! csv-to-tsv, slice-tasks, make-tasks) and the global `--config` and
//! `--verbose` flags.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::tools::snippets::{DEFAULT_EXTENSIONS, DEFAULT_WINDOW};

/// codebench: retrieval batch runner and data utilities for code-completion benchmarks.
#[derive(Debug, Parser)]
#[command(name = "codebench", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (defaults to ./codebench.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the retrieval program once per dataset and write a JSON report.
    Retrieve {
        /// Identifier of this run; names the report file. Defaults to a timestamp.
        #[arg(long)]
        run_id: Option<String>,

        /// Shared directory passed to every job as --result_dir. Defaults to the run id.
        #[arg(long)]
        result_dir: Option<String>,

        /// Directory whose sub-directories are the datasets.
        #[arg(long)]
        datasets_dir: Option<PathBuf>,

        /// Where the JSON report is written.
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Per-job timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Additional dataset names to leave out (repeatable).
        #[arg(long)]
        exclude: Vec<String>,

        /// Exit non-zero when any dataset was skipped.
        #[arg(long, default_value_t = false)]
        fail_on_skipped: bool,

        /// Print the resolved plan without running anything.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Extract the first fenced code block from every generation.
    ExtractCode {
        /// JSON array of arrays of generation strings.
        input: PathBuf,

        /// Output JSON file.
        #[arg(long, short)]
        output: PathBuf,

        /// Number of extracted tasks to print afterwards.
        #[arg(long, default_value_t = 3)]
        preview: usize,
    },

    /// Convert qrels/test.csv to test.tsv in every dataset directory.
    CsvToTsv {
        /// Datasets directory (defaults to the configured one).
        #[arg(long)]
        datasets_dir: Option<PathBuf>,
    },

    /// Move all JSONL records with a given metadata.task_id into their own file.
    SliceTasks {
        /// Input JSONL file; rewritten in place, original kept as <input>.backup.
        #[arg(long)]
        input: PathBuf,

        /// Output JSONL file for the matching records.
        #[arg(long)]
        output: PathBuf,

        /// Task id to move.
        #[arg(long)]
        task_id: String,
    },

    /// Build windowed completion tasks from a source tree.
    MakeTasks {
        /// Project source directory.
        #[arg(long)]
        project_dir: PathBuf,

        /// Repository name used as the task id prefix.
        #[arg(long)]
        repo_name: String,

        /// Output JSONL file.
        #[arg(long)]
        output_file: PathBuf,

        /// File extensions to include.
        #[arg(long, num_args = 1.., default_values = DEFAULT_EXTENSIONS.iter().copied())]
        extensions: Vec<String>,

        /// Window size in lines; the stride is a quarter of it (at least 5).
        #[arg(long, default_value_t = DEFAULT_WINDOW)]
        window: usize,
    },
}
