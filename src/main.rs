mod batch;
mod cli;
mod config;
mod error;
mod executor;
mod orchestrator;
mod tools;
mod ui;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use batch::{JobResolver, OutcomeClassifier, Resolution, discover_jobs, truncate_chars};
use cli::{Cli, Command};
use config::BenchConfig;
use executor::ProcessExecutor;
use orchestrator::BatchRunner;
use ui::BatchProgress;

/// Characters of each extracted task shown by `extract-code --preview`.
const PREVIEW_CHARS: usize = 200;

/// Exit status after a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT: i32 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > info
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    let config = BenchConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Retrieve {
            run_id,
            result_dir,
            datasets_dir,
            report_dir,
            timeout_secs,
            exclude,
            fail_on_skipped,
            dry_run,
        } => {
            let mut config = config;
            if let Some(dir) = datasets_dir {
                config.datasets_dir = dir;
            }
            if let Some(dir) = report_dir {
                config.report_dir = dir;
            }
            if let Some(secs) = timeout_secs {
                config.timeout_secs = secs;
            }
            config.exclude.extend(exclude);
            config.fail_on_skipped |= fail_on_skipped;
            config.validate()?;

            let run_id =
                run_id.unwrap_or_else(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
            let result_dir = result_dir.unwrap_or_else(|| run_id.clone());
            retrieve(config, run_id, result_dir, dry_run).await
        }
        Command::ExtractCode {
            input,
            output,
            preview,
        } => {
            let (extracted, stats) = tools::codeblock::extract_generations_file(&input, &output)?;
            println!("Extracted {} tasks to {}", stats.total, output.display());
            println!("  with code block:       {}", stats.has_code_block);
            println!("  no block, empty:       {}", stats.no_code_block);
            println!("  empty candidate lists: {}", stats.empty);
            for (i, candidates) in extracted.iter().take(preview).enumerate() {
                let first = candidates.first().map(String::as_str).unwrap_or_default();
                println!("\nTask {} ({} chars):", i + 1, first.chars().count());
                if first.is_empty() {
                    println!("  (empty)");
                } else {
                    println!("{}", truncate_chars(first, PREVIEW_CHARS));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::CsvToTsv { datasets_dir } => {
            let dir = datasets_dir.unwrap_or(config.datasets_dir);
            let stats = tools::tsv::convert_datasets(&dir)?;
            println!(
                "Converted {} file(s), skipped {} director(ies), {} failure(s)",
                stats.converted, stats.skipped, stats.failed
            );
            Ok(if stats.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::SliceTasks {
            input,
            output,
            task_id,
        } => {
            let stats = tools::slice::slice_by_task_id(&input, &output, &task_id)?;
            println!(
                "Lines: {} total, {} moved to {}, {} remaining",
                stats.total,
                stats.matched,
                output.display(),
                stats.remaining
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::MakeTasks {
            project_dir,
            repo_name,
            output_file,
            extensions,
            window,
        } => {
            let tasks = tools::snippets::create_test_data(
                &project_dir,
                &repo_name,
                &output_file,
                &extensions,
                window,
            )?;
            println!("Wrote {} task(s) to {}", tasks.len(), output_file.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn retrieve(
    config: BenchConfig,
    run_id: String,
    result_dir: String,
    dry_run: bool,
) -> Result<ExitCode> {
    let jobs = discover_jobs(&config.datasets_dir, &config.exclude)?;
    let resolver = JobResolver::new(
        Box::new(config.path_strategy()),
        config.program.clone(),
        result_dir.as_str(),
    );

    println!("Run id:     {run_id}");
    println!("Result dir: {result_dir}");
    println!("Excluded:   {:?}", config.exclude);
    println!("Datasets:   {}", jobs.len());
    for (i, id) in jobs.iter().enumerate() {
        println!("  {}. {id}", i + 1);
    }

    if dry_run {
        println!();
        for id in &jobs {
            match resolver.resolve(id) {
                Resolution::Ready(desc) => println!("run  {id}: {}", desc.display_command()),
                Resolution::Missing(path) => {
                    println!("skip {id}: missing input path: {}", path.display())
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let executor = match &config.working_dir {
        Some(dir) => ProcessExecutor::with_working_dir(dir),
        None => ProcessExecutor::new(),
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, &flag).await {
            std::process::exit(INTERRUPTED_EXIT);
        }
    });

    let mut runner = BatchRunner::new(
        executor,
        resolver,
        OutcomeClassifier::new(config.excerpt_chars),
        config.timeout(),
    )
    .with_cancel_flag(cancel);

    println!();
    let mut progress = BatchProgress::new();
    let (report, path) = runner
        .run_and_persist(&run_id, jobs, &config.report_dir, &mut progress)
        .await?;

    ui::print_summary(&report, &path);
    Ok(ExitCode::from(report.exit_code(config.fail_on_skipped)))
}

/// Sets `cancel` on the first interrupt. Returns `true` on a second one,
/// meaning the caller should exit without waiting for the running job.
async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: &AtomicBool) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!("cannot listen for interrupts: {e}");
        return false;
    }
    warn!("interrupt received; finishing the current job (press Ctrl-C again to exit)");
    cancel.store(true, Ordering::SeqCst);

    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("second interrupt received; exiting");
    true
}
