//! Terminal output for batch runs: spinners and colored summaries.
//!
//! Uses `indicatif` for per-job spinners and `console` for styling.
//! [`BatchProgress`] follows a running batch; [`print_summary`] renders the
//! final report for humans.

use std::path::Path;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::{BatchReport, JobDescriptor, JobId, Outcome, truncate_chars};
use crate::orchestrator::BatchObserver;

/// Characters of a failure excerpt echoed while the batch is still running.
const LIVE_EXCERPT_CHARS: usize = 200;

/// Visual progress for a running batch.
///
/// Shows a spinner while each job runs, then a green, red or yellow line
/// for success, failure or skip.
pub struct BatchProgress {
    pb: Option<ProgressBar>,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self {
            pb: None,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .expect("invalid template"),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl BatchObserver for BatchProgress {
    fn job_started(
        &mut self,
        index: usize,
        total: usize,
        id: &JobId,
        descriptor: Option<&JobDescriptor>,
    ) {
        println!("[{}/{total}] {id}", index + 1);
        if let Some(desc) = descriptor {
            println!("  {}", self.dim.apply_to(desc.display_command()));
            self.pb = Some(Self::spinner(format!("running {id}")));
        }
    }

    fn job_finished(&mut self, _id: &JobId, outcome: &Outcome) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        match outcome {
            Outcome::Success => println!("  {} success", self.green.apply_to("✓")),
            Outcome::Failed { code, excerpt, .. } => {
                println!("  {} failed (code {code})", self.red.apply_to("✗"));
                println!("    {}", truncate_chars(excerpt, LIVE_EXCERPT_CHARS));
            }
            Outcome::Skipped { reason } => {
                println!("  {} skipped: {reason}", self.yellow.apply_to("⚠"));
            }
        }
    }
}

/// Prints counts, per-bucket listings and where the report was written.
pub fn print_summary(report: &BatchReport, report_path: &Path) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();
    let yellow = Style::new().yellow();
    let rule = "=".repeat(80);

    println!();
    println!("{rule}");
    println!("Batch summary ({})", report.run_id);
    println!("{rule}");
    println!("Total:   {}", report.total);
    println!("Success: {}", green.apply_to(report.success.len()));
    println!("Failed:  {}", red.apply_to(report.failed.len()));
    println!("Skipped: {}", yellow.apply_to(report.skipped.len()));
    if report.interrupted {
        println!(
            "{}",
            yellow.apply_to(format!(
                "Interrupted: {} job(s) not run",
                report.total - report.recorded()
            ))
        );
    }

    if !report.success.is_empty() {
        println!("\n{} Succeeded ({}):", green.apply_to("✓"), report.success.len());
        for id in &report.success {
            println!("  - {id}");
        }
    }

    if !report.skipped.is_empty() {
        println!("\n{} Skipped ({}):", yellow.apply_to("⚠"), report.skipped.len());
        for item in &report.skipped {
            println!("  - {}: {}", item.id, item.reason);
        }
    }

    if !report.failed.is_empty() {
        println!("\n{} Failed ({}):", red.apply_to("✗"), report.failed.len());
        for item in &report.failed {
            println!("\n  dataset: {}", item.id);
            println!("  code:    {} ({})", item.code, item.kind);
            println!("  output:");
            println!("    {}", item.excerpt);
            println!("{}", "-".repeat(80));
        }
    }

    println!("\nReport written to {}", report_path.display());
}
