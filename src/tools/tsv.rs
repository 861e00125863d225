use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Naive reformat: every comma becomes a tab. Quoted fields are not special.
pub fn convert_csv_to_tsv(csv: &Path, tsv: &Path) -> Result<()> {
    let content =
        fs::read_to_string(csv).with_context(|| format!("failed to read {}", csv.display()))?;
    fs::write(tsv, content.replace(',', "\t"))
        .with_context(|| format!("failed to write {}", tsv.display()))?;
    Ok(())
}

/// Converts `<dataset>/qrels/test.csv` to `test.tsv` for every dataset directory.
pub fn convert_datasets(datasets_dir: &Path) -> Result<ConversionStats> {
    let mut stats = ConversionStats::default();
    let mut entries = fs::read_dir(datasets_dir)
        .with_context(|| format!("failed to list {}", datasets_dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if !entry.path().is_dir() {
            continue;
        }
        let qrels = entry.path().join("qrels");
        let csv = qrels.join("test.csv");
        if !csv.is_file() {
            info!(dataset = %entry.file_name().to_string_lossy(), "no qrels/test.csv, skipping");
            stats.skipped += 1;
            continue;
        }
        match convert_csv_to_tsv(&csv, &qrels.join("test.tsv")) {
            Ok(()) => {
                info!(path = %csv.display(), "converted to tsv");
                stats.converted += 1;
            }
            Err(e) => {
                warn!(path = %csv.display(), "conversion failed: {e:#}");
                stats.failed += 1;
            }
        }
    }
    Ok(stats)
}
