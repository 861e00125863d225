use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::job::JobId;
use crate::error::BenchError;

/// Lists dataset directories under `datasets_dir`, minus `exclusions`, sorted.
pub fn discover_jobs(
    datasets_dir: &Path,
    exclusions: &BTreeSet<String>,
) -> Result<Vec<JobId>, BenchError> {
    if !datasets_dir.is_dir() {
        return Err(BenchError::DatasetsDirMissing(datasets_dir.to_path_buf()));
    }

    let mut jobs = Vec::new();
    for entry in fs::read_dir(datasets_dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if exclusions.contains(&name) {
            tracing::debug!(dataset = %name, "excluded by configuration");
            continue;
        }
        jobs.push(JobId::new(name));
    }
    jobs.sort();
    Ok(jobs)
}
