//! Runs job descriptors as child processes.
//!
//! [`JobExecutor`] is the seam the orchestrator depends on; tests swap in a
//! mock. [`ProcessExecutor`] spawns the real retrieval program with captured
//! output and a wall-clock timeout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::batch::{ExecutionResult, JobDescriptor, SENTINEL_CODE};

/// Capability to execute one job. Every terminal condition is a value.
pub trait JobExecutor {
    async fn execute(&self, descriptor: &JobDescriptor, timeout: Duration) -> ExecutionResult;
}

/// Executes descriptors as OS processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }
}

impl JobExecutor for ProcessExecutor {
    async fn execute(&self, descriptor: &JobDescriptor, timeout: Duration) -> ExecutionResult {
        let Some((program, args)) = descriptor.command.split_first() else {
            return ExecutionResult::RaisedException("empty command".to_string());
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::RaisedException(format!(
                    "failed to launch {program}: {e}"
                ));
            }
        };

        // Pipes are drained concurrently so a chatty child cannot block on a full buffer.
        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));
        let readers = [stdout.abort_handle(), stderr.abort_handle()];

        let run = async {
            let status = child.wait().await?;
            let stdout = stdout.await.unwrap_or_default();
            let stderr = stderr.await.unwrap_or_default();
            Ok::<_, std::io::Error>((status, stdout, stderr))
        };

        let finished = tokio::time::timeout(timeout, run).await;
        match finished {
            Ok(Ok((status, stdout, stderr))) => {
                let exit_code = status.code().unwrap_or(SENTINEL_CODE);
                info!(
                    job = %descriptor.id,
                    exit_code,
                    elapsed = ?start.elapsed(),
                    "process exited"
                );
                ExecutionResult::Completed {
                    exit_code,
                    stdout,
                    stderr,
                }
            }
            Ok(Err(e)) => {
                readers.iter().for_each(|r| r.abort());
                terminate(&mut child).await;
                ExecutionResult::RaisedException(format!("failed waiting for {program}: {e}"))
            }
            Err(_) => {
                warn!(job = %descriptor.id, ?timeout, "process timed out, killing");
                readers.iter().for_each(|r| r.abort());
                terminate(&mut child).await;
                ExecutionResult::TimedOut
            }
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe
        && let Err(e) = pipe.read_to_end(&mut buf).await
    {
        debug!("error reading child output: {e}");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kills and reaps `child`. A child that already exited is not an error.
async fn terminate(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        debug!("kill after timeout failed (process likely exited): {e}");
    }
}
