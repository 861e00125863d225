use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{Instrument, info, info_span, warn};

use crate::batch::{
    BatchLifecycle, BatchReport, BatchState, JobDescriptor, JobId, JobResolver, Outcome,
    OutcomeClassifier, Resolution,
};
use crate::error::BenchError;
use crate::executor::JobExecutor;

/// Receives progress notifications while a batch runs.
pub trait BatchObserver {
    fn job_started(
        &mut self,
        index: usize,
        total: usize,
        id: &JobId,
        descriptor: Option<&JobDescriptor>,
    );
    fn job_finished(&mut self, id: &JobId, outcome: &Outcome);
}

/// Drives every job of a batch, one child process at a time.
pub struct BatchRunner<E> {
    executor: E,
    resolver: JobResolver,
    classifier: OutcomeClassifier,
    timeout: Duration,
    cancel: Arc<AtomicBool>,
    lifecycle: BatchLifecycle,
}

impl<E: JobExecutor> BatchRunner<E> {
    pub fn new(
        executor: E,
        resolver: JobResolver,
        classifier: OutcomeClassifier,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            resolver,
            classifier,
            timeout,
            cancel: Arc::new(AtomicBool::new(false)),
            lifecycle: BatchLifecycle::default(),
        }
    }

    /// Shares a flag that, once set, stops new jobs from being launched.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    #[allow(dead_code)]
    pub fn state(&self) -> BatchState {
        self.lifecycle.state()
    }

    /// Runs `jobs` in sorted order and returns the in-memory report.
    ///
    /// Per-job problems are classified into the report; only batch-level
    /// problems (duplicate ids, reuse of a finished runner) are errors.
    pub async fn run(
        &mut self,
        run_id: &str,
        mut jobs: Vec<JobId>,
        observer: &mut impl BatchObserver,
    ) -> Result<BatchReport, BenchError> {
        jobs.sort();
        if let Some(pair) = jobs.windows(2).find(|w| w[0] == w[1]) {
            return Err(BenchError::DuplicateJob(pair[0].clone()));
        }

        self.lifecycle.advance(BatchState::Running)?;
        let total = jobs.len();
        let mut report = BatchReport::new(run_id, total);
        info!(run_id, total, "batch started");

        for (index, id) in jobs.into_iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(
                    remaining = total - index,
                    "batch interrupted, not launching further jobs"
                );
                report.interrupted = true;
                break;
            }

            let outcome = match self.resolver.resolve(&id) {
                Resolution::Missing(path) => {
                    observer.job_started(index, total, &id, None);
                    OutcomeClassifier::missing_input(&path)
                }
                Resolution::Ready(descriptor) => {
                    observer.job_started(index, total, &id, Some(&descriptor));
                    let span = info_span!("job", dataset = %id);
                    let result = self
                        .executor
                        .execute(&descriptor, self.timeout)
                        .instrument(span)
                        .await;
                    self.classifier.classify(result)
                }
            };

            match outcome.failure_kind() {
                None => info!(dataset = %id, "job succeeded"),
                Some(kind) => warn!(dataset = %id, %kind, "job {outcome}"),
            }
            observer.job_finished(&id, &outcome);
            report.record(id, outcome);
        }

        self.lifecycle.advance(BatchState::Completed)?;
        info!(
            success = report.success.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "batch completed"
        );
        Ok(report)
    }

    /// Runs the batch and writes its report under `report_dir`.
    pub async fn run_and_persist(
        &mut self,
        run_id: &str,
        jobs: Vec<JobId>,
        report_dir: &Path,
        observer: &mut impl BatchObserver,
    ) -> Result<(BatchReport, PathBuf), BenchError> {
        let report = self.run(run_id, jobs, observer).await?;
        let path = report.persist(report_dir)?;
        info!(path = %path.display(), "report written");
        Ok((report, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ExecutionResult, PrefixStripStrategy};
    use crate::error::FailureKind;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct SilentObserver;

    impl BatchObserver for SilentObserver {
        fn job_started(&mut self, _: usize, _: usize, _: &JobId, _: Option<&JobDescriptor>) {}
        fn job_finished(&mut self, _: &JobId, _: &Outcome) {}
    }

    /// Returns canned results per dataset id and records every call.
    #[derive(Default)]
    struct MockExecutor {
        results: HashMap<String, ExecutionResult>,
        calls: Mutex<Vec<JobId>>,
        cancel_after_first: Option<Arc<AtomicBool>>,
    }

    impl MockExecutor {
        fn with(mut self, id: &str, result: ExecutionResult) -> Self {
            self.results.insert(id.to_string(), result);
            self
        }

        fn calls(&self) -> Vec<JobId> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl JobExecutor for MockExecutor {
        async fn execute(&self, descriptor: &JobDescriptor, _timeout: Duration) -> ExecutionResult {
            self.calls.lock().unwrap().push(descriptor.id.clone());
            if let Some(flag) = &self.cancel_after_first {
                flag.store(true, Ordering::SeqCst);
            }
            self.results
                .get(descriptor.id.as_str())
                .cloned()
                .unwrap_or(ExecutionResult::Completed {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
        }
    }

    fn exited(code: i32, stderr: &str) -> ExecutionResult {
        ExecutionResult::Completed {
            exit_code: code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Inputs live in a temp dir; ids map to `<tmp>/<id>.jsonl` verbatim.
    struct Fixture {
        tmp: TempDir,
    }

    impl Fixture {
        fn new(present: &[&str]) -> Self {
            let tmp = TempDir::new().unwrap();
            for id in present {
                fs::write(tmp.path().join(format!("{id}.jsonl")), "{}\n").unwrap();
            }
            Self { tmp }
        }

        fn runner(&self, executor: MockExecutor) -> BatchRunner<MockExecutor> {
            let template = format!("{}/{{name}}.jsonl", self.tmp.path().display());
            let resolver = JobResolver::new(
                Box::new(PrefixStripStrategy::new("repoeval_", '_', template)),
                vec!["retrieve".into()],
                "run-1",
            );
            BatchRunner::new(
                executor,
                resolver,
                OutcomeClassifier::default(),
                Duration::from_secs(1),
            )
        }
    }

    fn ids(names: &[&str]) -> Vec<JobId> {
        names.iter().map(|n| JobId::from(*n)).collect()
    }

    #[tokio::test]
    async fn mixed_batch_is_partitioned() {
        let fixture = Fixture::new(&["B", "C"]);
        let executor = MockExecutor::default().with("C", exited(1, "boom"));
        let mut runner = fixture.runner(executor);

        let report = runner
            .run("run-1", ids(&["C", "A", "B"]), &mut SilentObserver)
            .await
            .unwrap();

        assert_eq!(report.success, ids(&["B"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, JobId::from("C"));
        assert_eq!(report.failed[0].code, 1);
        assert_eq!(report.failed[0].excerpt, "boom");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, JobId::from("A"));
        assert!(report.skipped[0].reason.starts_with("missing input path: "));
        assert_eq!(report.exit_code(false), 1);
        assert_eq!(report.recorded(), report.total);
        assert_eq!(runner.state(), BatchState::Completed);
    }

    #[tokio::test]
    async fn missing_inputs_are_never_executed() {
        let fixture = Fixture::new(&["B"]);
        let mut runner = fixture.runner(MockExecutor::default());

        runner
            .run("run-1", ids(&["A", "B", "Z"]), &mut SilentObserver)
            .await
            .unwrap();

        assert_eq!(runner.executor.calls(), ids(&["B"]));
    }

    #[tokio::test]
    async fn jobs_run_in_sorted_order() {
        let fixture = Fixture::new(&["a", "b", "c"]);
        let mut runner = fixture.runner(MockExecutor::default());

        let report = runner
            .run("run-1", ids(&["c", "a", "b"]), &mut SilentObserver)
            .await
            .unwrap();

        assert_eq!(runner.executor.calls(), ids(&["a", "b", "c"]));
        assert_eq!(report.success, ids(&["a", "b", "c"]));
        assert_eq!(report.exit_code(false), 0);
    }

    #[tokio::test]
    async fn timeout_and_exception_are_failures() {
        let fixture = Fixture::new(&["slow", "broken"]);
        let executor = MockExecutor::default()
            .with("slow", ExecutionResult::TimedOut)
            .with("broken", ExecutionResult::RaisedException("spawn failed".into()));
        let mut runner = fixture.runner(executor);

        let report = runner
            .run("run-1", ids(&["slow", "broken"]), &mut SilentObserver)
            .await
            .unwrap();

        assert!(report.success.is_empty());
        let slow = report.failed.iter().find(|f| f.id.as_str() == "slow").unwrap();
        assert_eq!(slow.code, -1);
        assert_eq!(slow.excerpt, "execution timed out");
        assert_eq!(slow.kind, FailureKind::ProcessTimeout);
        let broken = report.failed.iter().find(|f| f.id.as_str() == "broken").unwrap();
        assert_eq!(broken.excerpt, "spawn failed");
    }

    #[tokio::test]
    async fn rerun_produces_same_partition() {
        let fixture = Fixture::new(&["B", "C", "D"]);
        let build = || {
            MockExecutor::default()
                .with("C", exited(2, "bad"))
                .with("D", ExecutionResult::TimedOut)
        };
        let jobs = ids(&["A", "B", "C", "D"]);

        let first = fixture
            .runner(build())
            .run("r1", jobs.clone(), &mut SilentObserver)
            .await
            .unwrap();
        let second = fixture
            .runner(build())
            .run("r2", jobs, &mut SilentObserver)
            .await
            .unwrap();

        assert_eq!(first.success, second.success);
        assert_eq!(first.failed, second.failed);
        assert_eq!(first.skipped, second.skipped);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected_before_running() {
        let fixture = Fixture::new(&["A"]);
        let mut runner = fixture.runner(MockExecutor::default());

        let err = runner
            .run("run-1", ids(&["A", "B", "A"]), &mut SilentObserver)
            .await
            .unwrap_err();

        assert!(matches!(err, BenchError::DuplicateJob(id) if id.as_str() == "A"));
        assert!(runner.executor.calls().is_empty());
        assert_eq!(runner.state(), BatchState::Pending);
    }

    #[tokio::test]
    async fn finished_runner_cannot_be_reused() {
        let fixture = Fixture::new(&[]);
        let mut runner = fixture.runner(MockExecutor::default());

        runner.run("run-1", Vec::new(), &mut SilentObserver).await.unwrap();
        let err = runner
            .run("run-2", Vec::new(), &mut SilentObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancellation_keeps_recorded_prefix() {
        let fixture = Fixture::new(&["a", "b", "c"]);
        let flag = Arc::new(AtomicBool::new(false));
        let executor = MockExecutor {
            cancel_after_first: Some(flag.clone()),
            ..Default::default()
        };
        let mut runner = fixture.runner(executor).with_cancel_flag(flag);

        let report = runner
            .run("run-1", ids(&["a", "b", "c"]), &mut SilentObserver)
            .await
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.success, ids(&["a"]));
        assert_eq!(report.recorded(), 1);
        assert_eq!(report.total, 3);
        assert_eq!(runner.state(), BatchState::Completed);
    }

    #[tokio::test]
    async fn observer_sees_every_job() {
        #[derive(Default)]
        struct Recorder {
            started: Vec<(usize, String, bool)>,
            finished: Vec<String>,
        }

        impl BatchObserver for Recorder {
            fn job_started(
                &mut self,
                index: usize,
                _: usize,
                id: &JobId,
                d: Option<&JobDescriptor>,
            ) {
                self.started.push((index, id.to_string(), d.is_some()));
            }
            fn job_finished(&mut self, id: &JobId, _: &Outcome) {
                self.finished.push(id.to_string());
            }
        }

        let fixture = Fixture::new(&["b"]);
        let mut runner = fixture.runner(MockExecutor::default());
        let mut recorder = Recorder::default();

        runner
            .run("run-1", ids(&["b", "a"]), &mut recorder)
            .await
            .unwrap();

        assert_eq!(
            recorder.started,
            vec![(0, "a".to_string(), false), (1, "b".to_string(), true)]
        );
        assert_eq!(recorder.finished, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn run_and_persist_writes_report() {
        let fixture = Fixture::new(&["B"]);
        let report_dir = fixture.tmp.path().join("reports");
        let mut runner = fixture.runner(MockExecutor::default());

        let (report, path) = runner
            .run_and_persist("20250102_030405", ids(&["A", "B"]), &report_dir, &mut SilentObserver)
            .await
            .unwrap();

        assert_eq!(
            path,
            report_dir.join("batch_retrieval_results_20250102_030405.json")
        );
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["success"], serde_json::json!(["B"]));
        assert_eq!(value["skipped"][0]["dataset"], "A");
        assert_eq!(report.exit_code(false), 0);
        assert_eq!(report.exit_code(true), 1);
    }
}
