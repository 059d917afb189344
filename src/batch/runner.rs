//! Batch orchestration
//!
//! [`BatchRunner`] discovers the file set, plans one [`Invocation`] per file,
//! drives them through an [`Executor`], and folds the outcomes into a
//! [`RunSummary`].
//!
//! With one job the files run strictly in sequence. With more, a semaphore
//! bounds a `JoinSet` so at most `jobs` compilers run at once; each task holds
//! its permit for the full spawn/wait/report cycle of one file. Results are
//! reported as tasks finish and aggregated only after all of them are joined.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::config::BatchConfig;
use super::discovery::discover_files;
use super::errors::{BatchError, BatchResult};
use super::executor::{Executor, InvocationOutcome, ProcessExecutor};
use super::invocation::Invocation;
use super::reporter::Reporter;

/// Aggregate of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Invocations that finished inside the budget (any exit code)
    pub completed: usize,
    pub timed_out: usize,
    /// Number of matched files
    pub total: usize,
    /// Completed invocations with a non-zero or missing exit code
    pub nonzero_exit: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a InvocationOutcome>, duration: Duration) -> Self {
        let mut summary = RunSummary {
            completed: 0,
            timed_out: 0,
            total: 0,
            nonzero_exit: 0,
            duration,
        };
        for outcome in outcomes {
            summary.total += 1;
            match outcome {
                InvocationOutcome::Completed { exit_code, .. } => {
                    summary.completed += 1;
                    if *exit_code != Some(0) {
                        summary.nonzero_exit += 1;
                    }
                }
                InvocationOutcome::TimedOut { .. } => summary.timed_out += 1,
            }
        }
        summary
    }

    pub fn has_timeouts(&self) -> bool {
        self.timed_out > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total compiled: {}/{}", self.completed, self.total)
    }
}

/// One finished invocation
#[derive(Debug, Clone)]
pub struct InvocationReport {
    pub invocation: Invocation,
    pub outcome: InvocationOutcome,
}

/// Drives a batch through an executor
pub struct BatchRunner<E: Executor + 'static = ProcessExecutor> {
    config: BatchConfig,
    executor: Arc<E>,
}

impl BatchRunner<ProcessExecutor> {
    /// Runner that spawns real processes
    pub fn new(config: BatchConfig) -> Self {
        let executor = ProcessExecutor::new(config.quiet_compiler);
        Self::with_executor(config, executor)
    }
}

impl<E: Executor + 'static> BatchRunner<E> {
    pub fn with_executor(config: BatchConfig, executor: E) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Discover the file set and plan one invocation per file.
    pub fn plan(&self) -> BatchResult<Vec<Invocation>> {
        self.config.validate()?;
        let files = discover_files(&self.config.root, &self.config.suffix)?;
        Ok(files.iter().map(|file| Invocation::plan(file, &self.config)).collect())
    }

    /// Discover, invoke, and summarize.
    ///
    /// Any error other than a timeout aborts the run; in-flight children are
    /// killed before this returns.
    pub async fn run(&self, reporter: &mut dyn Reporter) -> BatchResult<RunSummary> {
        let invocations = self.plan()?;
        reporter.on_discovery_complete(&self.config.root, invocations.len());
        self.run_invocations(invocations, reporter).await
    }

    /// Run an already-planned batch.
    pub async fn run_invocations(
        &self,
        invocations: Vec<Invocation>,
        reporter: &mut dyn Reporter,
    ) -> BatchResult<RunSummary> {
        let start = Instant::now();
        tracing::info!(
            files = invocations.len(),
            jobs = self.config.jobs,
            timeout_secs = self.config.timeout.as_secs_f64(),
            "starting batch"
        );

        let reports = if self.config.is_sequential() {
            self.run_sequential(invocations, reporter).await?
        } else {
            self.run_parallel(invocations, reporter).await?
        };

        let summary = RunSummary::from_outcomes(reports.iter().map(|r| &r.outcome), start.elapsed());
        tracing::info!(
            completed = summary.completed,
            timed_out = summary.timed_out,
            total = summary.total,
            "batch finished"
        );
        reporter.on_run_complete(&summary);
        Ok(summary)
    }

    async fn run_sequential(
        &self,
        invocations: Vec<Invocation>,
        reporter: &mut dyn Reporter,
    ) -> BatchResult<Vec<InvocationReport>> {
        let mut reports = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            reporter.on_invocation_start(&invocation);
            let outcome = self.executor.execute(&invocation, self.config.timeout).await?;
            reporter.on_invocation_complete(&invocation, &outcome);
            reports.push(InvocationReport { invocation, outcome });
        }
        Ok(reports)
    }

    async fn run_parallel(
        &self,
        invocations: Vec<Invocation>,
        reporter: &mut dyn Reporter,
    ) -> BatchResult<Vec<InvocationReport>> {
        let total = invocations.len();
        let semaphore = Arc::new(Semaphore::new(self.config.jobs));
        let mut tasks = JoinSet::new();

        for invocation in invocations {
            let semaphore = Arc::clone(&semaphore);
            let executor = Arc::clone(&self.executor);
            let timeout = self.config.timeout;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| BatchError::WorkerPanicked("worker pool closed".to_string()))?;
                tracing::debug!(file = %invocation.source.display(), "worker acquired slot");
                let outcome = executor.execute(&invocation, timeout).await?;
                Ok::<_, BatchError>(InvocationReport { invocation, outcome })
            });
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => Err(BatchError::WorkerPanicked(e.to_string())),
            };
            match result {
                Ok(report) => {
                    reporter.on_invocation_start(&report.invocation);
                    reporter.on_invocation_complete(&report.invocation, &report.outcome);
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!(error = %e, "aborting batch");
                    tasks.shutdown().await;
                    return Err(e);
                }
            }
        }
        Ok(reports)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::batch::reporter::ConsoleReporter;

    /// Times out any file whose name contains "hang"; fails to spawn on "boom".
    #[derive(Default)]
    struct ScriptedExecutor {
        seen: Mutex<Vec<PathBuf>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(&self, invocation: &Invocation, timeout: Duration) -> BatchResult<InvocationOutcome> {
            self.seen.lock().unwrap().push(invocation.source.clone());
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let name = invocation.display_name();
            if name.contains("boom") {
                return Err(BatchError::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                });
            }
            if name.contains("hang") {
                return Ok(InvocationOutcome::TimedOut { duration: timeout });
            }
            let exit_code = if name.contains("bad") { Some(1) } else { Some(0) };
            Ok(InvocationOutcome::Completed {
                exit_code,
                duration: Duration::from_millis(20),
            })
        }
    }

    fn tree(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "fn main() {}").unwrap();
        }
        dir
    }

    fn runner(dir: &tempfile::TempDir, jobs: usize) -> BatchRunner<ScriptedExecutor> {
        let config = BatchConfig::new().with_root(dir.path()).with_jobs(jobs);
        BatchRunner::with_executor(config, ScriptedExecutor::default())
    }

    #[test]
    fn test_summary_fold() {
        let outcomes = [
            InvocationOutcome::Completed {
                exit_code: Some(0),
                duration: Duration::ZERO,
            },
            InvocationOutcome::Completed {
                exit_code: Some(101),
                duration: Duration::ZERO,
            },
            InvocationOutcome::TimedOut { duration: Duration::ZERO },
        ];
        let summary = RunSummary::from_outcomes(&outcomes, Duration::ZERO);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.nonzero_exit, 1);
        assert_eq!(summary.to_string(), "total compiled: 2/3");
    }

    #[test]
    fn test_empty_summary_is_zero_over_zero() {
        let none: [InvocationOutcome; 0] = [];
        let summary = RunSummary::from_outcomes(&none, Duration::ZERO);
        assert_eq!(summary.to_string(), "total compiled: 0/0");
        assert!(!summary.has_timeouts());
    }

    #[tokio::test]
    async fn test_sequential_two_of_three() {
        let dir = tree(&["a.rs", "b_hang.rs", "sub/c.rs", "notes.md"]);
        let runner = runner(&dir, 1);
        let mut reporter = ConsoleReporter::new(Vec::new(), false);

        let summary = runner.run(&mut reporter).await.unwrap();
        assert_eq!((summary.completed, summary.total), (2, 3));
        assert_eq!(runner.executor.peak.load(Ordering::SeqCst), 1);

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.contains("timed out."));
        assert!(out.trim_end().ends_with("total compiled: 2/3"));
    }

    #[tokio::test]
    async fn test_parallel_two_of_three() {
        let dir = tree(&["a.rs", "b_hang.rs", "sub/c.rs"]);
        let runner = runner(&dir, 3);
        let mut reporter = ConsoleReporter::new(Vec::new(), false);

        let summary = runner.run(&mut reporter).await.unwrap();
        assert_eq!((summary.completed, summary.timed_out, summary.total), (2, 1, 3));
    }

    #[tokio::test]
    async fn test_every_file_invoked_exactly_once() {
        let names: Vec<String> = (0..12).map(|i| format!("d{}/f{}.rs", i % 3, i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = tree(&refs);
        let runner = runner(&dir, 4);

        let summary = runner.run(&mut ConsoleReporter::new(Vec::new(), false)).await.unwrap();
        assert_eq!(summary.total, 12);

        let mut seen = runner.executor.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 12);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 12);
        assert!(runner.executor.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_verbose_prints_every_command_in_both_paths() {
        for jobs in [1, 2] {
            let dir = tree(&["a.rs", "b.rs", "sub/c.rs"]);
            let mut reporter = ConsoleReporter::new(Vec::new(), true);
            runner(&dir, jobs).run(&mut reporter).await.unwrap();

            let out = String::from_utf8(reporter.into_inner()).unwrap();
            let commands = out.lines().filter(|l| l.starts_with("$ ")).count();
            assert_eq!(commands, 3, "jobs={jobs}");
        }
    }

    #[tokio::test]
    async fn test_suffix_matching_artifacts_is_rejected_before_invoking() {
        let dir = tree(&["seed/prog.out"]);
        let config = BatchConfig::new().with_root(dir.path()).with_suffix(".out");
        let runner = BatchRunner::with_executor(config, ScriptedExecutor::default());

        let err = runner.run(&mut ConsoleReporter::new(Vec::new(), false)).await.unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
        assert!(runner.executor.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_still_counts() {
        let dir = tree(&["ok.rs", "bad.rs"]);
        let summary = runner(&dir, 1)
            .run(&mut ConsoleReporter::new(Vec::new(), false))
            .await
            .unwrap();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.nonzero_exit, 1);
    }

    #[tokio::test]
    async fn test_empty_root() {
        let dir = tree(&[]);
        let mut reporter = ConsoleReporter::new(Vec::new(), false);
        let summary = runner(&dir, 2).run(&mut reporter).await.unwrap();
        assert_eq!(summary.total, 0);
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out.trim_end(), "total compiled: 0/0");
    }

    #[tokio::test]
    async fn test_spawn_error_aborts_sequential() {
        let dir = tree(&["a.rs", "boom.rs", "c.rs"]);
        let runner = runner(&dir, 1);
        let err = runner.run(&mut ConsoleReporter::new(Vec::new(), false)).await.unwrap_err();
        assert!(matches!(err, BatchError::Spawn { .. }));
        // c.rs sorts after boom.rs and is never attempted
        assert_eq!(runner.executor.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_spawn_error_aborts_parallel() {
        let dir = tree(&["a.rs", "boom.rs", "c.rs"]);
        let err = runner(&dir, 2)
            .run(&mut ConsoleReporter::new(Vec::new(), false))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = tree(&[]);
        let config = BatchConfig::new().with_root(dir.path().join("absent"));
        let runner = BatchRunner::with_executor(config, ScriptedExecutor::default());
        let err = runner.run(&mut ConsoleReporter::new(Vec::new(), false)).await.unwrap_err();
        assert!(matches!(err, BatchError::RootNotFound(_)));
    }
}
