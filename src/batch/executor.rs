//! Process execution with a wall-clock bound
//!
//! The [`Executor`] trait is the seam between orchestration and the operating
//! system. [`ProcessExecutor`] is the real implementation: it spawns the
//! compiler with `tokio::process`, waits at most `timeout`, and kills the child
//! if the budget runs out. Tests substitute their own executors.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use super::errors::{BatchError, BatchResult};
use super::invocation::Invocation;

/// What happened to one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Finished inside the budget. The exit code is informational only;
    /// `None` means the process was terminated by a signal.
    Completed { exit_code: Option<i32>, duration: Duration },
    /// Killed after exceeding the budget
    TimedOut { duration: Duration },
}

impl InvocationOutcome {
    /// Whether this invocation counts towards the success tally
    pub fn is_completed(&self) -> bool {
        matches!(self, InvocationOutcome::Completed { .. })
    }

    pub fn duration(&self) -> Duration {
        match self {
            InvocationOutcome::Completed { duration, .. } | InvocationOutcome::TimedOut { duration } => *duration,
        }
    }

    /// Exit code when completed, `None` otherwise
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            InvocationOutcome::Completed { exit_code, .. } => *exit_code,
            InvocationOutcome::TimedOut { .. } => None,
        }
    }
}

/// Runs one invocation to completion or timeout.
///
/// Implementations must return `Ok(TimedOut)` for an expired budget and
/// reserve `Err` for failures that should abort the whole run.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, invocation: &Invocation, timeout: Duration) -> BatchResult<InvocationOutcome>;
}

/// Spawns real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    /// Discard compiler stdout/stderr
    pub quiet: bool,
}

impl ProcessExecutor {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, invocation: &Invocation, timeout: Duration) -> BatchResult<InvocationOutcome> {
        ensure_output_dir(invocation)?;

        let start = Instant::now();
        let mut child = self.command(invocation).spawn().map_err(|source| BatchError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
        tracing::debug!(file = %invocation.source.display(), pid = ?child.id(), "spawned compiler");

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(InvocationOutcome::Completed {
                exit_code: status.code(),
                duration: start.elapsed(),
            }),
            Ok(Err(source)) => Err(BatchError::Wait {
                file: invocation.source.clone(),
                source,
            }),
            Err(_) => {
                tracing::warn!(
                    file = %invocation.source.display(),
                    timeout_secs = timeout.as_secs_f64(),
                    "compiler exceeded timeout, killing"
                );
                if let Err(e) = child.kill().await {
                    // Already exited between the deadline and the kill.
                    tracing::debug!(file = %invocation.source.display(), error = %e, "kill after timeout failed");
                }
                Ok(InvocationOutcome::TimedOut {
                    duration: start.elapsed(),
                })
            }
        }
    }
}

/// Mirrored artifact directories only exist in `WorkDir::Invoker` mode.
fn ensure_output_dir(invocation: &Invocation) -> BatchResult<()> {
    if invocation.current_dir.is_some() {
        return Ok(());
    }
    match invocation.output.parent() {
        Some(parent) if parent != Path::new("") => {
            std::fs::create_dir_all(parent).map_err(|source| BatchError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn sh(script: &str) -> Invocation {
        Invocation {
            source: PathBuf::from("prog.rs"),
            program: PathBuf::from("/bin/sh"),
            args: vec![
                OsString::from("-c"),
                OsString::from(script),
                OsString::from("fake-rustc"),
            ],
            current_dir: Some(PathBuf::from(".")),
            output: PathBuf::from("prog.out"),
        }
    }

    #[test]
    fn test_outcome_accessors() {
        let done = InvocationOutcome::Completed {
            exit_code: Some(1),
            duration: Duration::from_millis(5),
        };
        assert!(done.is_completed());
        assert_eq!(done.exit_code(), Some(1));

        let hung = InvocationOutcome::TimedOut {
            duration: Duration::from_secs(2),
        };
        assert!(!hung.is_completed());
        assert_eq!(hung.exit_code(), None);
        assert_eq!(hung.duration(), Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_completed() {
        let outcome = ProcessExecutor::new(true)
            .execute(&sh("exit 3"), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(outcome.is_completed());
        assert_eq!(outcome.exit_code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hang_times_out_and_is_killed() {
        let start = Instant::now();
        let outcome = ProcessExecutor::new(true)
            .execute(&sh("exec sleep 30"), Duration::from_millis(200))
            .await
            .unwrap();
        assert!(matches!(outcome, InvocationOutcome::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let mut inv = sh("true");
        inv.program = PathBuf::from("/definitely/not/a/compiler");
        let err = ProcessExecutor::new(true)
            .execute(&inv, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Spawn { .. }));
    }
}
