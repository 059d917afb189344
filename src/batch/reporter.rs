//! Run reporting
//!
//! The runner never prints directly; it emits events through the [`Reporter`]
//! trait. [`ConsoleReporter`] produces the plain progress lines and the
//! `total compiled: X/Y` summary, [`JsonReporter`] emits one JSON object per
//! line for machine consumption.

use std::io::{self, Write};
use std::path::Path;

use serde_json::json;

use super::executor::InvocationOutcome;
use super::invocation::Invocation;
use super::runner::RunSummary;

/// Receives batch events in the order the runner observes them.
///
/// In the parallel path, events arrive in completion order and each
/// `on_invocation_start` is emitted immediately before its completion.
pub trait Reporter {
    /// Called once the file set is known
    fn on_discovery_complete(&mut self, _root: &Path, _file_count: usize) {}

    /// Called before a sequential invocation is launched, or just ahead of a
    /// parallel invocation's completion
    fn on_invocation_start(&mut self, _invocation: &Invocation) {}

    fn on_invocation_complete(&mut self, invocation: &Invocation, outcome: &InvocationOutcome);

    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Plain-text reporter
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    pub verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_discovery_complete(&mut self, root: &Path, file_count: usize) {
        if self.verbose {
            let _ = writeln!(self.out, "found {} file(s) under {}", file_count, root.display());
        }
    }

    fn on_invocation_start(&mut self, invocation: &Invocation) {
        if self.verbose {
            let _ = writeln!(self.out, "$ {}", invocation);
        }
    }

    fn on_invocation_complete(&mut self, invocation: &Invocation, outcome: &InvocationOutcome) {
        let _ = match outcome {
            InvocationOutcome::Completed { exit_code, duration } if self.verbose => {
                let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                writeln!(
                    self.out,
                    "compiled {} (exit {}, {}ms)",
                    invocation.display_name(),
                    code,
                    duration.as_millis()
                )
            }
            InvocationOutcome::Completed { .. } => writeln!(self.out, "compiled {}", invocation.display_name()),
            InvocationOutcome::TimedOut { .. } => {
                writeln!(self.out, "compiling {} timed out.", invocation.source.display())
            }
        };
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let _ = writeln!(self.out, "{}", summary);
        if self.verbose {
            let _ = writeln!(
                self.out,
                "timed out: {}, non-zero exit: {}, elapsed: {:.2}s",
                summary.timed_out,
                summary.nonzero_exit,
                summary.duration.as_secs_f64()
            );
        }
        let _ = self.out.flush();
    }
}

/// JSON-lines reporter
pub struct JsonReporter<W: Write = io::Stdout> {
    out: W,
}

impl JsonReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn on_invocation_complete(&mut self, invocation: &Invocation, outcome: &InvocationOutcome) {
        let status = if outcome.is_completed() { "completed" } else { "timed_out" };
        let event = json!({
            "event": "invocation",
            "file": invocation.source.display().to_string(),
            "output": invocation.output.display().to_string(),
            "status": status,
            "exit_code": outcome.exit_code(),
            "duration_ms": outcome.duration().as_millis() as u64,
        });
        let _ = writeln!(self.out, "{}", event);
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let event = json!({
            "event": "summary",
            "completed": summary.completed,
            "timed_out": summary.timed_out,
            "total": summary.total,
            "nonzero_exit": summary.nonzero_exit,
            "duration_ms": summary.duration.as_millis() as u64,
        });
        let _ = writeln!(self.out, "{}", event);
        let _ = self.out.flush();
    }
}
