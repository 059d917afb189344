//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use crate::batch::{BatchConfig, BatchRunner, ConsoleReporter, JsonReporter, Reporter, RunSummary};

use super::{CliError, CliResult, ExitCode, ReportFormat};

/// Discover, compile, and print the tally.
pub fn run_batch(config: BatchConfig, format: ReportFormat, strict: bool, verbose: bool) -> CliResult<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {}", e)))?;

    let runner = BatchRunner::new(config);
    let mut reporter: Box<dyn Reporter> = match format {
        ReportFormat::Text => Box::new(ConsoleReporter::stdout(verbose)),
        ReportFormat::Json => Box::new(JsonReporter::stdout()),
    };

    let summary = runtime.block_on(runner.run(reporter.as_mut()))?;
    Ok(exit_code_for(&summary, strict))
}

/// Print each planned command without spawning anything.
pub fn dry_run(config: BatchConfig) -> CliResult<ExitCode> {
    let runner = BatchRunner::new(config);
    let invocations = runner.plan()?;
    for invocation in &invocations {
        println!("{}", invocation);
    }
    println!("{} file(s) planned", invocations.len());
    Ok(ExitCode::SUCCESS)
}

/// Timeouts only fail the process in strict mode.
pub fn exit_code_for(summary: &RunSummary, strict: bool) -> ExitCode {
    if strict && summary.has_timeouts() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
