//! CLI module for batchc
//!
//! ## Usage
//!
//! - `batchc [ROOT]` - Compile every matching file under ROOT and print the tally
//! - `batchc --dry-run [ROOT]` - Print the planned compiler commands only
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::batch::config::{DEFAULT_COMPILER, DEFAULT_FLAGS, DEFAULT_ROOT, DEFAULT_SUFFIX, DEFAULT_TIMEOUT_SECS};
use crate::batch::{BatchConfig, BatchError, OutputMode, WorkDir};
use crate::version::BATCHC_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<BatchError> for CliError {
    fn from(err: BatchError) -> Self {
        CliError::failure(format!("Error: {}", err))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Working directory for each compiler process
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkDirArg {
    /// The source file's own directory
    Parent,
    /// The directory batchc was started in
    Invoker,
}

impl From<WorkDirArg> for WorkDir {
    fn from(arg: WorkDirArg) -> Self {
        match arg {
            WorkDirArg::Parent => WorkDir::FileParent,
            WorkDirArg::Invoker => WorkDir::Invoker,
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Batch-invoke a compiler over a source tree with a per-file timeout
#[derive(Parser, Debug)]
#[command(name = "batchc")]
#[command(version = BATCHC_VERSION)]
#[command(about = "Batch-invoke a compiler over a source tree with a per-file timeout", long_about = None)]
pub struct Cli {
    /// Root directory to scan recursively
    #[arg(value_name = "ROOT", default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Compiler executable (bare names use PATH; relative paths are taken from the current directory)
    #[arg(long, value_name = "PATH", default_value = DEFAULT_COMPILER)]
    pub compiler: PathBuf,

    /// File-name suffix to match
    #[arg(long, value_name = "SUFFIX", default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Compiler flag (repeatable; replaces the default flags)
    #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
    pub flags: Vec<String>,

    /// Per-invocation timeout in seconds
    #[arg(short, long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Concurrent compiler processes (1 = sequential)
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    pub jobs: usize,

    /// Working directory for each compiler process
    #[arg(long, value_enum, default_value_t = WorkDirArg::Parent)]
    pub workdir: WorkDirArg,

    /// Fixed output artifact name instead of a per-file one
    #[arg(long = "output-name", value_name = "NAME")]
    pub output_name: Option<String>,

    /// Discard compiler stdout/stderr
    #[arg(long)]
    pub quiet_compiler: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Print the planned commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 1 if any invocation timed out
    #[arg(long)]
    pub strict: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Translate parsed arguments into a run configuration.
    pub fn to_config(&self) -> BatchConfig {
        let flags: Vec<String> = if self.flags.is_empty() {
            DEFAULT_FLAGS.iter().map(|f| f.to_string()).collect()
        } else {
            self.flags.clone()
        };
        let output = match &self.output_name {
            Some(name) => OutputMode::Fixed(name.clone()),
            None => OutputMode::PerFile,
        };

        let compiler = match env::current_dir() {
            Ok(cwd) => resolve_compiler(&self.compiler, &cwd),
            Err(_) => self.compiler.clone(),
        };

        BatchConfig::new()
            .with_compiler(compiler)
            .with_root(&self.root)
            .with_suffix(&self.suffix)
            .with_flags(flags)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_jobs(self.jobs)
            .with_workdir(self.workdir.into())
            .with_output(output)
            .with_quiet_compiler(self.quiet_compiler)
    }
}

/// Anchor a relative compiler path such as `./rustc` or `bin/rustc` to `cwd`.
///
/// Compilers run inside each file's directory, so a relative path would
/// otherwise be looked up there. Bare names keep their PATH lookup.
fn resolve_compiler(compiler: &Path, cwd: &Path) -> PathBuf {
    if compiler.is_absolute() || compiler.components().count() <= 1 {
        compiler.to_path_buf()
    } else {
        cwd.join(compiler)
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the parsed command line and return the exit code.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.to_config();
    if cli.dry_run {
        return commands::dry_run(config);
    }
    commands::run_batch(config, cli.format, cli.strict, cli.verbose)
}

// ============================================================================
// Tests
// ============================================================================
