//! Batch compiler invocation
//!
//! ## Modules
//!
//! - `config` - Run configuration and defaults
//! - `discovery` - Recursive source file enumeration
//! - `invocation` - Command template and per-file output naming
//! - `executor` - Spawn, wait with timeout, kill on expiry
//! - `runner` - Sequential or worker-pool orchestration and the run summary
//! - `reporter` - Text and JSON-lines reporting
//! - `errors` - Errors that abort a run
//!
//! A timeout never aborts a run; it is counted and the batch continues. Any
//! other failure (missing compiler, permission denied) propagates out of
//! [`BatchRunner::run`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod invocation;
pub mod reporter;
pub mod runner;

pub use config::{BatchConfig, OutputMode, WorkDir};
pub use discovery::discover_files;
pub use errors::{BatchError, BatchResult};
pub use executor::{Executor, InvocationOutcome, ProcessExecutor};
pub use invocation::Invocation;
pub use reporter::{ConsoleReporter, JsonReporter, Reporter};
pub use runner::{BatchRunner, InvocationReport, RunSummary};
