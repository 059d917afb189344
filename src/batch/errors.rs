//! Error taxonomy for batch runs
//!
//! A timeout is *not* an error: it is recovered locally as
//! [`InvocationOutcome::TimedOut`](super::executor::InvocationOutcome::TimedOut).
//! Everything in here aborts the run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a batch run
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("root directory '{}' does not exist or is not a directory", .0.display())]
    RootNotFound(PathBuf),

    #[error("failed to scan '{}': {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting on compiler for '{}': {source}", file.display())]
    Wait {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker task panicked: {0}")]
    WorkerPanicked(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type BatchResult<T> = Result<T, BatchError>;
