#![forbid(unsafe_code)]
//! batchc: run an external compiler over a source tree
//!
//! Every file under a root directory whose name ends with a suffix gets one
//! compiler invocation of the form `<compiler> <flags...> -o <output> <file>`,
//! bounded by a wall-clock timeout. The run ends with a tally of how many
//! invocations finished in time (`total compiled: X/Y`).
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `batch` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod batch;
pub mod cli;
pub mod version;

pub use batch::{BatchConfig, BatchError, BatchRunner, InvocationOutcome, RunSummary};
