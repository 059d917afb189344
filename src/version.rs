//! batchc version information.
//!
//! The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.
//! Prefer this constant over repeating `env!("CARGO_PKG_VERSION")` in multiple places.

/// The batchc version string (for example, `0.1.0-alpha.1`).
pub const BATCHC_VERSION: &str = env!("CARGO_PKG_VERSION");
