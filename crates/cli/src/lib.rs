// crates/cli/src/lib.rs
//! Library half of the `fieldops` binary, split out for tests.

pub mod commands;
pub mod fixtures;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,fieldops=info";
