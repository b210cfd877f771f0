//! Tooling & Integration Layer
//!
//! Command-line entry points and output formatting over the sync engine and the
//! tree view.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
