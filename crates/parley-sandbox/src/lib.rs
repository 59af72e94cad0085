//! Execution sandbox for parley.
//!
//! [`Sandbox::run`] writes a script into a private temporary directory, runs
//! it under a child interpreter with a wall-clock deadline and returns an
//! [`ExecutionResult`]. Failures are never raised: a missing interpreter, a
//! crash or a timeout all come back as a classified textual result. The
//! temporary directory is removed on every path.

/// Sandbox configuration.
pub mod config;
/// Script execution and result classification.
pub mod runner;

pub use config::SandboxConfig;
pub use runner::{
    ExecutionResult, ExecutionStatus, Sandbox, LAUNCH_FAILURE_MARKER, STDERR_LABEL,
    TIMEOUT_SENTINEL,
};
