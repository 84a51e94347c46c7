//! CLI error type.

use nlsolve_core::types::{FitError, SolverError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by `nlsolve` commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Unknown problem, system, solver or format name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A solver failed.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// A reference fit failed.
    #[error(transparent)]
    Fit(#[from] FitError),

    /// JSON output could not be produced.
    #[error("JSON serialisation error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML output could not be produced.
    #[error("TOML serialisation error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// One or more fits in a batch failed.
    #[error("{failed} of {total} fits failed")]
    FitsFailed {
        /// Number of failing problems
        failed: usize,
        /// Number of problems run
        total: usize,
    },
}

/// Result alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
