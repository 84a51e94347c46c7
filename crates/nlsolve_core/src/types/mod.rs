//! Shared error and status types.
//!
//! This module provides:
//! - `error`: Structured error types for solver and fitting operations
//!
//! # Re-exports
//!
//! [`SolverError`], [`SolverErrorKind`] and [`FitError`] are re-exported at this level.

pub mod error;

pub use error::{FitError, SolverError, SolverErrorKind};
