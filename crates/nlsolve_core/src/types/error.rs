//! Error types for structured error handling.
//!
//! This module provides:
//! - `SolverError`: Errors from solver allocation, initialisation and iteration
//! - `SolverErrorKind`: Coarse status classification of a `SolverError`
//! - `FitError`: Errors from the least-squares fitting harness

use thiserror::Error;

/// Coarse classification of solver failures.
///
/// Every [`SolverError`] maps onto exactly one kind, so callers can react to
/// a family of failures (e.g. reseed on any numerical failure) without
/// matching individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverErrorKind {
    /// Invalid input: bad dimension, negative tolerance, evaluator rejection.
    Domain,
    /// Scratch storage could not be reserved.
    OutOfMemory,
    /// Singular factorisation, zero pivot or degenerate secant update.
    Numerical,
    /// A driver spent its iteration budget.
    NotConverged,
}

/// Solver errors.
///
/// # Variants
/// - `InvalidInput`: Invalid arguments or evaluator failure
/// - `DimensionMismatch`: Vector/matrix size does not match the problem dimension
/// - `OutOfMemory`: Scratch allocation failed
/// - `SingularMatrix`: LU factorisation hit a zero pivot
/// - `NotPositiveDefinite`: Cholesky factorisation hit a non-positive pivot
/// - `JacobianCollapsed`: Zero denominator in the Broyden rank-1 update
/// - `NoProgress`: No acceptable step could be found
/// - `NonFinite`: Evaluator produced NaN or infinity
/// - `MaxIterationsExceeded`: Driver iteration budget exhausted
///
/// # Examples
/// ```
/// use nlsolve_core::types::{SolverError, SolverErrorKind};
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// assert_eq!(SolverError::SingularMatrix.kind(), SolverErrorKind::Numerical);
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Invalid input data or parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vector or matrix size does not match the declared dimension.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Declared dimension
        expected: usize,
        /// Dimension actually supplied
        got: usize,
    },

    /// Scratch storage could not be allocated.
    #[error("Failed to allocate space for {what} ({elements} elements)")]
    OutOfMemory {
        /// Name of the buffer that failed
        what: String,
        /// Number of elements requested
        elements: usize,
    },

    /// LU factorisation produced a zero pivot.
    #[error("Matrix is singular")]
    SingularMatrix,

    /// Cholesky factorisation produced a non-positive pivot.
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    /// Division by zero in the Broyden rank-1 update.
    #[error("Approximation to Jacobian has collapsed")]
    JacobianCollapsed,

    /// No acceptable step found after the given number of attempts.
    #[error("Iteration is not making progress after {attempts} attempts")]
    NoProgress {
        /// Restarts or rejected steps before giving up
        attempts: usize,
    },

    /// Evaluator produced a non-finite value.
    #[error("Non-finite value: {0}")]
    NonFinite(String),

    /// Driver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },
}

impl SolverError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an out-of-memory error for the named buffer.
    pub fn out_of_memory(what: impl Into<String>, elements: usize) -> Self {
        Self::OutOfMemory {
            what: what.into(),
            elements,
        }
    }

    /// Status classification of this error.
    pub fn kind(&self) -> SolverErrorKind {
        match self {
            SolverError::InvalidInput(_)
            | SolverError::DimensionMismatch { .. }
            | SolverError::NonFinite(_) => SolverErrorKind::Domain,
            SolverError::OutOfMemory { .. } => SolverErrorKind::OutOfMemory,
            SolverError::SingularMatrix
            | SolverError::NotPositiveDefinite
            | SolverError::JacobianCollapsed
            | SolverError::NoProgress { .. } => SolverErrorKind::Numerical,
            SolverError::MaxIterationsExceeded { .. } => SolverErrorKind::NotConverged,
        }
    }

    /// Returns `true` for numerical degeneracies the caller may answer by reseeding.
    pub fn is_numerical(&self) -> bool {
        self.kind() == SolverErrorKind::Numerical
    }
}

/// Errors from the least-squares fitting harness.
///
/// # Examples
/// ```
/// use nlsolve_core::types::{FitError, SolverError};
///
/// let err: FitError = SolverError::SingularMatrix.into();
/// assert!(format!("{}", err).contains("singular"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FitError {
    /// Wrapped solver error.
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Final value disagrees with the reference solution.
    #[error("{problem}/{quantity}: got {got:e}, expected {expected:e} (epsrel = {epsrel:e})")]
    ReferenceMismatch {
        /// Problem name
        problem: String,
        /// Compared quantity (e.g. `sumsq`, `x[1]`)
        quantity: String,
        /// Value obtained by the solver
        got: f64,
        /// Reference value
        expected: f64,
        /// Relative tolerance applied
        epsrel: f64,
    },

    /// Problem definition is inconsistent.
    #[error("Invalid problem {problem}: {reason}")]
    InvalidProblem {
        /// Problem name
        problem: String,
        /// What is wrong
        reason: String,
    },
}

impl FitError {
    /// Create a reference mismatch error.
    pub fn reference_mismatch(
        problem: impl Into<String>,
        quantity: impl Into<String>,
        got: f64,
        expected: f64,
        epsrel: f64,
    ) -> Self {
        Self::ReferenceMismatch {
            problem: problem.into(),
            quantity: quantity.into(),
            got,
            expected,
            epsrel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_error_display() {
        let err = SolverError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(format!("{}", err), "Dimension mismatch: expected 3, got 2");

        let err = SolverError::out_of_memory("lu", 16);
        assert_eq!(
            format!("{}", err),
            "Failed to allocate space for lu (16 elements)"
        );

        let err = SolverError::JacobianCollapsed;
        assert!(format!("{}", err).contains("collapsed"));
    }

    #[test]
    fn test_solver_error_kind() {
        assert_eq!(
            SolverError::invalid_input("n = 0").kind(),
            SolverErrorKind::Domain
        );
        assert_eq!(
            SolverError::NonFinite("f".into()).kind(),
            SolverErrorKind::Domain
        );
        assert_eq!(
            SolverError::out_of_memory("H", 9).kind(),
            SolverErrorKind::OutOfMemory
        );
        assert_eq!(
            SolverError::NoProgress { attempts: 10 }.kind(),
            SolverErrorKind::Numerical
        );
        assert_eq!(
            SolverError::MaxIterationsExceeded { iterations: 5 }.kind(),
            SolverErrorKind::NotConverged
        );
    }

    #[test]
    fn test_is_numerical() {
        assert!(SolverError::SingularMatrix.is_numerical());
        assert!(SolverError::JacobianCollapsed.is_numerical());
        assert!(!SolverError::invalid_input("x").is_numerical());
    }

    #[test]
    fn test_fit_error_from_solver_error() {
        let err: FitError = SolverError::NotPositiveDefinite.into();
        match err {
            FitError::Solver(SolverError::NotPositiveDefinite) => {}
            other => panic!("Expected wrapped solver error, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_mismatch_display() {
        let err = FitError::reference_mismatch("bard", "sumsq", 1.0, 2.0, 1e-4);
        let msg = format!("{}", err);
        assert!(msg.starts_with("bard/sumsq"));
        assert!(msg.contains("1e-4"));
    }
}
