//! Stopping tests for the multiroot drivers.

use nalgebra::DVector;

use crate::types::SolverError;

/// Outcome of a stopping test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Convergence {
    /// The tolerance is met.
    Converged,
    /// Keep iterating.
    Continue,
}

impl Convergence {
    /// Returns `true` for [`Convergence::Converged`].
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged)
    }
}

/// Residual test: converged when `Σ|f_i| < epsabs`.
///
/// # Errors
///
/// `InvalidInput` if `epsabs` is negative.
///
/// # Example
///
/// ```
/// use nalgebra::DVector;
/// use nlsolve_core::math::solvers::{test_residual, Convergence};
///
/// let f = DVector::from_column_slice(&[1e-12, -1e-12]);
/// assert_eq!(test_residual(&f, 1e-10).unwrap(), Convergence::Converged);
/// assert_eq!(test_residual(&f, 1e-12).unwrap(), Convergence::Continue);
/// ```
pub fn test_residual(f: &DVector<f64>, epsabs: f64) -> Result<Convergence, SolverError> {
    if epsabs < 0.0 {
        return Err(SolverError::invalid_input("absolute tolerance is negative"));
    }

    let residual: f64 = f.iter().map(|fi| fi.abs()).sum();
    if residual < epsabs {
        Ok(Convergence::Converged)
    } else {
        Ok(Convergence::Continue)
    }
}

/// Step test: converged when `|dx_i| < epsabs + epsrel·|x_i|` for every `i`.
///
/// A component whose step is exactly zero always passes.
///
/// # Errors
///
/// `InvalidInput` if either tolerance is negative, `DimensionMismatch` if
/// the vectors differ in length.
pub fn test_delta(
    dx: &DVector<f64>,
    x: &DVector<f64>,
    epsabs: f64,
    epsrel: f64,
) -> Result<Convergence, SolverError> {
    if epsabs < 0.0 {
        return Err(SolverError::invalid_input("absolute tolerance is negative"));
    }
    if epsrel < 0.0 {
        return Err(SolverError::invalid_input("relative tolerance is negative"));
    }
    if dx.len() != x.len() {
        return Err(SolverError::DimensionMismatch {
            expected: x.len(),
            got: dx.len(),
        });
    }

    let ok = dx.iter().zip(x.iter()).all(|(&dxi, &xi)| {
        let tolerance = epsabs + epsrel * xi.abs();
        dxi.abs() < tolerance || dxi == 0.0
    });

    if ok {
        Ok(Convergence::Converged)
    } else {
        Ok(Convergence::Continue)
    }
}
