//! Reference fitting problems and the harness that runs them.
//!
//! A [`FittingProblem`] bundles a [`LargeNlsFunction`] with a starting
//! point, a relative tolerance, a retry budget and a checker that compares
//! the final parameters and sum of squares against published references.
//!
//! - [`bard`]: Bard's rational fit, 15 residuals, 3 parameters
//! - [`penalty2`]: Penalty function II, 8 residuals, 4 parameters
//! - [`systems`]: Square test systems for the multiroot solvers
//!
//! # Example
//!
//! ```
//! use nlsolve_core::math::solvers::HarnessConfig;
//! use nlsolve_core::problems::{all_problems, run_all};
//!
//! let mut problems = all_problems();
//! for report in run_all(&mut problems, &HarnessConfig::default()) {
//!     assert!(report.is_ok());
//! }
//! ```

mod bard;
mod penalty2;
pub mod systems;

pub use bard::{bard, Bard};
pub use penalty2::{penalty2, Penalty2};

use nalgebra::DVector;
use tracing::{info, warn};

use crate::math::solvers::{
    ConvergenceReason, HarnessConfig, LargeNlsFunction, LargeNlsSolver, LargeSolverType,
};
use crate::types::{FitError, SolverError};

/// Reference checker: `(x, sumsq, epsrel)`.
pub type CheckFn = fn(&[f64], f64, f64) -> Result<(), FitError>;

/// A least-squares problem with a known solution.
pub struct FittingProblem {
    /// Problem name.
    pub name: &'static str,
    /// Starting point.
    pub x0: Vec<f64>,
    /// Relative tolerance for the reference comparison.
    pub epsrel: f64,
    /// Solver attempts before giving up.
    pub ntries: usize,
    /// Reference checker.
    pub check: CheckFn,
    /// Objective, owning its residual and Jacobian buffers.
    pub function: Box<dyn LargeNlsFunction + Send>,
}

impl std::fmt::Debug for FittingProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittingProblem")
            .field("name", &self.name)
            .field("x0", &self.x0)
            .field("epsrel", &self.epsrel)
            .field("ntries", &self.ntries)
            .field("n_residuals", &self.function.n_residuals())
            .finish()
    }
}

/// Outcome of a successful fit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitReport {
    /// Problem name.
    pub name: String,
    /// Final parameters.
    pub x: Vec<f64>,
    /// Final `‖f‖²`.
    pub sumsq: f64,
    /// Iterations summed over all attempts.
    pub iterations: usize,
    /// Attempts used, starting at 1.
    pub tries: usize,
    /// Stopping reason of the last attempt.
    pub reason: ConvergenceReason,
}

/// `DimensionMismatch` unless every length in `got` equals `expected`.
pub(crate) fn check_len(expected: usize, got: &[usize]) -> Result<(), SolverError> {
    match got.iter().find(|&&len| len != expected) {
        Some(&len) => Err(SolverError::DimensionMismatch { expected, got: len }),
        None => Ok(()),
    }
}

/// Compare `got` with `expected` to relative precision `epsrel`.
///
/// Non-finite references are skipped. A zero reference is compared
/// absolutely.
///
/// # Examples
///
/// ```
/// use nlsolve_core::problems::check_rel;
///
/// assert!(check_rel("p", "sumsq", 1.00001, 1.0, 1e-4).is_ok());
/// assert!(check_rel("p", "x[1]", 123.0, f64::NAN, 1e-4).is_ok());
/// assert!(check_rel("p", "sumsq", 1.1, 1.0, 1e-4).is_err());
/// ```
pub fn check_rel(
    problem: &str,
    quantity: &str,
    got: f64,
    expected: f64,
    epsrel: f64,
) -> Result<(), FitError> {
    if !expected.is_finite() {
        return Ok(());
    }

    let err = (got - expected).abs();
    let bound = if expected == 0.0 {
        epsrel
    } else {
        epsrel * expected.abs()
    };
    if err <= bound {
        Ok(())
    } else {
        Err(FitError::reference_mismatch(
            problem, quantity, got, expected, epsrel,
        ))
    }
}

/// All reference least-squares problems.
pub fn all_problems() -> Vec<FittingProblem> {
    vec![bard(), penalty2()]
}

/// Look up a reference problem by name.
pub fn problem_by_name(name: &str) -> Option<FittingProblem> {
    all_problems().into_iter().find(|p| p.name == name)
}

/// Fit `problem` with up to `ntries` Levenberg–Marquardt attempts.
///
/// Every attempt allocates a fresh solver. The first starts from `x0`,
/// later ones from where the previous attempt stopped. The first attempt
/// whose result passes the checker wins.
///
/// # Errors
///
/// - `InvalidProblem` if `x0` and the function disagree on `p`, or `ntries == 0`
/// - `Solver` for allocation or evaluation failures
/// - The last checker error if no attempt matches the reference
pub fn run_problem(
    problem: &mut FittingProblem,
    config: &HarnessConfig,
) -> Result<FitReport, FitError> {
    let p = problem.function.n_params();
    if problem.x0.len() != p {
        return Err(FitError::InvalidProblem {
            problem: problem.name.to_string(),
            reason: format!("x0 has length {}, function has {} parameters", problem.x0.len(), p),
        });
    }
    if problem.ntries == 0 {
        return Err(FitError::InvalidProblem {
            problem: problem.name.to_string(),
            reason: "ntries must be > 0".to_string(),
        });
    }

    let mut x = DVector::from_column_slice(&problem.x0);
    let mut iterations = 0;
    let mut tries = 1;
    loop {
        let mut solver = LargeNlsSolver::alloc(LargeSolverType::default(), p, config.solver)?;
        let result = solver.solve(problem.function.as_mut(), &x)?;
        iterations += result.iterations;

        match (problem.check)(&result.x, result.sumsq, problem.epsrel) {
            Ok(()) => {
                info!(
                    problem = problem.name,
                    solver = solver.name(),
                    sumsq = result.sumsq,
                    iterations,
                    tries,
                    reason = result.reason.name(),
                    "fit matches reference"
                );
                return Ok(FitReport {
                    name: problem.name.to_string(),
                    x: result.x,
                    sumsq: result.sumsq,
                    iterations,
                    tries,
                    reason: result.reason,
                });
            }
            Err(err) if tries < problem.ntries => {
                warn!(problem = problem.name, tries, %err, "retrying fit");
                x = DVector::from_vec(result.x);
                tries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run each problem independently.
///
/// With the `parallel` feature the problems are spread over the `rayon`
/// thread pool; results keep the input order.
pub fn run_all(
    problems: &mut [FittingProblem],
    config: &HarnessConfig,
) -> Vec<Result<FitReport, FitError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        problems
            .par_iter_mut()
            .map(|problem| run_problem(problem, config))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        problems
            .iter_mut()
            .map(|problem| run_problem(problem, config))
            .collect()
    }
}
