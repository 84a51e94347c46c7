//! Large-scale nonlinear least squares.
//!
//! The objective `min ½‖f(x)‖²` over `p` parameters is described by a
//! [`LargeNlsFunction`] that never hands out its Jacobian. Instead it
//! accumulates the normal-equation pair `(JᵗJ, Jᵗf)` on request, so the
//! solver's memory is `O(p²)` regardless of the number of residuals.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use super::config::LargeNlsConfig;
use super::lm::LmState;
use crate::math::linalg::{try_matrix, try_vector};
use crate::types::SolverError;

/// Normal-equation products requested from a [`LargeNlsFunction`].
///
/// Only the lower triangle of `jtj` is read by the solvers.
#[derive(Debug)]
pub struct NormalEquations<'a> {
    /// `JᵗJ`, `p × p`, lower triangle.
    pub jtj: &'a mut DMatrix<f64>,
    /// `Jᵗf`, length `p`.
    pub jtf: &'a mut DVector<f64>,
}

/// Least-squares objective evaluated through normal equations.
///
/// Implementors own their residual and Jacobian buffers; evaluation takes
/// `&mut self` so those buffers can be reused.
pub trait LargeNlsFunction {
    /// Number of parameters `p`.
    fn n_params(&self) -> usize;

    /// Number of residuals.
    fn n_residuals(&self) -> usize;

    /// Evaluate residuals at `x` and return `‖f‖₂`.
    ///
    /// When `normal` is `Some`, also write `JᵗJ` (lower triangle) and `Jᵗf`.
    fn eval(
        &mut self,
        x: &DVector<f64>,
        normal: Option<NormalEquations<'_>>,
    ) -> Result<f64, SolverError>;
}

impl<T: LargeNlsFunction + ?Sized> LargeNlsFunction for &mut T {
    fn n_params(&self) -> usize {
        (**self).n_params()
    }

    fn n_residuals(&self) -> usize {
        (**self).n_residuals()
    }

    fn eval(
        &mut self,
        x: &DVector<f64>,
        normal: Option<NormalEquations<'_>>,
    ) -> Result<f64, SolverError> {
        (**self).eval(x, normal)
    }
}

impl<T: LargeNlsFunction + ?Sized> LargeNlsFunction for Box<T> {
    fn n_params(&self) -> usize {
        (**self).n_params()
    }

    fn n_residuals(&self) -> usize {
        (**self).n_residuals()
    }

    fn eval(
        &mut self,
        x: &DVector<f64>,
        normal: Option<NormalEquations<'_>>,
    ) -> Result<f64, SolverError> {
        (**self).eval(x, normal)
    }
}

/// Large-scale algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LargeSolverType {
    /// Trust-region Levenberg–Marquardt.
    #[default]
    LevenbergMarquardt,
}

impl LargeSolverType {
    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            LargeSolverType::LevenbergMarquardt => "levenberg-marquardt",
        }
    }
}

/// Why a large-scale drive stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConvergenceReason {
    /// Step small relative to `x`.
    XTol,
    /// Scaled gradient small.
    GTol,
    /// Relative reduction of `‖f‖` small.
    FTol,
    /// No acceptable step could be found.
    Stalled,
    /// Iteration budget spent.
    MaxIterations,
}

impl ConvergenceReason {
    /// Returns `true` if a tolerance test passed.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceReason::XTol | ConvergenceReason::GTol | ConvergenceReason::FTol
        )
    }

    /// Short name.
    pub fn name(&self) -> &'static str {
        match self {
            ConvergenceReason::XTol => "xtol",
            ConvergenceReason::GTol => "gtol",
            ConvergenceReason::FTol => "ftol",
            ConvergenceReason::Stalled => "stalled",
            ConvergenceReason::MaxIterations => "max_iterations",
        }
    }
}

/// Final state of a large-scale drive.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LargeNlsResult {
    /// Final parameters.
    pub x: Vec<f64>,
    /// `‖f‖²` at `x`.
    pub sumsq: f64,
    /// Accepted iterations.
    pub iterations: usize,
    /// Stopping reason.
    pub reason: ConvergenceReason,
}

#[derive(Debug, Clone)]
enum LargeKind {
    Lm(LmState),
}

/// Large-scale nonlinear least-squares solver.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use nlsolve_core::math::linalg::{gemv_t, syrk_lower};
/// use nlsolve_core::math::solvers::{
///     LargeNlsConfig, LargeNlsFunction, LargeNlsSolver, LargeSolverType, NormalEquations,
/// };
/// use nlsolve_core::types::SolverError;
///
/// // Residuals (x0 - 2, x1 - 3, x0 x1 - 6)
/// struct Toy;
///
/// impl LargeNlsFunction for Toy {
///     fn n_params(&self) -> usize { 2 }
///     fn n_residuals(&self) -> usize { 3 }
///     fn eval(
///         &mut self,
///         x: &DVector<f64>,
///         normal: Option<NormalEquations<'_>>,
///     ) -> Result<f64, SolverError> {
///         let f = DVector::from_column_slice(&[x[0] - 2.0, x[1] - 3.0, x[0] * x[1] - 6.0]);
///         if let Some(ne) = normal {
///             let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, x[1], x[0]]);
///             syrk_lower(&j, ne.jtj)?;
///             gemv_t(&j, &f, ne.jtf)?;
///         }
///         Ok(f.norm())
///     }
/// }
///
/// let mut solver =
///     LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 2, LargeNlsConfig::default())
///         .unwrap();
/// let result = solver.solve(&mut Toy, &DVector::from_column_slice(&[1.0, 1.0])).unwrap();
/// assert!(result.sumsq < 1e-20);
/// assert!((result.x[0] - 2.0).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct LargeNlsSolver {
    kind: LargeKind,
    config: LargeNlsConfig,
    x: DVector<f64>,
    dx: DVector<f64>,
    g: DVector<f64>,
    jtj: DMatrix<f64>,
    normf: f64,
    normf_prev: f64,
    iterations: usize,
    initialised: bool,
}

impl LargeNlsSolver {
    /// Allocate a solver for `p` parameters.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `p == 0` or `config` is invalid
    /// - `OutOfMemory` if any scratch buffer cannot be reserved
    pub fn alloc(
        solver_type: LargeSolverType,
        p: usize,
        config: LargeNlsConfig,
    ) -> Result<Self, SolverError> {
        if p == 0 {
            return Err(SolverError::invalid_input("number of parameters must be positive"));
        }
        config.validate()?;

        let kind = match solver_type {
            LargeSolverType::LevenbergMarquardt => LargeKind::Lm(LmState::alloc(p)?),
        };
        Ok(Self {
            kind,
            config,
            x: try_vector(p, "x")?,
            dx: try_vector(p, "dx")?,
            g: try_vector(p, "g")?,
            jtj: try_matrix(p, p, "JTJ")?,
            normf: 0.0,
            normf_prev: 0.0,
            iterations: 0,
            initialised: false,
        })
    }

    /// Algorithm tag.
    pub fn solver_type(&self) -> LargeSolverType {
        match self.kind {
            LargeKind::Lm(_) => LargeSolverType::LevenbergMarquardt,
        }
    }

    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        self.solver_type().name()
    }

    /// Active configuration.
    pub fn config(&self) -> &LargeNlsConfig {
        &self.config
    }

    /// Initialise at `x0`: evaluate `‖f‖`, `JᵗJ` and `Jᵗf`, zero the step.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `function` or `x0` disagree with the allocated
    /// size, `NonFinite` if the starting residual is not finite.
    pub fn set<F>(&mut self, function: &mut F, x0: &DVector<f64>) -> Result<(), SolverError>
    where
        F: LargeNlsFunction + ?Sized,
    {
        let p = self.x.len();
        for got in [function.n_params(), x0.len()] {
            if got != p {
                return Err(SolverError::DimensionMismatch { expected: p, got });
            }
        }

        self.initialised = false;
        self.x.copy_from(x0);
        self.dx.fill(0.0);
        self.jtj.fill(0.0);
        self.normf = function.eval(
            &self.x,
            Some(NormalEquations {
                jtj: &mut self.jtj,
                jtf: &mut self.g,
            }),
        )?;
        if !self.normf.is_finite() {
            return Err(SolverError::NonFinite(
                "residual norm at starting point".to_string(),
            ));
        }
        self.normf_prev = self.normf;
        self.iterations = 0;

        match &mut self.kind {
            LargeKind::Lm(state) => state.set(&self.config, &self.jtj),
        }
        self.initialised = true;
        Ok(())
    }

    /// Take one accepted step.
    pub fn iterate<F>(&mut self, function: &mut F) -> Result<(), SolverError>
    where
        F: LargeNlsFunction + ?Sized,
    {
        if !self.initialised {
            return Err(SolverError::invalid_input("solver has not been initialised"));
        }

        let normf = self.normf;
        let outcome = match &mut self.kind {
            LargeKind::Lm(state) => state.iterate(
                function,
                &mut self.x,
                &mut self.dx,
                &mut self.jtj,
                &mut self.g,
                &mut self.normf,
            ),
        };
        outcome?;
        self.normf_prev = normf;
        self.iterations += 1;
        Ok(())
    }

    /// Apply the `xtol`, `gtol` and `ftol` tests to the last step.
    ///
    /// Returns `None` before the first iteration or when no test passes.
    pub fn test(&self) -> Option<ConvergenceReason> {
        if self.iterations == 0 {
            return None;
        }

        let xtol = self.config.xtol;
        let small_step = self
            .dx
            .iter()
            .zip(self.x.iter())
            .all(|(&dxi, &xi)| dxi.abs() <= xtol * (xi.abs() + xtol));
        if small_step {
            return Some(ConvergenceReason::XTol);
        }

        let gnorm = self
            .g
            .iter()
            .zip(self.x.iter())
            .map(|(&gi, &xi)| gi.abs() * xi.abs().max(1.0))
            .fold(0.0f64, f64::max);
        let phi = 0.5 * self.normf * self.normf;
        if gnorm <= self.config.gtol * phi.max(1.0) {
            return Some(ConvergenceReason::GTol);
        }

        if self.config.ftol > 0.0 {
            let reduction = (self.normf_prev - self.normf).abs();
            if reduction <= self.config.ftol * self.normf.max(1.0) {
                return Some(ConvergenceReason::FTol);
            }
        }

        None
    }

    /// Iterate from the current point until a test passes or the budget is spent.
    ///
    /// A [`SolverError::NoProgress`] from the algorithm ends the drive as
    /// [`ConvergenceReason::Stalled`]; other errors are returned.
    pub fn drive<F>(
        &mut self,
        function: &mut F,
        max_iterations: usize,
    ) -> Result<LargeNlsResult, SolverError>
    where
        F: LargeNlsFunction + ?Sized,
    {
        if !self.initialised {
            return Err(SolverError::invalid_input("solver has not been initialised"));
        }

        for _ in 0..max_iterations {
            match self.iterate(function) {
                Ok(()) => {}
                Err(SolverError::NoProgress { attempts }) => {
                    warn!(
                        solver = self.name(),
                        iterations = self.iterations,
                        attempts,
                        "least-squares drive stalled"
                    );
                    return Ok(self.result(ConvergenceReason::Stalled));
                }
                Err(err) => return Err(err),
            }
            debug!(
                solver = self.name(),
                iteration = self.iterations,
                sumsq = self.sumsq(),
                "least-squares iteration"
            );
            if let Some(reason) = self.test() {
                return Ok(self.result(reason));
            }
        }

        Ok(self.result(ConvergenceReason::MaxIterations))
    }

    /// Initialise at `x0` and drive with the configured iteration budget.
    pub fn solve<F>(
        &mut self,
        function: &mut F,
        x0: &DVector<f64>,
    ) -> Result<LargeNlsResult, SolverError>
    where
        F: LargeNlsFunction + ?Sized,
    {
        self.set(function, x0)?;
        self.drive(function, self.config.max_iterations)
    }

    fn result(&self, reason: ConvergenceReason) -> LargeNlsResult {
        LargeNlsResult {
            x: self.x.iter().copied().collect(),
            sumsq: self.sumsq(),
            iterations: self.iterations,
            reason,
        }
    }

    /// Current parameters.
    pub fn position(&self) -> &DVector<f64> {
        &self.x
    }

    /// Last accepted step.
    pub fn step(&self) -> &DVector<f64> {
        &self.dx
    }

    /// Gradient `Jᵗf` at the current parameters.
    pub fn gradient(&self) -> &DVector<f64> {
        &self.g
    }

    /// `‖f‖₂` at the current parameters.
    pub fn normf(&self) -> f64 {
        self.normf
    }

    /// `‖f‖²` at the current parameters.
    pub fn sumsq(&self) -> f64 {
        self.normf * self.normf
    }

    /// Accepted iterations since the last [`set`](Self::set).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Free all storage. Dropping the solver is equivalent.
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linalg::{gemv_t, syrk_lower};
    use crate::math::solvers::Scaling;
    use approx::assert_relative_eq;

    /// Rosenbrock as least squares: f = (10 (x1 − x0²), 1 − x0).
    struct Rosenbrock {
        evaluations: usize,
    }

    impl LargeNlsFunction for Rosenbrock {
        fn n_params(&self) -> usize {
            2
        }

        fn n_residuals(&self) -> usize {
            2
        }

        fn eval(
            &mut self,
            x: &DVector<f64>,
            normal: Option<NormalEquations<'_>>,
        ) -> Result<f64, SolverError> {
            self.evaluations += 1;
            let f = DVector::from_column_slice(&[10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]]);
            if let Some(ne) = normal {
                let j = DMatrix::from_row_slice(2, 2, &[-20.0 * x[0], 10.0, -1.0, 0.0]);
                syrk_lower(&j, ne.jtj)?;
                gemv_t(&j, &f, ne.jtf)?;
            }
            Ok(f.norm())
        }
    }

    #[test]
    fn test_alloc_validation() {
        let config = LargeNlsConfig::default();
        assert!(matches!(
            LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 0, config),
            Err(SolverError::InvalidInput(_))
        ));
        let err = LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, usize::MAX / 2, config)
            .unwrap_err();
        assert!(matches!(err, SolverError::OutOfMemory { .. }));

        let bad = LargeNlsConfig {
            initial_mu: -1.0,
            ..config
        };
        assert!(LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 2, bad).is_err());
    }

    #[test]
    fn test_drive_before_set() {
        let mut solver =
            LargeNlsSolver::alloc(LargeSolverType::default(), 2, LargeNlsConfig::default())
                .unwrap();
        let mut function = Rosenbrock { evaluations: 0 };
        assert!(matches!(
            solver.drive(&mut function, 10),
            Err(SolverError::InvalidInput(_))
        ));
        assert_eq!(solver.name(), "levenberg-marquardt");
    }

    #[test]
    fn test_rosenbrock_all_scalings() {
        for scaling in [Scaling::Levenberg, Scaling::Marquardt, Scaling::More] {
            let config = LargeNlsConfig::default().with_scaling(scaling);
            let mut solver =
                LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 2, config).unwrap();
            let mut function = Rosenbrock { evaluations: 0 };
            let result = solver
                .solve(&mut function, &DVector::from_column_slice(&[-1.2, 1.0]))
                .unwrap();

            assert!(result.sumsq < 1e-20, "{:?}: sumsq = {}", scaling, result.sumsq);
            assert_relative_eq!(result.x[0], 1.0, epsilon = 1e-8);
            assert_relative_eq!(result.x[1], 1.0, epsilon = 1e-8);
            assert!(result.iterations > 0);
        }
    }

    #[test]
    fn test_no_test_passes_before_first_iteration() {
        let mut solver =
            LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 2, LargeNlsConfig::default())
                .unwrap();
        let mut function = Rosenbrock { evaluations: 0 };
        solver
            .set(&mut function, &DVector::from_column_slice(&[-1.2, 1.0]))
            .unwrap();
        assert_eq!(solver.test(), None);
        assert!(solver.step().iter().all(|&d| d == 0.0));
        assert_relative_eq!(solver.sumsq(), 24.2, epsilon = 1e-12);
    }

    #[test]
    fn test_max_iterations_reason() {
        let mut solver =
            LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 2, LargeNlsConfig::default())
                .unwrap();
        let mut function = Rosenbrock { evaluations: 0 };
        solver
            .set(&mut function, &DVector::from_column_slice(&[-1.2, 1.0]))
            .unwrap();
        let result = solver.drive(&mut function, 1).unwrap();
        assert_eq!(result.reason, ConvergenceReason::MaxIterations);
        assert_eq!(result.iterations, 1);
        assert!(result.sumsq < 24.2);
        assert!(!result.reason.is_converged());
    }

    #[test]
    fn test_set_dimension_mismatch() {
        let mut solver =
            LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 3, LargeNlsConfig::default())
                .unwrap();
        let mut function = Rosenbrock { evaluations: 0 };
        assert_eq!(
            solver.set(&mut function, &DVector::zeros(3)),
            Err(SolverError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_stall_is_reported_as_reason() {
        // Residual norm is flat in trial evaluations, so every step is rejected
        struct Flat;

        impl LargeNlsFunction for Flat {
            fn n_params(&self) -> usize {
                1
            }

            fn n_residuals(&self) -> usize {
                1
            }

            fn eval(
                &mut self,
                _x: &DVector<f64>,
                normal: Option<NormalEquations<'_>>,
            ) -> Result<f64, SolverError> {
                if let Some(ne) = normal {
                    ne.jtj[(0, 0)] = 1.0;
                    ne.jtf[0] = 1.0;
                }
                Ok(1.0)
            }
        }

        let mut solver =
            LargeNlsSolver::alloc(LargeSolverType::LevenbergMarquardt, 1, LargeNlsConfig::default())
                .unwrap();
        let result = solver
            .solve(&mut Flat, &DVector::from_element(1, 0.0))
            .unwrap();
        assert_eq!(result.reason, ConvergenceReason::Stalled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.x, vec![0.0]);
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(ConvergenceReason::XTol.name(), "xtol");
        assert!(ConvergenceReason::GTol.is_converged());
        assert!(!ConvergenceReason::Stalled.is_converged());
    }
}
