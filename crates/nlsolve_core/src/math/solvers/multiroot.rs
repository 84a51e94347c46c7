//! Solver lifecycle and the multiroot drivers.
//!
//! Every concrete algorithm keeps its scratch storage in a private state
//! type implementing [`FSolverState`] (residual-only) or [`FdfSolverState`]
//! (residual plus Jacobian). The four lifecycle steps map onto Rust as:
//!
//! | Step       | Rust                                           |
//! |------------|------------------------------------------------|
//! | allocate   | `State::alloc(n)`, fails with `OutOfMemory`    |
//! | initialise | `state.set(function, x, f, dx)`                |
//! | iterate    | `state.iterate(function, x, f, dx)`            |
//! | release    | `state.release()` (consuming) or drop          |
//!
//! [`FSolver`] and [`FdfSolver`] own the iterate vectors and dispatch over
//! the algorithm tags [`FSolverType`] and [`FdfSolverType`].

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::broyden::BroydenState;
use super::config::{BroydenParams, MultirootConfig};
use super::convergence::{test_delta, test_residual};
use super::dnewton::DNewtonState;
use super::function::{MultirootFunction, MultirootFunctionFdf};
use super::gnewton::GNewtonState;
use super::newton::NewtonState;
use crate::math::linalg::{enorm, try_matrix, try_vector};
use crate::types::SolverError;

/// Lifecycle of a solver that only evaluates residuals.
pub trait FSolverState: Sized {
    /// Reserve all scratch storage for dimension `n`.
    fn alloc(n: usize) -> Result<Self, SolverError>;

    /// Evaluate `f = f(x)`, zero `dx` and reset internal state.
    fn set<S>(
        &mut self,
        function: &S,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized;

    /// Advance one step. On success `x_new = x_old + dx` and `f = f(x_new)`.
    fn iterate<S>(
        &mut self,
        function: &S,
        x: &mut DVector<f64>,
        f: &mut DVector<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized;

    /// Free scratch storage.
    fn release(self) {}
}

/// Lifecycle of a solver that uses the exact Jacobian.
pub trait FdfSolverState: Sized {
    /// Reserve all scratch storage for dimension `n`.
    fn alloc(n: usize) -> Result<Self, SolverError>;

    /// Evaluate `f` and `J` at `x`, zero `dx` and reset internal state.
    fn set<S>(
        &mut self,
        function: &S,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunctionFdf + ?Sized;

    /// Advance one step. On success `f` and `J` are evaluated at the new `x`.
    fn iterate<S>(
        &mut self,
        function: &S,
        x: &mut DVector<f64>,
        f: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunctionFdf + ?Sized;

    /// Free scratch storage.
    fn release(self) {}
}

fn check_dim(n: usize) -> Result<(), SolverError> {
    if n == 0 {
        return Err(SolverError::invalid_input("dimension must be positive"));
    }
    Ok(())
}

fn check_function(n: usize, function_dim: usize, x0: &DVector<f64>) -> Result<(), SolverError> {
    if function_dim != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: function_dim,
        });
    }
    if x0.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: x0.len(),
        });
    }
    Ok(())
}

/// Residual-only algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FSolverType {
    /// Broyden rank-1 quasi-Newton with damping.
    Broyden,
    /// Newton with a finite-difference Jacobian.
    DNewton,
}

impl FSolverType {
    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            FSolverType::Broyden => "broyden",
            FSolverType::DNewton => "dnewton",
        }
    }
}

/// Jacobian-based algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FdfSolverType {
    /// Full-step Newton.
    Newton,
    /// Newton with backtracking on `‖f‖`.
    GNewton,
}

impl FdfSolverType {
    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            FdfSolverType::Newton => "newton",
            FdfSolverType::GNewton => "gnewton",
        }
    }
}

#[derive(Debug, Clone)]
enum FSolverKind {
    Broyden(BroydenState),
    DNewton(DNewtonState),
}

#[derive(Debug, Clone)]
enum FdfSolverKind {
    Newton(NewtonState),
    GNewton(GNewtonState),
}

/// Outcome of a successful multiroot solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultirootResult {
    /// Final iterate.
    pub x: Vec<f64>,
    /// Residual at `x`.
    pub f: Vec<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// `‖f‖₂` at `x`.
    pub residual_norm: f64,
    /// Whether a stopping test passed.
    pub converged: bool,
}

impl MultirootResult {
    fn new(x: &DVector<f64>, f: &DVector<f64>, iterations: usize) -> Self {
        Self {
            x: x.iter().copied().collect(),
            f: f.iter().copied().collect(),
            iterations,
            residual_norm: enorm(f),
            converged: true,
        }
    }
}

fn stopping_test(
    x: &DVector<f64>,
    f: &DVector<f64>,
    dx: &DVector<f64>,
    config: &MultirootConfig,
    check_step: bool,
) -> Result<bool, SolverError> {
    if test_residual(f, config.epsabs)?.is_converged() {
        return Ok(true);
    }
    if check_step && test_delta(dx, x, config.epsabs_dx, config.epsrel_dx)?.is_converged() {
        return Ok(true);
    }
    Ok(false)
}

/// Residual-only multiroot solver.
///
/// # Example
///
/// ```
/// use nalgebra::DVector;
/// use nlsolve_core::math::solvers::{FSolver, FSolverType, FnSystem, MultirootConfig};
///
/// let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
///     f[0] = x[0] + 0.5 * (x[0] - x[1]).powi(3) - 1.0;
///     f[1] = 0.5 * (x[1] - x[0]).powi(3) + x[1];
/// });
///
/// let mut solver = FSolver::new(FSolverType::Broyden, 2).unwrap();
/// let result = solver
///     .solve(&system, &DVector::zeros(2), &MultirootConfig::default())
///     .unwrap();
/// assert!((result.x[0] + result.x[1] - 1.0).abs() < 1e-8);
/// ```
#[derive(Debug, Clone)]
pub struct FSolver {
    kind: FSolverKind,
    x: DVector<f64>,
    f: DVector<f64>,
    dx: DVector<f64>,
    initialised: bool,
}

impl FSolver {
    /// Allocate a solver of the given type for dimension `n`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `n == 0`
    /// - `OutOfMemory` if any scratch buffer cannot be reserved
    pub fn new(solver_type: FSolverType, n: usize) -> Result<Self, SolverError> {
        check_dim(n)?;
        let kind = match solver_type {
            FSolverType::Broyden => FSolverKind::Broyden(BroydenState::alloc(n)?),
            FSolverType::DNewton => FSolverKind::DNewton(DNewtonState::alloc(n)?),
        };
        Ok(Self {
            kind,
            x: try_vector(n, "x")?,
            f: try_vector(n, "f")?,
            dx: try_vector(n, "dx")?,
            initialised: false,
        })
    }

    /// Replace the Broyden damping limits. No effect on other algorithms.
    pub fn with_broyden_params(mut self, params: BroydenParams) -> Self {
        if let FSolverKind::Broyden(state) = &mut self.kind {
            state.set_params(params);
        }
        self
    }

    /// Algorithm tag.
    pub fn solver_type(&self) -> FSolverType {
        match self.kind {
            FSolverKind::Broyden(_) => FSolverType::Broyden,
            FSolverKind::DNewton(_) => FSolverType::DNewton,
        }
    }

    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        self.solver_type().name()
    }

    /// Problem dimension.
    pub fn dim(&self) -> usize {
        self.x.len()
    }

    /// Initialise at `x0`.
    pub fn set<S>(&mut self, function: &S, x0: &DVector<f64>) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        check_function(self.dim(), function.dim(), x0)?;
        self.initialised = false;
        self.x.copy_from(x0);
        match &mut self.kind {
            FSolverKind::Broyden(state) => state.set(function, &self.x, &mut self.f, &mut self.dx),
            FSolverKind::DNewton(state) => state.set(function, &self.x, &mut self.f, &mut self.dx),
        }?;
        self.initialised = true;
        Ok(())
    }

    /// Advance one step.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if [`set`](Self::set) has not succeeded; otherwise
    /// whatever the algorithm reports.
    pub fn iterate<S>(&mut self, function: &S) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        if !self.initialised {
            return Err(SolverError::invalid_input("solver has not been initialised"));
        }
        if function.dim() != self.dim() {
            return Err(SolverError::DimensionMismatch {
                expected: self.dim(),
                got: function.dim(),
            });
        }
        match &mut self.kind {
            FSolverKind::Broyden(state) => {
                state.iterate(function, &mut self.x, &mut self.f, &mut self.dx)
            }
            FSolverKind::DNewton(state) => {
                state.iterate(function, &mut self.x, &mut self.f, &mut self.dx)
            }
        }
    }

    /// Current iterate.
    pub fn root(&self) -> &DVector<f64> {
        &self.x
    }

    /// Residual at the current iterate.
    pub fn residual(&self) -> &DVector<f64> {
        &self.f
    }

    /// Last step taken.
    pub fn step(&self) -> &DVector<f64> {
        &self.dx
    }

    /// Broyden state, for inspection of the inverse Jacobian approximation.
    pub fn broyden_state(&self) -> Option<&BroydenState> {
        match &self.kind {
            FSolverKind::Broyden(state) => Some(state),
            FSolverKind::DNewton(_) => None,
        }
    }

    /// Initialise at `x0` and iterate until a stopping test passes.
    ///
    /// # Errors
    ///
    /// `MaxIterationsExceeded` when the budget is spent; algorithm errors
    /// are returned unchanged.
    pub fn solve<S>(
        &mut self,
        function: &S,
        x0: &DVector<f64>,
        config: &MultirootConfig,
    ) -> Result<MultirootResult, SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        config.validate()?;
        self.set(function, x0)?;

        if stopping_test(&self.x, &self.f, &self.dx, config, false)? {
            return Ok(MultirootResult::new(&self.x, &self.f, 0));
        }

        for iteration in 1..=config.max_iterations {
            self.iterate(function)?;
            debug!(
                solver = self.name(),
                iteration,
                residual = enorm(&self.f),
                "multiroot iteration"
            );
            if stopping_test(&self.x, &self.f, &self.dx, config, true)? {
                return Ok(MultirootResult::new(&self.x, &self.f, iteration));
            }
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: config.max_iterations,
        })
    }

    /// Free all storage. Dropping the solver is equivalent.
    pub fn release(self) {
        match self.kind {
            FSolverKind::Broyden(state) => state.release(),
            FSolverKind::DNewton(state) => state.release(),
        }
    }
}

/// Jacobian-based multiroot solver.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use nlsolve_core::math::solvers::{FdfSolver, FdfSolverType, FnSystemFdf, MultirootConfig};
///
/// // Rosenbrock system, root at (1, 1)
/// let system = FnSystemFdf::new(
///     2,
///     |x: &[f64], f: &mut [f64]| {
///         f[0] = 1.0 - x[0];
///         f[1] = 10.0 * (x[1] - x[0] * x[0]);
///     },
///     |x: &[f64], j: &mut DMatrix<f64>| {
///         j[(0, 0)] = -1.0;
///         j[(0, 1)] = 0.0;
///         j[(1, 0)] = -20.0 * x[0];
///         j[(1, 1)] = 10.0;
///     },
/// );
///
/// let mut solver = FdfSolver::new(FdfSolverType::Newton, 2).unwrap();
/// let x0 = DVector::from_column_slice(&[-1.2, 1.0]);
/// let result = solver.solve(&system, &x0, &MultirootConfig::default()).unwrap();
/// assert!((result.x[0] - 1.0).abs() < 1e-10);
/// assert!((result.x[1] - 1.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct FdfSolver {
    kind: FdfSolverKind,
    x: DVector<f64>,
    f: DVector<f64>,
    jac: DMatrix<f64>,
    dx: DVector<f64>,
    initialised: bool,
}

impl FdfSolver {
    /// Allocate a solver of the given type for dimension `n`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `n == 0`
    /// - `OutOfMemory` if any scratch buffer cannot be reserved
    pub fn new(solver_type: FdfSolverType, n: usize) -> Result<Self, SolverError> {
        check_dim(n)?;
        let kind = match solver_type {
            FdfSolverType::Newton => FdfSolverKind::Newton(NewtonState::alloc(n)?),
            FdfSolverType::GNewton => FdfSolverKind::GNewton(GNewtonState::alloc(n)?),
        };
        Ok(Self {
            kind,
            x: try_vector(n, "x")?,
            f: try_vector(n, "f")?,
            jac: try_matrix(n, n, "J")?,
            dx: try_vector(n, "dx")?,
            initialised: false,
        })
    }

    /// Algorithm tag.
    pub fn solver_type(&self) -> FdfSolverType {
        match self.kind {
            FdfSolverKind::Newton(_) => FdfSolverType::Newton,
            FdfSolverKind::GNewton(_) => FdfSolverType::GNewton,
        }
    }

    /// Algorithm name.
    pub fn name(&self) -> &'static str {
        self.solver_type().name()
    }

    /// Problem dimension.
    pub fn dim(&self) -> usize {
        self.x.len()
    }

    /// Initialise at `x0`.
    pub fn set<S>(&mut self, function: &S, x0: &DVector<f64>) -> Result<(), SolverError>
    where
        S: MultirootFunctionFdf + ?Sized,
    {
        check_function(self.dim(), function.dim(), x0)?;
        self.initialised = false;
        self.x.copy_from(x0);
        match &mut self.kind {
            FdfSolverKind::Newton(state) => {
                state.set(function, &self.x, &mut self.f, &mut self.jac, &mut self.dx)
            }
            FdfSolverKind::GNewton(state) => {
                state.set(function, &self.x, &mut self.f, &mut self.jac, &mut self.dx)
            }
        }?;
        self.initialised = true;
        Ok(())
    }

    /// Advance one step.
    pub fn iterate<S>(&mut self, function: &S) -> Result<(), SolverError>
    where
        S: MultirootFunctionFdf + ?Sized,
    {
        if !self.initialised {
            return Err(SolverError::invalid_input("solver has not been initialised"));
        }
        if function.dim() != self.dim() {
            return Err(SolverError::DimensionMismatch {
                expected: self.dim(),
                got: function.dim(),
            });
        }
        match &mut self.kind {
            FdfSolverKind::Newton(state) => state.iterate(
                function,
                &mut self.x,
                &mut self.f,
                &mut self.jac,
                &mut self.dx,
            ),
            FdfSolverKind::GNewton(state) => state.iterate(
                function,
                &mut self.x,
                &mut self.f,
                &mut self.jac,
                &mut self.dx,
            ),
        }
    }

    /// Current iterate.
    pub fn root(&self) -> &DVector<f64> {
        &self.x
    }

    /// Residual at the current iterate.
    pub fn residual(&self) -> &DVector<f64> {
        &self.f
    }

    /// Jacobian at the current iterate.
    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.jac
    }

    /// Last step taken.
    pub fn step(&self) -> &DVector<f64> {
        &self.dx
    }

    /// Initialise at `x0` and iterate until a stopping test passes.
    pub fn solve<S>(
        &mut self,
        function: &S,
        x0: &DVector<f64>,
        config: &MultirootConfig,
    ) -> Result<MultirootResult, SolverError>
    where
        S: MultirootFunctionFdf + ?Sized,
    {
        config.validate()?;
        self.set(function, x0)?;

        if stopping_test(&self.x, &self.f, &self.dx, config, false)? {
            return Ok(MultirootResult::new(&self.x, &self.f, 0));
        }

        for iteration in 1..=config.max_iterations {
            self.iterate(function)?;
            debug!(
                solver = self.name(),
                iteration,
                residual = enorm(&self.f),
                "multiroot iteration"
            );
            if stopping_test(&self.x, &self.f, &self.dx, config, true)? {
                return Ok(MultirootResult::new(&self.x, &self.f, iteration));
            }
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: config.max_iterations,
        })
    }

    /// Free all storage. Dropping the solver is equivalent.
    pub fn release(self) {
        match self.kind {
            FdfSolverKind::Newton(state) => state.release(),
            FdfSolverKind::GNewton(state) => state.release(),
        }
    }
}

/// Solve `f(x) = 0` from `x0` with a residual-only algorithm.
pub fn solve_multiroot<S>(
    solver_type: FSolverType,
    function: &S,
    x0: &[f64],
    config: &MultirootConfig,
) -> Result<MultirootResult, SolverError>
where
    S: MultirootFunction + ?Sized,
{
    let mut solver = FSolver::new(solver_type, function.dim())?;
    solver.solve(function, &DVector::from_column_slice(x0), config)
}

/// Solve `f(x) = 0` from `x0` with a Jacobian-based algorithm.
pub fn solve_multiroot_fdf<S>(
    solver_type: FdfSolverType,
    function: &S,
    x0: &[f64],
    config: &MultirootConfig,
) -> Result<MultirootResult, SolverError>
where
    S: MultirootFunctionFdf + ?Sized,
{
    let mut solver = FdfSolver::new(solver_type, function.dim())?;
    solver.solve(function, &DVector::from_column_slice(x0), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::solvers::{FnSystem, FnSystemFdf};
    use approx::assert_relative_eq;

    fn rosenbrock() -> impl MultirootFunctionFdf {
        FnSystemFdf::new(
            2,
            |x: &[f64], f: &mut [f64]| {
                f[0] = 1.0 - x[0];
                f[1] = 10.0 * (x[1] - x[0] * x[0]);
            },
            |x: &[f64], j: &mut DMatrix<f64>| {
                j[(0, 0)] = -1.0;
                j[(0, 1)] = 0.0;
                j[(1, 0)] = -20.0 * x[0];
                j[(1, 1)] = 10.0;
            },
        )
    }

    #[test]
    fn test_zero_dimension_is_domain_error() {
        assert!(matches!(
            FSolver::new(FSolverType::Broyden, 0),
            Err(SolverError::InvalidInput(_))
        ));
        assert!(matches!(
            FdfSolver::new(FdfSolverType::Newton, 0),
            Err(SolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_huge_dimension_is_out_of_memory() {
        let err = FdfSolver::new(FdfSolverType::Newton, usize::MAX / 2).unwrap_err();
        assert_eq!(err.kind(), crate::types::SolverErrorKind::OutOfMemory);

        let err = FSolver::new(FSolverType::Broyden, usize::MAX / 2).unwrap_err();
        assert_eq!(err.kind(), crate::types::SolverErrorKind::OutOfMemory);
    }

    #[test]
    fn test_alloc_then_release() {
        FSolver::new(FSolverType::Broyden, 3).unwrap().release();
        FSolver::new(FSolverType::DNewton, 3).unwrap().release();
        FdfSolver::new(FdfSolverType::Newton, 3).unwrap().release();
        FdfSolver::new(FdfSolverType::GNewton, 3).unwrap().release();
    }

    #[test]
    fn test_names() {
        let solver = FSolver::new(FSolverType::Broyden, 1).unwrap();
        assert_eq!(solver.name(), "broyden");
        assert_eq!(FSolverType::DNewton.name(), "dnewton");
        let solver = FdfSolver::new(FdfSolverType::GNewton, 1).unwrap();
        assert_eq!(solver.name(), "gnewton");
        assert_eq!(FdfSolverType::Newton.name(), "newton");
    }

    #[test]
    fn test_iterate_before_set() {
        let system = rosenbrock();
        let mut solver = FdfSolver::new(FdfSolverType::Newton, 2).unwrap();
        assert!(matches!(
            solver.iterate(&system),
            Err(SolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_set_dimension_mismatch() {
        let system = rosenbrock();
        let mut solver = FdfSolver::new(FdfSolverType::Newton, 3).unwrap();
        let result = solver.set(&system, &DVector::zeros(3));
        assert_eq!(
            result,
            Err(SolverError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_set_zeroes_step() {
        let system = rosenbrock();
        let mut solver = FdfSolver::new(FdfSolverType::Newton, 2).unwrap();
        solver
            .set(&system, &DVector::from_column_slice(&[-1.2, 1.0]))
            .unwrap();
        assert!(solver.step().iter().all(|&d| d == 0.0));
        assert_relative_eq!(solver.residual()[0], 2.2, epsilon = 1e-14);
        assert_relative_eq!(solver.jacobian()[(1, 0)], 24.0, epsilon = 1e-12);
    }

    #[test]
    fn test_newton_rosenbrock_converges_quickly() {
        let system = rosenbrock();
        let result = solve_multiroot_fdf(
            FdfSolverType::Newton,
            &system,
            &[-1.2, 1.0],
            &MultirootConfig::default(),
        )
        .unwrap();
        assert!(result.converged);
        assert!(result.iterations <= 3);
        assert_relative_eq!(result.x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gnewton_rosenbrock() {
        let system = rosenbrock();
        let result = solve_multiroot_fdf(
            FdfSolverType::GNewton,
            &system,
            &[-1.2, 1.0],
            &MultirootConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(result.x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(result.x[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_dnewton_rosenbrock() {
        let system = rosenbrock();
        let result = solve_multiroot(
            FSolverType::DNewton,
            &system,
            &[-1.2, 1.0],
            &MultirootConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(result.x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(result.x[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_already_at_root() {
        let system = rosenbrock();
        let result = solve_multiroot_fdf(
            FdfSolverType::Newton,
            &system,
            &[1.0, 1.0],
            &MultirootConfig::default(),
        )
        .unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.residual_norm, 0.0);
    }

    #[test]
    fn test_max_iterations_exceeded() {
        // x² + 1 has no real root
        let system = FnSystem::new(1, |x: &[f64], f: &mut [f64]| f[0] = x[0] * x[0] + 1.0);
        let config = MultirootConfig {
            max_iterations: 5,
            epsrel_dx: 0.0,
            ..Default::default()
        };
        let result = solve_multiroot(FSolverType::DNewton, &system, &[3.0], &config);
        assert_eq!(
            result,
            Err(SolverError::MaxIterationsExceeded { iterations: 5 })
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let system = rosenbrock();
        let config = MultirootConfig {
            epsabs: -1.0,
            ..Default::default()
        };
        let result = solve_multiroot_fdf(FdfSolverType::Newton, &system, &[0.0, 0.0], &config);
        assert!(matches!(result, Err(SolverError::InvalidInput(_))));
    }
}
