//! Multidimensional root finding and large-scale nonlinear least squares.
//!
//! ## Available Solvers
//!
//! ### Root-Finding (`f(x) = 0`, `f: ℝⁿ → ℝⁿ`)
//!
//! - [`FdfSolverType::Newton`]: Full-step Newton with the exact Jacobian
//! - [`FdfSolverType::GNewton`]: Newton with backtracking on `‖f‖`
//! - [`FSolverType::Broyden`]: Rank-1 quasi-Newton with damping and Jacobian restarts
//! - [`FSolverType::DNewton`]: Newton with a finite-difference Jacobian
//!
//! ### Least Squares (`min ½‖f(x)‖²`)
//!
//! - [`LargeSolverType::LevenbergMarquardt`]: Trust-region LM on the normal equations
//!
//! ## Lifecycle
//!
//! Each algorithm keeps private scratch state that is allocated once per
//! dimension, reset by `set`, advanced by `iterate` and released on drop.
//! See [`FSolverState`] and [`FdfSolverState`].
//!
//! ## Configuration
//!
//! - [`MultirootConfig`]: residual and step tolerances for the multiroot drivers
//! - [`BroydenParams`]: damping and restart limits
//! - [`LargeNlsConfig`]: tolerances, scaling and damping for the LM solver
//!
//! ## Examples
//!
//! ```
//! use nalgebra::DVector;
//! use nlsolve_core::math::solvers::{solve_multiroot, FSolverType, FnSystem, MultirootConfig};
//!
//! // x² = 2, y = x
//! let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
//!     f[0] = x[0] * x[0] - 2.0;
//!     f[1] = x[1] - x[0];
//! });
//!
//! let result = solve_multiroot(
//!     FSolverType::DNewton,
//!     &system,
//!     &[1.0, 1.0],
//!     &MultirootConfig::default(),
//! )
//! .unwrap();
//! assert!((result.x[0] - std::f64::consts::SQRT_2).abs() < 1e-8);
//! ```

mod broyden;
mod config;
mod convergence;
mod dnewton;
mod fdjac;
mod function;
mod gnewton;
mod large;
mod lm;
mod multiroot;
mod newton;

// Re-export public types at module level
pub use broyden::BroydenState;
pub use config::{BroydenParams, HarnessConfig, LargeNlsConfig, MultirootConfig, Scaling};
pub use convergence::{test_delta, test_residual, Convergence};
pub use dnewton::DNewtonState;
pub use fdjac::{fdjacobian, FdJacobian};
#[cfg(feature = "num-dual-mode")]
pub use function::AdSystem;
pub use function::{FnSystem, FnSystemFdf, MultirootFunction, MultirootFunctionFdf};
pub use gnewton::GNewtonState;
pub use large::{
    ConvergenceReason, LargeNlsFunction, LargeNlsResult, LargeNlsSolver, LargeSolverType,
    NormalEquations,
};
pub use lm::LmState;
pub use multiroot::{
    solve_multiroot, solve_multiroot_fdf, FSolver, FSolverState, FSolverType, FdfSolver,
    FdfSolverState, FdfSolverType, MultirootResult,
};
pub use newton::NewtonState;
