//! # nlsolve_core: Nonlinear Systems and Least Squares
//!
//! Iterative solvers for square nonlinear systems `f(x) = 0` and for
//! nonlinear least-squares problems `min ½‖f(x)‖²`, sharing one lifecycle:
//! allocate scratch once, `set` at a starting point, `iterate` one step at a
//! time, release on drop.
//!
//! - Dense linear-algebra adapter over `nalgebra` (`math::linalg`)
//! - Newton, globally convergent Newton, discrete Newton and Broyden
//!   multiroot solvers (`math::solvers`)
//! - Trust-region Levenberg–Marquardt on normal equations (`math::solvers`)
//! - Reference fitting problems and harness (`problems`)
//! - Error types: `SolverError`, `FitError` (`types::error`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use nlsolve_core::math::solvers::HarnessConfig;
//! use nlsolve_core::problems::{bard, run_problem};
//!
//! let mut problem = bard();
//! let report = run_problem(&mut problem, &HarnessConfig::default()).unwrap();
//! assert!((report.sumsq - 8.214877306578963e-03).abs() < 1e-6);
//! ```
//!
//! ## Feature Flags
//!
//! - `num-dual-mode` (default): Exact Jacobians via `num-dual` forward-mode AD (`AdSystem`)
//! - `parallel` (default): Run independent fitting problems with `rayon`
//! - `serde`: Serialisation for configuration, results and errors
//!
//! ## Logging
//!
//! The crate emits `tracing` events and never installs a subscriber.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod problems;
pub mod types;
