//! Numerical building blocks.
//!
//! - [`linalg`]: Fallible dense allocation and in-place LU / Cholesky over `nalgebra`
//! - [`solvers`]: Multiroot solvers and the large-scale least-squares solver

pub mod linalg;
pub mod solvers;
