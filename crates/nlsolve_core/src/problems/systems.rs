//! Square test systems for the multiroot solvers.
//!
//! Each [`TestSystem`] supplies its residual, exact Jacobian and the
//! standard starting point from Moré, Garbow & Hillstrom.

use nalgebra::{DMatrix, DVector};

use crate::math::solvers::{MultirootFunction, MultirootFunctionFdf};
use super::check_len;
use crate::types::SolverError;

/// Named test system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TestSystem {
    /// `(1 − x₁, 10(x₂ − x₁²))`, root `(1, 1)`.
    Rosenbrock,
    /// Powell's singular function, root `0` with singular Jacobian.
    Powell,
    /// Freudenstein and Roth, root `(5, 4)`.
    Roth,
}

impl TestSystem {
    /// Every system, in a fixed order.
    pub const ALL: [TestSystem; 3] = [TestSystem::Rosenbrock, TestSystem::Powell, TestSystem::Roth];

    /// Lower-case name, as accepted by [`str::parse`].
    pub fn name(&self) -> &'static str {
        match self {
            TestSystem::Rosenbrock => "rosenbrock",
            TestSystem::Powell => "powell",
            TestSystem::Roth => "roth",
        }
    }

    /// Standard starting point.
    pub fn start(&self) -> Vec<f64> {
        match self {
            TestSystem::Rosenbrock => vec![-1.2, 1.0],
            TestSystem::Powell => vec![3.0, -1.0, 0.0, 1.0],
            TestSystem::Roth => vec![4.5, 3.5],
        }
    }

    /// Known root.
    pub fn root(&self) -> Vec<f64> {
        match self {
            TestSystem::Rosenbrock => vec![1.0, 1.0],
            TestSystem::Powell => vec![0.0; 4],
            TestSystem::Roth => vec![5.0, 4.0],
        }
    }
}

impl std::str::FromStr for TestSystem {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestSystem::ALL
            .iter()
            .copied()
            .find(|system| system.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SolverError::invalid_input(format!("unknown system '{s}'")))
    }
}

impl std::fmt::Display for TestSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl MultirootFunction for TestSystem {
    fn dim(&self) -> usize {
        match self {
            TestSystem::Rosenbrock | TestSystem::Roth => 2,
            TestSystem::Powell => 4,
        }
    }

    fn eval(&self, x: &DVector<f64>, f: &mut DVector<f64>) -> Result<(), SolverError> {
        check_len(self.dim(), &[x.len(), f.len()])?;
        match self {
            TestSystem::Rosenbrock => {
                f[0] = 1.0 - x[0];
                f[1] = 10.0 * (x[1] - x[0] * x[0]);
            }
            TestSystem::Powell => {
                f[0] = x[0] + 10.0 * x[1];
                f[1] = 5.0f64.sqrt() * (x[2] - x[3]);
                f[2] = (x[1] - 2.0 * x[2]).powi(2);
                f[3] = 10.0f64.sqrt() * (x[0] - x[3]).powi(2);
            }
            TestSystem::Roth => {
                let y = x[1];
                f[0] = -13.0 + x[0] + ((5.0 - y) * y - 2.0) * y;
                f[1] = -29.0 + x[0] + ((y + 1.0) * y - 14.0) * y;
            }
        }
        Ok(())
    }
}

impl MultirootFunctionFdf for TestSystem {
    fn eval_df(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), SolverError> {
        let n = self.dim();
        check_len(n, &[x.len(), jac.nrows(), jac.ncols()])?;
        jac.fill(0.0);
        match self {
            TestSystem::Rosenbrock => {
                jac[(0, 0)] = -1.0;
                jac[(1, 0)] = -20.0 * x[0];
                jac[(1, 1)] = 10.0;
            }
            TestSystem::Powell => {
                let a = x[1] - 2.0 * x[2];
                let b = x[0] - x[3];
                let s10 = 10.0f64.sqrt();
                jac[(0, 0)] = 1.0;
                jac[(0, 1)] = 10.0;
                jac[(1, 2)] = 5.0f64.sqrt();
                jac[(1, 3)] = -5.0f64.sqrt();
                jac[(2, 1)] = 2.0 * a;
                jac[(2, 2)] = -4.0 * a;
                jac[(3, 0)] = 2.0 * s10 * b;
                jac[(3, 3)] = -2.0 * s10 * b;
            }
            TestSystem::Roth => {
                let y = x[1];
                jac[(0, 0)] = 1.0;
                jac[(0, 1)] = -3.0 * y * y + 10.0 * y - 2.0;
                jac[(1, 0)] = 1.0;
                jac[(1, 1)] = 3.0 * y * y + 2.0 * y - 14.0;
            }
        }
        Ok(())
    }
}
