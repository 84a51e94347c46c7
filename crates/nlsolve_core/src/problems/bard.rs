//! Bard's rational fitting problem (Moré, Garbow & Hillstrom #8).
//!
//! Fifteen residuals in three parameters:
//!
//! ```text
//! f_i(x) = y_i − (x₁ + u_i / (x₂ v_i + x₃ w_i)),   u_i = i, v_i = 16 − i, w_i = min(u_i, v_i)
//! ```
//!
//! The problem has two minima. The one reached from `(1, 1, 1)` has
//! `‖f‖² ≈ 8.2149e-3`; the other lies at infinity in `x₂, x₃`.

use nalgebra::{DMatrix, DVector};

use super::{check_len, check_rel, FittingProblem};
use crate::math::linalg::{enorm, gemv_t, syrk_lower};
use crate::math::solvers::{LargeNlsFunction, NormalEquations};
use crate::types::{FitError, SolverError};

const N: usize = 15;
const P: usize = 3;

const Y: [f64; N] = [
    0.14, 0.18, 0.22, 0.25, 0.29, 0.32, 0.35, 0.39, 0.37, 0.58, 0.73, 0.96, 1.34, 2.10, 4.39,
];

const SUMSQ_1: f64 = 8.214877306578963e-03;
const X_1: [f64; P] = [8.241055975623580e-02, 1.133036092245175, 2.343695178435405];

const SUMSQ_2: f64 = 17.42869333333333;
// x₂ and x₃ diverge to −∞ at this minimum
const X_2: [f64; P] = [8.406666666666666e-01, f64::NAN, f64::NAN];

/// Residuals and Jacobian for Bard's problem, with owned buffers.
#[derive(Debug, Clone)]
pub struct Bard {
    f: DVector<f64>,
    jac: DMatrix<f64>,
}

impl Bard {
    /// Create the function with zeroed buffers.
    pub fn new() -> Self {
        Self {
            f: DVector::zeros(N),
            jac: DMatrix::zeros(N, P),
        }
    }
}

impl Default for Bard {
    fn default() -> Self {
        Self::new()
    }
}

impl LargeNlsFunction for Bard {
    fn n_params(&self) -> usize {
        P
    }

    fn n_residuals(&self) -> usize {
        N
    }

    fn eval(
        &mut self,
        x: &DVector<f64>,
        normal: Option<NormalEquations<'_>>,
    ) -> Result<f64, SolverError> {
        check_len(P, &[x.len()])?;
        if let Some(ne) = &normal {
            check_len(P, &[ne.jtj.nrows(), ne.jtj.ncols(), ne.jtf.len()])?;
        }
        let (x1, x2, x3) = (x[0], x[1], x[2]);

        for i in 0..N {
            let u = i as f64 + 1.0;
            let v = 16.0 - u;
            let w = u.min(v);
            let term = x2 * v + x3 * w;

            self.f[i] = Y[i] - (x1 + u / term);
            if normal.is_some() {
                self.jac[(i, 0)] = -1.0;
                self.jac[(i, 1)] = u * v / (term * term);
                self.jac[(i, 2)] = u * w / (term * term);
            }
        }

        if let Some(ne) = normal {
            syrk_lower(&self.jac, ne.jtj)?;
            gemv_t(&self.jac, &self.f, ne.jtf)?;
        }
        Ok(enorm(&self.f))
    }
}

fn check(x: &[f64], sumsq: f64, epsrel: f64) -> Result<(), FitError> {
    let (reference, sumsq_exact) = if x[1].abs() < 10.0 && x[2].abs() < 10.0 {
        (&X_1, SUMSQ_1)
    } else {
        (&X_2, SUMSQ_2)
    };

    check_rel("bard", "sumsq", sumsq, sumsq_exact, epsrel)?;
    for (i, (&got, &expected)) in x.iter().zip(reference.iter()).enumerate() {
        check_rel("bard", &format!("x[{}]", i), got, expected, epsrel)?;
    }
    Ok(())
}

/// Bard's problem from `(1, 1, 1)`, relative tolerance `1e-4`, three tries.
pub fn bard() -> FittingProblem {
    FittingProblem {
        name: "bard",
        x0: vec![1.0; P],
        epsrel: 1.0e-4,
        ntries: 3,
        check,
        function: Box::new(Bard::new()),
    }
}
