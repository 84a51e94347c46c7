//! Penalty function II (Moré, Garbow & Hillstrom #24) with `p = 4`.
//!
//! ```text
//! f_1       = x_1 − 0.2
//! f_i       = √α (e^{x_i/10} + e^{x_{i−1}/10} − y_i),   2 ≤ i ≤ p,  y_i = e^{i/10} + e^{(i−1)/10}
//! f_i       = √α (e^{x_{i−p+1}/10} − e^{−1/10}),         p < i < 2p
//! f_2p      = Σ_j (p − j + 1) x_j² − 1
//! ```

use nalgebra::{DMatrix, DVector};

use super::{check_len, check_rel, FittingProblem};
use crate::math::linalg::{enorm, gemv_t, syrk_lower};
use crate::math::solvers::{LargeNlsFunction, NormalEquations};
use crate::types::{FitError, SolverError};

const P: usize = 4;
const N: usize = 2 * P;
const ALPHA: f64 = 1.0e-5;

const SUMSQ: f64 = 9.37629300735544219e-06;

/// Residuals and Jacobian for penalty function II, with owned buffers.
#[derive(Debug, Clone)]
pub struct Penalty2 {
    f: DVector<f64>,
    jac: DMatrix<f64>,
}

impl Penalty2 {
    /// Create the function with zeroed buffers.
    pub fn new() -> Self {
        Self {
            f: DVector::zeros(N),
            jac: DMatrix::zeros(N, P),
        }
    }

    fn residuals(&mut self, x: &DVector<f64>) {
        let sqrt_alpha = ALPHA.sqrt();
        let mut sum = P as f64 * x[0] * x[0];

        self.f[0] = x[0] - 0.2;
        for i in 1..P {
            let yi = (0.1 * (i as f64 + 1.0)).exp() + (0.1 * i as f64).exp();
            self.f[i] = sqrt_alpha * ((0.1 * x[i]).exp() + (0.1 * x[i - 1]).exp() - yi);
            sum += (P - i) as f64 * x[i] * x[i];
        }
        for i in P..N - 1 {
            let xi = x[i - P + 1];
            self.f[i] = sqrt_alpha * ((0.1 * xi).exp() - (-0.1f64).exp());
        }
        self.f[N - 1] = sum - 1.0;
    }

    fn jacobian(&mut self, x: &DVector<f64>) {
        let scale = 0.1 * ALPHA.sqrt();
        self.jac.fill(0.0);

        self.jac[(0, 0)] = 1.0;
        for i in 1..P {
            self.jac[(i, i)] = scale * (0.1 * x[i]).exp();
            self.jac[(i, i - 1)] = scale * (0.1 * x[i - 1]).exp();
        }
        for i in P..N - 1 {
            let j = i - P + 1;
            self.jac[(i, j)] = scale * (0.1 * x[j]).exp();
        }
        for j in 0..P {
            self.jac[(N - 1, j)] = 2.0 * (P - j) as f64 * x[j];
        }
    }
}

impl Default for Penalty2 {
    fn default() -> Self {
        Self::new()
    }
}

impl LargeNlsFunction for Penalty2 {
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
        self.residuals(x);
        if let Some(ne) = normal {
            self.jacobian(x);
            syrk_lower(&self.jac, ne.jtj)?;
            gemv_t(&self.jac, &self.f, ne.jtf)?;
        }
        Ok(enorm(&self.f))
    }
}

fn check(_x: &[f64], sumsq: f64, epsrel: f64) -> Result<(), FitError> {
    check_rel("penalty2", "sumsq", sumsq, SUMSQ, epsrel)
}

/// Penalty function II from `(½, ½, ½, ½)`, relative tolerance `1e-6`, three tries.
pub fn penalty2() -> FittingProblem {
    FittingProblem {
        name: "penalty2",
        x0: vec![0.5; P],
        epsrel: 1.0e-6,
        ntries: 3,
        check,
        function: Box::new(Penalty2::new()),
    }
}
