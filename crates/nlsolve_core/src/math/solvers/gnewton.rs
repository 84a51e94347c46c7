//! Globally convergent Newton: Newton direction with backtracking on `‖f‖`.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use super::function::MultirootFunctionFdf;
use super::multiroot::FdfSolverState;
use crate::math::linalg::{enorm, lu_decomp, lu_solve, try_matrix, try_vector, Permutation};
use crate::types::SolverError;

/// Step reduction factor after an uphill trial with `‖f_trial‖ = phi1` and `‖f‖ = phi0`.
///
/// Minimiser of the quadratic model of `‖f(x + t·p)‖` fitted through the
/// two norms, `(√(1 + 6θ) − 1) / (3θ)` with `θ = phi1 / phi0`. A non-finite
/// trial norm shrinks the step tenfold.
pub(crate) fn backtrack_factor(phi1: f64, phi0: f64) -> f64 {
    let theta = phi1 / phi0;
    if !theta.is_finite() || theta <= 0.0 {
        return 0.1;
    }
    ((1.0 + 6.0 * theta).sqrt() - 1.0) / (3.0 * theta)
}

/// A trial point is uphill when its residual norm grows or is not finite.
#[inline]
pub(crate) fn is_uphill(phi1: f64, phi0: f64) -> bool {
    !phi1.is_finite() || phi1 > phi0
}

/// Newton's method with a safeguarded quadratic backtrack.
///
/// The full Newton step is tried first. While the residual norm grows the
/// step fraction `t` is reduced by a quadratic backtrack; once `t` falls
/// below machine epsilon the last trial is accepted if its residual is
/// finite. Trials are evaluated into scratch, so a failed iteration leaves
/// `x`, `f` and `J` unchanged.
#[derive(Debug, Clone)]
pub struct GNewtonState {
    lu: DMatrix<f64>,
    permutation: Permutation,
    d: DVector<f64>,
    x_trial: DVector<f64>,
    f_trial: DVector<f64>,
    jac_trial: DMatrix<f64>,
    phi: f64,
}

impl GNewtonState {
    /// Residual norm at the current iterate.
    pub fn phi(&self) -> f64 {
        self.phi
    }
}

impl FdfSolverState for GNewtonState {
    fn alloc(n: usize) -> Result<Self, SolverError> {
        Ok(Self {
            lu: try_matrix(n, n, "lu")?,
            permutation: Permutation::try_new(n)?,
            d: try_vector(n, "d")?,
            x_trial: try_vector(n, "x_trial")?,
            f_trial: try_vector(n, "f_trial")?,
            jac_trial: try_matrix(n, n, "jac_trial")?,
            phi: 0.0,
        })
    }

    fn set<S>(
        &mut self,
        function: &S,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunctionFdf + ?Sized,
    {
        function.eval_fdf(x, f, jac)?;
        dx.fill(0.0);
        self.phi = enorm(f);
        Ok(())
    }

    fn iterate<S>(
        &mut self,
        function: &S,
        x: &mut DVector<f64>,
        f: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunctionFdf + ?Sized,
    {
        self.lu.copy_from(&*jac);
        lu_decomp(&mut self.lu, &mut self.permutation)?;
        lu_solve(&self.lu, &self.permutation, f, &mut self.d)?;

        let phi0 = self.phi;
        let mut t = 1.0;
        let phi1 = loop {
            self.x_trial.copy_from(&*x);
            self.x_trial.axpy(-t, &self.d, 1.0);

            function.eval_fdf(&self.x_trial, &mut self.f_trial, &mut self.jac_trial)?;
            let phi1 = enorm(&self.f_trial);

            if is_uphill(phi1, phi0) && t > f64::EPSILON {
                t *= backtrack_factor(phi1, phi0);
                trace!(t, phi0, phi1, "gnewton backtrack");
                continue;
            }
            break phi1;
        };
        if !phi1.is_finite() {
            return Err(SolverError::NonFinite(
                "residual norm along the Newton direction".to_string(),
            ));
        }

        x.copy_from(&self.x_trial);
        f.copy_from(&self.f_trial);
        jac.copy_from(&self.jac_trial);
        dx.copy_from(&self.d);
        *dx *= -t;
        self.phi = phi1;
        Ok(())
    }
}
