//! Broyden's quasi-Newton method.
//!
//! Maintains an approximation `H ≈ −J⁻¹` through rank-1 secant updates so
//! that each iteration costs a single function evaluation once the search
//! direction is accepted:
//!
//! ```text
//! p = H f                       (search direction)
//! x_trial = x + t p             (damped trial point)
//! y = f(x_trial) − f            (residual change)
//! v = H y,  λ = pᵗ v
//! H ← H − (v + t p)(Hᵗ p)ᵗ / λ  (secant update: H_new y = −t p)
//! ```
//!
//! Reference: C.G. Broyden, "A Class of Methods for Solving Nonlinear
//! Simultaneous Equations", Mathematics of Computation 19 (1965), 577–593.

use nalgebra::{DMatrix, DVector};
use tracing::{trace, warn};

use super::config::BroydenParams;
use super::fdjac::FdJacobian;
use super::function::MultirootFunction;
use super::gnewton::{backtrack_factor, is_uphill};
use super::multiroot::FSolverState;
use crate::math::linalg::{
    enorm, lu_decomp, lu_invert, try_matrix, try_vector, Permutation, SQRT_DBL_EPSILON,
};
use crate::types::SolverError;

/// Broyden solver state.
///
/// An uphill trial is never accepted. Each search direction allows
/// `max_damping_steps` trial evaluations while `t > min_step`; after that
/// the inverse Jacobian is rebuilt from finite differences at `x` and the
/// direction recomputed. More than `max_restarts` rebuilds within one
/// iteration reports [`SolverError::NoProgress`] with `x`, `f` and `dx`
/// left untouched.
#[derive(Debug, Clone)]
pub struct BroydenState {
    h: DMatrix<f64>,
    lu: DMatrix<f64>,
    permutation: Permutation,
    v: DVector<f64>,
    w: DVector<f64>,
    y: DVector<f64>,
    p: DVector<f64>,
    fnew: DVector<f64>,
    x_trial: DVector<f64>,
    fd: FdJacobian,
    phi: f64,
    params: BroydenParams,
}

impl BroydenState {
    /// Current approximation to `−J⁻¹`.
    pub fn inverse_jacobian(&self) -> &DMatrix<f64> {
        &self.h
    }

    /// Residual norm at the current iterate.
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Damping and restart limits.
    pub fn params(&self) -> &BroydenParams {
        &self.params
    }

    /// Replace the damping and restart limits.
    pub fn set_params(&mut self, params: BroydenParams) {
        self.params = params;
    }

    /// Rebuild `H = −J⁻¹` from a forward-difference Jacobian at `x`.
    fn reseed_inverse<S>(
        &mut self,
        function: &S,
        x: &DVector<f64>,
        f: &DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        self.fd
            .compute(function, x, f, SQRT_DBL_EPSILON, &mut self.lu)?;
        lu_decomp(&mut self.lu, &mut self.permutation)?;
        lu_invert(&self.lu, &self.permutation, &mut self.h)?;
        self.h.neg_mut();
        Ok(())
    }
}

impl FSolverState for BroydenState {
    fn alloc(n: usize) -> Result<Self, SolverError> {
        Ok(Self {
            lu: try_matrix(n, n, "lu")?,
            permutation: Permutation::try_new(n)?,
            h: try_matrix(n, n, "H")?,
            v: try_vector(n, "v")?,
            w: try_vector(n, "w")?,
            y: try_vector(n, "y")?,
            fnew: try_vector(n, "fnew")?,
            x_trial: try_vector(n, "x_trial")?,
            p: try_vector(n, "p")?,
            fd: FdJacobian::try_new(n)?,
            phi: 0.0,
            params: BroydenParams::default(),
        })
    }

    fn set<S>(
        &mut self,
        function: &S,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        function.eval(x, f)?;
        self.reseed_inverse(function, x, f)?;
        dx.fill(0.0);
        self.phi = enorm(f);
        Ok(())
    }

    fn iterate<S>(
        &mut self,
        function: &S,
        x: &mut DVector<f64>,
        f: &mut DVector<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        let phi0 = self.phi;
        let mut restarts = 0;

        let (t, phi1) = 'restart: loop {
            self.p.gemv(1.0, &self.h, &*f, 0.0);

            let mut t = 1.0;
            let mut attempts = 0;

            loop {
                self.x_trial.copy_from(&*x);
                self.x_trial.axpy(t, &self.p, 1.0);

                function.eval(&self.x_trial, &mut self.fnew)?;
                let phi1 = enorm(&self.fnew);
                attempts += 1;

                if !is_uphill(phi1, phi0) {
                    break 'restart (t, phi1);
                }

                if attempts < self.params.max_damping_steps && t > self.params.min_step {
                    t *= backtrack_factor(phi1, phi0);
                    trace!(t, phi0, phi1, "broyden damping");
                    continue;
                }

                if restarts >= self.params.max_restarts {
                    warn!(restarts, phi0, "broyden iteration is not making progress");
                    return Err(SolverError::NoProgress { attempts: restarts });
                }
                restarts += 1;
                warn!(restarts, t, phi0, "broyden refreshing Jacobian");
                self.reseed_inverse(function, x, f)?;
                continue 'restart;
            }
        };

        // y = f' − f
        self.y.copy_from(&self.fnew);
        self.y -= &*f;

        // v = H y, λ = p·v
        self.v.gemv(1.0, &self.h, &self.y, 0.0);
        let lambda = self.p.dot(&self.v);
        if lambda == 0.0 {
            return Err(SolverError::JacobianCollapsed);
        }

        // v' = v + t p, wᵗ = pᵗ H
        self.v.axpy(t, &self.p, 1.0);
        self.w.gemv_tr(1.0, &self.h, &self.p, 0.0);

        // H ← H − v' wᵗ / λ
        self.h.ger(-1.0 / lambda, &self.v, &self.w, 1.0);

        f.copy_from(&self.fnew);
        x.copy_from(&self.x_trial);
        dx.copy_from(&self.p);
        *dx *= t;
        self.phi = phi1;

        Ok(())
    }
}
