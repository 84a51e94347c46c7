//! Discrete Newton: Newton's method on a finite-difference Jacobian.

use nalgebra::{DMatrix, DVector};

use super::fdjac::FdJacobian;
use super::function::MultirootFunction;
use super::multiroot::FSolverState;
use crate::math::linalg::{lu_decomp, lu_solve, try_matrix, Permutation, SQRT_DBL_EPSILON};
use crate::types::SolverError;

/// Full-step Newton iteration with the Jacobian recomputed by forward
/// differences after every step. Costs `n + 1` evaluations per iteration.
#[derive(Debug, Clone)]
pub struct DNewtonState {
    jac: DMatrix<f64>,
    lu: DMatrix<f64>,
    permutation: Permutation,
    fd: FdJacobian,
}

impl DNewtonState {
    /// Finite-difference Jacobian at the current iterate.
    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.jac
    }
}

impl FSolverState for DNewtonState {
    fn alloc(n: usize) -> Result<Self, SolverError> {
        Ok(Self {
            jac: try_matrix(n, n, "J")?,
            lu: try_matrix(n, n, "lu")?,
            permutation: Permutation::try_new(n)?,
            fd: FdJacobian::try_new(n)?,
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
        self.fd
            .compute(function, x, f, SQRT_DBL_EPSILON, &mut self.jac)?;
        dx.fill(0.0);
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
        self.lu.copy_from(&self.jac);
        lu_decomp(&mut self.lu, &mut self.permutation)?;
        lu_solve(&self.lu, &self.permutation, f, dx)?;

        dx.neg_mut();
        *x += &*dx;

        function.eval(x, f)?;
        self.fd
            .compute(function, x, f, SQRT_DBL_EPSILON, &mut self.jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::solvers::FnSystem;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_system_in_one_step() {
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = 3.0 * x[0] + x[1] - 5.0;
            f[1] = x[0] - 2.0 * x[1] + 3.0;
        });
        let mut state = DNewtonState::alloc(2).unwrap();
        let mut x = DVector::from_column_slice(&[10.0, -4.0]);
        let mut f = DVector::zeros(2);
        let mut dx = DVector::zeros(2);

        state.set(&system, &x, &mut f, &mut dx).unwrap();
        assert_relative_eq!(state.jacobian()[(0, 0)], 3.0, epsilon = 1e-6);
        assert_relative_eq!(state.jacobian()[(1, 1)], -2.0, epsilon = 1e-6);

        state.iterate(&system, &mut x, &mut f, &mut dx).unwrap();
        // Exact root (1, 2); forward differences are exact up to rounding here
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_singular_fd_jacobian() {
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = x[0] - 1.0;
            f[1] = 1.0;
        });
        let mut state = DNewtonState::alloc(2).unwrap();
        let mut x = DVector::from_column_slice(&[0.0, 0.0]);
        let mut f = DVector::zeros(2);
        let mut dx = DVector::zeros(2);
        state.set(&system, &x, &mut f, &mut dx).unwrap();
        assert_eq!(
            state.iterate(&system, &mut x, &mut f, &mut dx),
            Err(SolverError::SingularMatrix)
        );
    }
}
