//! Forward-difference Jacobian approximation.

use nalgebra::{DMatrix, DVector};

use super::function::MultirootFunction;
use crate::math::linalg::try_vector;
use crate::types::SolverError;

/// Scratch storage for forward-difference Jacobians of an `n`-dimensional system.
///
/// Column `j` is approximated as `(f(x + h_j e_j) − f(x)) / h_j` with
/// `h_j = epsrel·|x_j|`, or `h_j = epsrel` when `x_j == 0`. The divisor is
/// the step actually representable in `x_j + h_j`. When a relative step
/// smaller than `epsrel` leaves `f` unchanged, the column is recomputed
/// with the absolute step `epsrel`.
#[derive(Debug, Clone)]
pub struct FdJacobian {
    x1: DVector<f64>,
    f1: DVector<f64>,
}

impl FdJacobian {
    /// Reserve scratch for dimension `n`.
    pub fn try_new(n: usize) -> Result<Self, SolverError> {
        Ok(Self {
            x1: try_vector(n, "x_fd")?,
            f1: try_vector(n, "f_fd")?,
        })
    }

    /// Fill `jac` with the forward-difference Jacobian at `x`, where `f = f(x)`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if any argument disagrees with the scratch size;
    /// evaluator errors are propagated.
    pub fn compute<S>(
        &mut self,
        function: &S,
        x: &DVector<f64>,
        f: &DVector<f64>,
        epsrel: f64,
        jac: &mut DMatrix<f64>,
    ) -> Result<(), SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        let n = self.x1.len();
        for got in [x.len(), f.len(), jac.nrows(), jac.ncols()] {
            if got != n {
                return Err(SolverError::DimensionMismatch { expected: n, got });
            }
        }

        self.x1.copy_from(x);
        for j in 0..n {
            let xj = x[j];
            let relative = epsrel * xj.abs();
            let mut h = if relative == 0.0 { epsrel } else { relative };

            let mut taken = self.perturb(function, f, j, xj, h)?;
            if taken.is_none() && h < epsrel {
                h = epsrel;
                taken = self.perturb(function, f, j, xj, h)?;
            }

            let taken = taken.unwrap_or(h);
            for i in 0..n {
                jac[(i, j)] = (self.f1[i] - f[i]) / taken;
            }
        }
        Ok(())
    }

    /// Evaluate `f(x + h e_j)` into `f1`.
    ///
    /// Returns the step actually taken, `(x_j + h) − x_j`, or `None` when
    /// that step is zero or leaves `f` unchanged. `x1` is restored either way.
    fn perturb<S>(
        &mut self,
        function: &S,
        f: &DVector<f64>,
        j: usize,
        xj: f64,
        h: f64,
    ) -> Result<Option<f64>, SolverError>
    where
        S: MultirootFunction + ?Sized,
    {
        self.x1[j] = xj + h;
        let taken = self.x1[j] - xj;
        let result = function.eval(&self.x1, &mut self.f1);
        self.x1[j] = xj;
        result?;
        if taken == 0.0 || self.f1 == *f {
            return Ok(None);
        }
        Ok(Some(taken))
    }
}

/// Forward-difference Jacobian with freshly allocated scratch.
///
/// Prefer [`FdJacobian`] inside iteration loops.
pub fn fdjacobian<S>(
    function: &S,
    x: &DVector<f64>,
    f: &DVector<f64>,
    epsrel: f64,
    jac: &mut DMatrix<f64>,
) -> Result<(), SolverError>
where
    S: MultirootFunction + ?Sized,
{
    FdJacobian::try_new(x.len())?.compute(function, x, f, epsrel, jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linalg::SQRT_DBL_EPSILON;
    use crate::math::solvers::FnSystem;
    use approx::assert_relative_eq;

    #[test]
    fn test_fdjacobian_close_to_analytic() {
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = x[0] * x[0] + x[1];
            f[1] = x[0].exp() - 3.0 * x[1];
        });
        let x = DVector::from_column_slice(&[1.5, 0.0]);
        let mut f = DVector::zeros(2);
        system.eval(&x, &mut f).unwrap();

        let mut jac = DMatrix::zeros(2, 2);
        fdjacobian(&system, &x, &f, SQRT_DBL_EPSILON, &mut jac).unwrap();

        assert_relative_eq!(jac[(0, 0)], 3.0, epsilon = 1e-6);
        assert_relative_eq!(jac[(0, 1)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(jac[(1, 0)], 1.5f64.exp(), epsilon = 1e-6);
        // x1 == 0 uses the absolute step
        assert_relative_eq!(jac[(1, 1)], -3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fdjacobian_restores_point() {
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = x[0];
            f[1] = x[1];
        });
        let x = DVector::from_column_slice(&[2.0, -1.0]);
        let f = x.clone();
        let mut fd = FdJacobian::try_new(2).unwrap();
        let mut jac = DMatrix::zeros(2, 2);
        fd.compute(&system, &x, &f, SQRT_DBL_EPSILON, &mut jac)
            .unwrap();
        fd.compute(&system, &x, &f, SQRT_DBL_EPSILON, &mut jac)
            .unwrap();
        assert_relative_eq!(jac[(0, 0)], 1.0, epsilon = 1e-7);
        assert_relative_eq!(jac[(1, 1)], 1.0, epsilon = 1e-7);
        assert_relative_eq!(jac[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fdjacobian_tiny_component_falls_back_to_absolute_step() {
        // ε·1e-16 is lost against x0 − x1 ≈ 1
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = x[0] + 0.5 * (x[0] - x[1]).powi(3) - 1.0;
            f[1] = 0.5 * (x[1] - x[0]).powi(3) + x[1];
        });
        let x = DVector::from_column_slice(&[1.0, 1e-16]);
        let mut f = DVector::zeros(2);
        system.eval(&x, &mut f).unwrap();

        let mut jac = DMatrix::zeros(2, 2);
        fdjacobian(&system, &x, &f, SQRT_DBL_EPSILON, &mut jac).unwrap();

        assert_relative_eq!(jac[(0, 0)], 2.5, epsilon = 1e-6);
        assert_relative_eq!(jac[(0, 1)], -1.5, epsilon = 1e-6);
        assert_relative_eq!(jac[(1, 0)], -1.5, epsilon = 1e-6);
        assert_relative_eq!(jac[(1, 1)], 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_fdjacobian_constant_column_stays_zero() {
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = x[0];
            f[1] = 2.0 * x[0];
        });
        let x = DVector::from_column_slice(&[3.0, 1e-12]);
        let mut f = DVector::zeros(2);
        system.eval(&x, &mut f).unwrap();

        let mut jac = DMatrix::zeros(2, 2);
        fdjacobian(&system, &x, &f, SQRT_DBL_EPSILON, &mut jac).unwrap();
        assert_eq!(jac[(0, 1)], 0.0);
        assert_eq!(jac[(1, 1)], 0.0);
    }

    #[test]
    fn test_fdjacobian_dimension_mismatch() {
        let system = FnSystem::new(2, |_: &[f64], _: &mut [f64]| {});
        let mut jac = DMatrix::zeros(3, 3);
        let x = DVector::zeros(2);
        let result = fdjacobian(&system, &x, &x, SQRT_DBL_EPSILON, &mut jac);
        assert!(matches!(result, Err(SolverError::DimensionMismatch { .. })));
    }
}
