//! Objective function contracts for the multiroot solvers.
//!
//! A system of `n` equations in `n` unknowns is described by one of two
//! capability shapes:
//!
//! - [`MultirootFunction`]: residual `f(x)` only, for solvers that build
//!   their own Jacobian approximation (Broyden, discrete Newton)
//! - [`MultirootFunctionFdf`]: residual plus exact Jacobian `J(x)`, for
//!   Newton-type solvers
//!
//! Closure adapters ([`FnSystem`], [`FnSystemFdf`]) cover the common case.
//! With the `num-dual-mode` feature, [`AdSystem`] derives the Jacobian by
//! forward-mode automatic differentiation.

use nalgebra::{DMatrix, DVector};

use crate::types::SolverError;

/// A square nonlinear system `f: ℝⁿ → ℝⁿ`.
///
/// Implementors capture their own parameters. Evaluation takes `&self`, so a
/// system can be shared between solvers that run one after another.
pub trait MultirootFunction {
    /// Number of equations and unknowns.
    fn dim(&self) -> usize;

    /// Evaluate the residual at `x` into `f`.
    ///
    /// Both vectors have length [`dim`](Self::dim). An error aborts the
    /// current solver operation and is returned to the caller unchanged.
    fn eval(&self, x: &DVector<f64>, f: &mut DVector<f64>) -> Result<(), SolverError>;
}

/// A square system that also supplies its Jacobian.
pub trait MultirootFunctionFdf: MultirootFunction {
    /// Evaluate the Jacobian `J_ij = ∂f_i/∂x_j` at `x`.
    fn eval_df(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), SolverError>;

    /// Evaluate residual and Jacobian together.
    ///
    /// The default calls [`eval`](MultirootFunction::eval) then
    /// [`eval_df`](Self::eval_df); override it when the two share work.
    fn eval_fdf(
        &self,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
    ) -> Result<(), SolverError> {
        self.eval(x, f)?;
        self.eval_df(x, jac)
    }
}

impl<T: MultirootFunction + ?Sized> MultirootFunction for &T {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn eval(&self, x: &DVector<f64>, f: &mut DVector<f64>) -> Result<(), SolverError> {
        (**self).eval(x, f)
    }
}

impl<T: MultirootFunctionFdf + ?Sized> MultirootFunctionFdf for &T {
    fn eval_df(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), SolverError> {
        (**self).eval_df(x, jac)
    }

    fn eval_fdf(
        &self,
        x: &DVector<f64>,
        f: &mut DVector<f64>,
        jac: &mut DMatrix<f64>,
    ) -> Result<(), SolverError> {
        (**self).eval_fdf(x, f, jac)
    }
}

/// Residual-only system backed by a closure over slices.
///
/// # Example
///
/// ```
/// use nalgebra::DVector;
/// use nlsolve_core::math::solvers::{FnSystem, MultirootFunction};
///
/// let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
///     f[0] = x[0] - 1.0;
///     f[1] = x[1] + 2.0;
/// });
///
/// let mut f = DVector::zeros(2);
/// system.eval(&DVector::from_column_slice(&[1.0, 0.0]), &mut f).unwrap();
/// assert_eq!(f[1], 2.0);
/// ```
#[derive(Clone)]
pub struct FnSystem<F> {
    n: usize,
    f: F,
}

impl<F> FnSystem<F>
where
    F: Fn(&[f64], &mut [f64]),
{
    /// Wrap a residual closure for a system of dimension `n`.
    pub fn new(n: usize, f: F) -> Self {
        Self { n, f }
    }
}

impl<F> std::fmt::Debug for FnSystem<F> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("FnSystem").field("n", &self.n).finish()
    }
}

fn check_dims(n: usize, x: &DVector<f64>, f: &DVector<f64>) -> Result<(), SolverError> {
    if x.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: x.len(),
        });
    }
    if f.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: f.len(),
        });
    }
    Ok(())
}

fn check_jacobian(n: usize, x: &DVector<f64>, jac: &DMatrix<f64>) -> Result<(), SolverError> {
    if x.len() != n {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: x.len(),
        });
    }
    if jac.shape() != (n, n) {
        return Err(SolverError::DimensionMismatch {
            expected: n,
            got: if jac.nrows() != n { jac.nrows() } else { jac.ncols() },
        });
    }
    Ok(())
}

impl<F> MultirootFunction for FnSystem<F>
where
    F: Fn(&[f64], &mut [f64]),
{
    fn dim(&self) -> usize {
        self.n
    }

    fn eval(&self, x: &DVector<f64>, f: &mut DVector<f64>) -> Result<(), SolverError> {
        check_dims(self.n, x, f)?;
        (self.f)(x.as_slice(), f.as_mut_slice());
        Ok(())
    }
}

/// Residual-plus-Jacobian system backed by two closures.
#[derive(Clone)]
pub struct FnSystemFdf<F, D> {
    n: usize,
    f: F,
    df: D,
}

impl<F, D> FnSystemFdf<F, D>
where
    F: Fn(&[f64], &mut [f64]),
    D: Fn(&[f64], &mut DMatrix<f64>),
{
    /// Wrap residual and Jacobian closures for a system of dimension `n`.
    pub fn new(n: usize, f: F, df: D) -> Self {
        Self { n, f, df }
    }
}

impl<F, D> std::fmt::Debug for FnSystemFdf<F, D> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("FnSystemFdf").field("n", &self.n).finish()
    }
}

impl<F, D> MultirootFunction for FnSystemFdf<F, D>
where
    F: Fn(&[f64], &mut [f64]),
    D: Fn(&[f64], &mut DMatrix<f64>),
{
    fn dim(&self) -> usize {
        self.n
    }

    fn eval(&self, x: &DVector<f64>, f: &mut DVector<f64>) -> Result<(), SolverError> {
        check_dims(self.n, x, f)?;
        (self.f)(x.as_slice(), f.as_mut_slice());
        Ok(())
    }
}

impl<F, D> MultirootFunctionFdf for FnSystemFdf<F, D>
where
    F: Fn(&[f64], &mut [f64]),
    D: Fn(&[f64], &mut DMatrix<f64>),
{
    fn eval_df(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), SolverError> {
        check_jacobian(self.n, x, jac)?;
        (self.df)(x.as_slice(), jac);
        Ok(())
    }
}

#[cfg(feature = "num-dual-mode")]
pub use ad::AdSystem;

#[cfg(feature = "num-dual-mode")]
mod ad {
    use nalgebra::{DMatrix, DVector};
    use num_dual::Dual64;

    use super::{check_dims, check_jacobian, MultirootFunction, MultirootFunctionFdf};
    use crate::types::SolverError;

    /// System whose Jacobian is computed by forward-mode automatic differentiation.
    ///
    /// The closure is written once over [`Dual64`]; each Jacobian column
    /// costs one evaluation with the derivative seed on that coordinate.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::{DMatrix, DVector};
    /// use num_dual::Dual64;
    /// use nlsolve_core::math::solvers::{AdSystem, MultirootFunctionFdf};
    ///
    /// let system = AdSystem::new(2, |x: &[Dual64], f: &mut [Dual64]| {
    ///     f[0] = x[0] * x[1];
    ///     f[1] = x[0] * x[0] - Dual64::from(1.0);
    /// });
    ///
    /// let mut jac = DMatrix::zeros(2, 2);
    /// system.eval_df(&DVector::from_column_slice(&[2.0, 3.0]), &mut jac).unwrap();
    /// assert_eq!(jac[(0, 0)], 3.0);
    /// assert_eq!(jac[(1, 0)], 4.0);
    /// ```
    #[derive(Clone)]
    pub struct AdSystem<F> {
        n: usize,
        f: F,
    }

    impl<F> AdSystem<F>
    where
        F: Fn(&[Dual64], &mut [Dual64]),
    {
        /// Wrap a dual-number residual closure for a system of dimension `n`.
        pub fn new(n: usize, f: F) -> Self {
            Self { n, f }
        }

        fn eval_dual(&self, x: &DVector<f64>, seed: Option<usize>) -> Vec<Dual64> {
            let xd: Vec<Dual64> = x
                .iter()
                .enumerate()
                .map(|(i, &xi)| Dual64::new(xi, if Some(i) == seed { 1.0 } else { 0.0 }))
                .collect();
            let mut fd = vec![Dual64::from(0.0); self.n];
            (self.f)(&xd, &mut fd);
            fd
        }
    }

    impl<F> std::fmt::Debug for AdSystem<F> {
        fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            fmt.debug_struct("AdSystem").field("n", &self.n).finish()
        }
    }

    impl<F> MultirootFunction for AdSystem<F>
    where
        F: Fn(&[Dual64], &mut [Dual64]),
    {
        fn dim(&self) -> usize {
            self.n
        }

        fn eval(&self, x: &DVector<f64>, f: &mut DVector<f64>) -> Result<(), SolverError> {
            check_dims(self.n, x, f)?;
            for (fi, di) in f.iter_mut().zip(self.eval_dual(x, None)) {
                *fi = di.re;
            }
            Ok(())
        }
    }

    impl<F> MultirootFunctionFdf for AdSystem<F>
    where
        F: Fn(&[Dual64], &mut [Dual64]),
    {
        fn eval_df(&self, x: &DVector<f64>, jac: &mut DMatrix<f64>) -> Result<(), SolverError> {
            check_jacobian(self.n, x, jac)?;
            for j in 0..self.n {
                for (i, di) in self.eval_dual(x, Some(j)).into_iter().enumerate() {
                    jac[(i, j)] = di.eps;
                }
            }
            Ok(())
        }

        fn eval_fdf(
            &self,
            x: &DVector<f64>,
            f: &mut DVector<f64>,
            jac: &mut DMatrix<f64>,
        ) -> Result<(), SolverError> {
            check_dims(self.n, x, f)?;
            check_jacobian(self.n, x, jac)?;
            for j in 0..self.n {
                for (i, di) in self.eval_dual(x, Some(j)).into_iter().enumerate() {
                    if j == 0 {
                        f[i] = di.re;
                    }
                    jac[(i, j)] = di.eps;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fn_system_eval() {
        let system = FnSystem::new(2, |x: &[f64], f: &mut [f64]| {
            f[0] = x[0] * x[0];
            f[1] = x[0] + x[1];
        });
        let mut f = DVector::zeros(2);
        system
            .eval(&DVector::from_column_slice(&[3.0, 1.0]), &mut f)
            .unwrap();
        assert_eq!(f[0], 9.0);
        assert_eq!(f[1], 4.0);
        assert_eq!(system.dim(), 2);
    }

    #[test]
    fn test_fn_system_dimension_mismatch() {
        let system = FnSystem::new(2, |_: &[f64], _: &mut [f64]| {});
        let mut f = DVector::zeros(2);
        let result = system.eval(&DVector::zeros(3), &mut f);
        assert_eq!(
            result,
            Err(SolverError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn test_fn_system_fdf_default_eval_fdf() {
        let system = FnSystemFdf::new(
            1,
            |x: &[f64], f: &mut [f64]| f[0] = x[0] * x[0] - 2.0,
            |x: &[f64], j: &mut DMatrix<f64>| j[(0, 0)] = 2.0 * x[0],
        );
        let mut f = DVector::zeros(1);
        let mut jac = DMatrix::zeros(1, 1);
        system
            .eval_fdf(&DVector::from_column_slice(&[3.0]), &mut f, &mut jac)
            .unwrap();
        assert_eq!(f[0], 7.0);
        assert_eq!(jac[(0, 0)], 6.0);
    }

    #[test]
    fn test_fn_system_fdf_jacobian_checks_point_length() {
        let system = FnSystemFdf::new(
            2,
            |x: &[f64], f: &mut [f64]| {
                f[0] = x[0];
                f[1] = x[1];
            },
            |x: &[f64], j: &mut DMatrix<f64>| {
                j[(0, 0)] = x[0];
                j[(1, 1)] = x[1];
            },
        );
        let mut jac = DMatrix::zeros(2, 2);
        let result = system.eval_df(&DVector::zeros(1), &mut jac);
        assert_eq!(
            result,
            Err(SolverError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );

        let mut wide = DMatrix::zeros(2, 3);
        let result = system.eval_df(&DVector::zeros(2), &mut wide);
        assert_eq!(
            result,
            Err(SolverError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn test_reference_forwards() {
        let system = FnSystem::new(1, |x: &[f64], f: &mut [f64]| f[0] = -x[0]);
        let by_ref = &system;
        let mut f = DVector::zeros(1);
        by_ref
            .eval(&DVector::from_column_slice(&[2.0]), &mut f)
            .unwrap();
        assert_eq!(f[0], -2.0);
        assert_eq!(by_ref.dim(), 1);
    }

    #[cfg(feature = "num-dual-mode")]
    mod ad_tests {
        use super::*;
        use num_dual::{Dual64, DualNum};

        #[test]
        fn test_ad_jacobian_matches_analytic() {
            // Rosenbrock system: f = (1 - x0, 10 (x1 - x0²))
            let system = AdSystem::new(2, |x: &[Dual64], f: &mut [Dual64]| {
                f[0] = Dual64::from(1.0) - x[0];
                f[1] = (x[1] - x[0] * x[0]) * 10.0;
            });
            let x = DVector::from_column_slice(&[-1.2, 1.0]);
            let mut f = DVector::zeros(2);
            let mut jac = DMatrix::zeros(2, 2);
            system.eval_fdf(&x, &mut f, &mut jac).unwrap();

            assert_relative_eq!(f[0], 2.2, epsilon = 1e-14);
            assert_relative_eq!(f[1], 10.0 * (1.0 - 1.44), epsilon = 1e-12);
            assert_relative_eq!(jac[(0, 0)], -1.0, epsilon = 1e-14);
            assert_relative_eq!(jac[(0, 1)], 0.0, epsilon = 1e-14);
            assert_relative_eq!(jac[(1, 0)], 24.0, epsilon = 1e-12);
            assert_relative_eq!(jac[(1, 1)], 10.0, epsilon = 1e-14);
        }

        #[test]
        fn test_ad_eval_only() {
            let system = AdSystem::new(1, |x: &[Dual64], f: &mut [Dual64]| {
                f[0] = x[0].sin();
            });
            let mut f = DVector::zeros(1);
            system
                .eval(&DVector::from_column_slice(&[0.5]), &mut f)
                .unwrap();
            assert_relative_eq!(f[0], 0.5f64.sin(), epsilon = 1e-15);
        }
    }
}
