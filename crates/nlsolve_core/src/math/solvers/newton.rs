//! Newton's method with the exact Jacobian.

use nalgebra::{DMatrix, DVector};

use super::function::MultirootFunctionFdf;
use super::multiroot::FdfSolverState;
use crate::math::linalg::{lu_decomp, lu_solve, try_matrix, Permutation};
use crate::types::SolverError;

/// Full-step Newton iteration: `x ← x − J(x)⁻¹ f(x)`.
///
/// There is no damping; far from a root the iteration may diverge. A zero
/// pivot in the LU factorisation of `J` is reported as `SingularMatrix`
/// and leaves `x`, `f` and `dx` untouched.
#[derive(Debug, Clone)]
pub struct NewtonState {
    lu: DMatrix<f64>,
    permutation: Permutation,
}

impl FdfSolverState for NewtonState {
    fn alloc(n: usize) -> Result<Self, SolverError> {
        Ok(Self {
            lu: try_matrix(n, n, "lu")?,
            permutation: Permutation::try_new(n)?,
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
        lu_solve(&self.lu, &self.permutation, f, dx)?;

        // dx holds e = J⁻¹f; the step is −e
        dx.neg_mut();
        *x += &*dx;

        function.eval_fdf(x, f, jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::solvers::{FdfSolver, FdfSolverType, FnSystemFdf, MultirootFunction};
    use approx::assert_relative_eq;

    fn nonlinear() -> impl MultirootFunctionFdf {
        FnSystemFdf::new(
            2,
            |x: &[f64], f: &mut [f64]| {
                f[0] = x[0] * x[0] + x[1] - 3.0;
                f[1] = x[0] - x[1] + 1.0;
            },
            |x: &[f64], j: &mut DMatrix<f64>| {
                j[(0, 0)] = 2.0 * x[0];
                j[(0, 1)] = 1.0;
                j[(1, 0)] = 1.0;
                j[(1, 1)] = -1.0;
            },
        )
    }

    #[test]
    fn test_single_step_matches_explicit_inverse() {
        let system = nonlinear();
        let x0 = DVector::from_column_slice(&[2.0, 0.5]);

        let mut f0 = DVector::zeros(2);
        system.eval(&x0, &mut f0).unwrap();
        // J(x0) = [[4, 1], [1, -1]]
        let (a, b, c, d) = (4.0, 1.0, 1.0, -1.0);
        let det = a * d - b * c;
        let e0 = (d * f0[0] - b * f0[1]) / det;
        let e1 = (-c * f0[0] + a * f0[1]) / det;

        let mut solver = FdfSolver::new(FdfSolverType::Newton, 2).unwrap();
        solver.set(&system, &x0).unwrap();
        solver.iterate(&system).unwrap();

        assert_relative_eq!(solver.root()[0], 2.0 - e0, epsilon = 1e-14);
        assert_relative_eq!(solver.root()[1], 0.5 - e1, epsilon = 1e-14);
        assert_relative_eq!(solver.step()[0], -e0, epsilon = 1e-14);
        assert_relative_eq!(solver.step()[1], -e1, epsilon = 1e-14);

        // Returned residual is a fresh evaluation at the new point
        let mut fresh = DVector::zeros(2);
        system.eval(solver.root(), &mut fresh).unwrap();
        assert_eq!(solver.residual(), &fresh);
    }

    #[test]
    fn test_singular_jacobian_reports_numerical_failure() {
        // Rows of J are parallel everywhere
        let system = FnSystemFdf::new(
            2,
            |x: &[f64], f: &mut [f64]| {
                f[0] = x[0] + x[1] - 3.0;
                f[1] = 2.0 * x[0] + 2.0 * x[1] - 1.0;
            },
            |_: &[f64], j: &mut DMatrix<f64>| {
                j[(0, 0)] = 1.0;
                j[(0, 1)] = 1.0;
                j[(1, 0)] = 2.0;
                j[(1, 1)] = 2.0;
            },
        );
        let x0 = DVector::from_column_slice(&[0.5, 0.25]);

        let mut solver = FdfSolver::new(FdfSolverType::Newton, 2).unwrap();
        solver.set(&system, &x0).unwrap();
        let err = solver.iterate(&system).unwrap_err();

        assert_eq!(err, SolverError::SingularMatrix);
        assert!(err.is_numerical());
        assert_eq!(solver.root(), &x0);
    }

    #[test]
    fn test_state_lifecycle_directly() {
        let system = nonlinear();
        let mut state = NewtonState::alloc(2).unwrap();
        let mut x = DVector::from_column_slice(&[1.5, 1.5]);
        let mut f = DVector::zeros(2);
        let mut jac = DMatrix::zeros(2, 2);
        let mut dx = DVector::from_element(2, 7.0);

        state.set(&system, &x, &mut f, &mut jac, &mut dx).unwrap();
        assert!(dx.iter().all(|&d| d == 0.0));

        for _ in 0..20 {
            if f.norm() < 1e-13 {
                break;
            }
            state
                .iterate(&system, &mut x, &mut f, &mut jac, &mut dx)
                .unwrap();
        }
        // x² + y = 3 with y = x + 1, nearest root (1, 2)
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-10);
        state.release();
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            /// Newton solves a diagonally dominant linear system in one step.
            #[test]
            fn test_one_step_on_linear_system(
                entries in prop::collection::vec(-1.0f64..1.0, 9),
                rhs in prop::collection::vec(-5.0f64..5.0, 3),
                start in prop::collection::vec(-5.0f64..5.0, 3)
            ) {
                let mut a = DMatrix::from_row_slice(3, 3, &entries);
                for i in 0..3 {
                    a[(i, i)] += 4.0;
                }
                let b = DVector::from_column_slice(&rhs);
                let a_f = a.clone();
                let a_df = a.clone();
                let system = FnSystemFdf::new(
                    3,
                    move |x: &[f64], f: &mut [f64]| {
                        let ax = &a_f * DVector::from_column_slice(x);
                        for i in 0..3 {
                            f[i] = ax[i] - b[i];
                        }
                    },
                    move |_: &[f64], j: &mut DMatrix<f64>| j.copy_from(&a_df),
                );

                let mut solver = FdfSolver::new(FdfSolverType::Newton, 3).unwrap();
                solver.set(&system, &DVector::from_column_slice(&start)).unwrap();
                solver.iterate(&system).unwrap();
                prop_assert!(solver.residual().norm() < 1e-10);
            }
        }
    }
}
