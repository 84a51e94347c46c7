//! Trust-region Levenberg–Marquardt on the normal equations.
//!
//! # Algorithm
//!
//! Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵗJ + μ D²) δ = −Jᵗf
//! ```
//!
//! by Cholesky on the lower triangle, evaluates only `‖f(x + δ)‖` and
//! compares the actual reduction with the one predicted by the linear model:
//!
//! ```text
//! ρ = (‖f‖² − ‖f(x + δ)‖²) / (μ‖Dδ‖² − gᵗδ),   g = Jᵗf
//! ```
//!
//! - `ρ > 0`: accept, `μ ← μ·max(1/3, 1 − (2ρ − 1)³)`, `ν ← 2`
//! - otherwise: reject, `μ ← μ·ν`, `ν ← 2ν`
//!
//! Reference: H.B. Nielsen, "Damping Parameter in Marquardt's Method",
//! IMM-REP-1999-05, Technical University of Denmark.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use super::config::{LargeNlsConfig, Scaling};
use super::large::{LargeNlsFunction, NormalEquations};
use crate::math::linalg::{cholesky_decomp_lower, cholesky_solve_lower, try_matrix, try_vector};
use crate::types::SolverError;

/// Levenberg–Marquardt state for `p` parameters.
#[derive(Debug, Clone)]
pub struct LmState {
    diag: DVector<f64>,
    a: DMatrix<f64>,
    rhs: DVector<f64>,
    step: DVector<f64>,
    x_trial: DVector<f64>,
    mu: f64,
    nu: f64,
    scaling: Scaling,
    max_rejections: usize,
}

impl LmState {
    /// Reserve scratch for `p` parameters.
    pub fn alloc(p: usize) -> Result<Self, SolverError> {
        Ok(Self {
            diag: try_vector(p, "D")?,
            a: try_matrix(p, p, "JTJ + mu D^2")?,
            rhs: try_vector(p, "rhs")?,
            step: try_vector(p, "step")?,
            x_trial: try_vector(p, "x_trial")?,
            mu: 0.0,
            nu: 2.0,
            scaling: Scaling::More,
            max_rejections: 1,
        })
    }

    /// Current damping parameter `μ`.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Current scaling diagonal `D`.
    pub fn scaling_diag(&self) -> &DVector<f64> {
        &self.diag
    }

    /// Reset from the normal matrix at the starting point.
    ///
    /// `D` is initialised from `√diag(JᵗJ)` (or the identity for
    /// Levenberg scaling), and `μ = initial_mu · max_i (JᵗJ)_ii / D_i²`.
    pub fn set(&mut self, config: &LargeNlsConfig, jtj: &DMatrix<f64>) {
        self.scaling = config.scaling;
        self.max_rejections = config.max_rejections;
        self.diag.fill(0.0);
        self.update_diag(jtj);

        let max_ratio = (0..self.diag.len())
            .map(|i| jtj[(i, i)] / (self.diag[i] * self.diag[i]))
            .fold(0.0f64, f64::max);
        self.mu = if max_ratio > 0.0 && max_ratio.is_finite() {
            config.initial_mu * max_ratio
        } else {
            config.initial_mu
        };
        self.nu = 2.0;
    }

    fn update_diag(&mut self, jtj: &DMatrix<f64>) {
        for i in 0..self.diag.len() {
            let column_norm = jtj[(i, i)].max(0.0).sqrt();
            let di = match self.scaling {
                Scaling::Levenberg => 1.0,
                Scaling::Marquardt => column_norm,
                Scaling::More => self.diag[i].max(column_norm),
            };
            self.diag[i] = if di == 0.0 { 1.0 } else { di };
        }
    }

    /// Take one accepted step.
    ///
    /// On success `x ← x + δ`, `dx = δ`, and `normf`, `jtj` and `g` are
    /// re-evaluated at the new point.
    ///
    /// # Errors
    ///
    /// `NoProgress` after `max_rejections` consecutive rejected trials,
    /// leaving `x`, `dx`, `jtj`, `g` and `normf` untouched. Evaluator errors
    /// are propagated.
    pub fn iterate<F>(
        &mut self,
        function: &mut F,
        x: &mut DVector<f64>,
        dx: &mut DVector<f64>,
        jtj: &mut DMatrix<f64>,
        g: &mut DVector<f64>,
        normf: &mut f64,
    ) -> Result<(), SolverError>
    where
        F: LargeNlsFunction + ?Sized,
    {
        let p = x.len();
        let phi = *normf * *normf;
        let mut rejections = 0;

        loop {
            for j in 0..p {
                for i in j..p {
                    self.a[(i, j)] = jtj[(i, j)];
                }
                self.a[(j, j)] += self.mu * self.diag[j] * self.diag[j];
            }

            let rho = match cholesky_decomp_lower(&mut self.a) {
                Ok(()) => {
                    self.rhs.copy_from(&*g);
                    self.rhs.neg_mut();
                    cholesky_solve_lower(&self.a, &self.rhs, &mut self.step)?;

                    self.x_trial.copy_from(&*x);
                    self.x_trial += &self.step;
                    let normf_trial = function.eval(&self.x_trial, None)?;

                    let scaled_step = self.step.component_mul(&self.diag);
                    let pred = self.mu * scaled_step.norm_squared() - g.dot(&self.step);
                    let rho = if normf_trial.is_finite() && pred > 0.0 {
                        (phi - normf_trial * normf_trial) / pred
                    } else {
                        -1.0
                    };
                    trace!(mu = self.mu, rho, normf_trial, "lm trial step");
                    rho
                }
                Err(SolverError::NotPositiveDefinite) => -1.0,
                Err(err) => return Err(err),
            };

            if rho > 0.0 {
                x.copy_from(&self.x_trial);
                dx.copy_from(&self.step);
                let normal = NormalEquations {
                    jtj: &mut *jtj,
                    jtf: &mut *g,
                };
                *normf = function.eval(x, Some(normal))?;
                if !normf.is_finite() {
                    return Err(SolverError::NonFinite(
                        "residual norm at accepted point".to_string(),
                    ));
                }
                self.update_diag(jtj);

                let b = 2.0 * rho - 1.0;
                self.mu *= (1.0 - b * b * b).max(1.0 / 3.0);
                self.nu = 2.0;
                return Ok(());
            }

            self.mu *= self.nu;
            self.nu *= 2.0;
            rejections += 1;
            if rejections >= self.max_rejections {
                return Err(SolverError::NoProgress {
                    attempts: rejections,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Linear residuals f = A x − b with fixed A.
    struct Linear {
        a: DMatrix<f64>,
        b: DVector<f64>,
    }

    impl LargeNlsFunction for Linear {
        fn n_params(&self) -> usize {
            self.a.ncols()
        }

        fn n_residuals(&self) -> usize {
            self.a.nrows()
        }

        fn eval(
            &mut self,
            x: &DVector<f64>,
            normal: Option<NormalEquations<'_>>,
        ) -> Result<f64, SolverError> {
            let f = &self.a * x - &self.b;
            if let Some(ne) = normal {
                crate::math::linalg::syrk_lower(&self.a, ne.jtj)?;
                crate::math::linalg::gemv_t(&self.a, &f, ne.jtf)?;
            }
            Ok(f.norm())
        }
    }

    fn linear() -> Linear {
        Linear {
            a: DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, 1.0, 1.0]),
            b: DVector::from_column_slice(&[1.0, 2.0, 3.0]),
        }
    }

    #[test]
    fn test_set_initialises_mu_and_diag() {
        let mut function = linear();
        let mut jtj = DMatrix::zeros(2, 2);
        let mut g = DVector::zeros(2);
        function
            .eval(
                &DVector::zeros(2),
                Some(NormalEquations {
                    jtj: &mut jtj,
                    jtf: &mut g,
                }),
            )
            .unwrap();

        let mut state = LmState::alloc(2).unwrap();
        let config = LargeNlsConfig::default();
        state.set(&config, &jtj);
        // JᵗJ diagonal = (2, 5); D² matches it under Moré scaling
        assert!((state.scaling_diag()[0] - 2.0f64.sqrt()).abs() < 1e-15);
        assert!((state.scaling_diag()[1] - 5.0f64.sqrt()).abs() < 1e-15);
        assert!((state.mu() - config.initial_mu).abs() < 1e-18);

        let config = config.with_scaling(Scaling::Levenberg);
        state.set(&config, &jtj);
        assert_eq!(state.scaling_diag()[1], 1.0);
        assert!((state.mu() - 5.0 * config.initial_mu).abs() < 1e-15);
    }

    #[test]
    fn test_iterate_reduces_residual() {
        let mut function = linear();
        let mut x = DVector::zeros(2);
        let mut dx = DVector::zeros(2);
        let mut jtj = DMatrix::zeros(2, 2);
        let mut g = DVector::zeros(2);
        let mut normf = function
            .eval(
                &x,
                Some(NormalEquations {
                    jtj: &mut jtj,
                    jtf: &mut g,
                }),
            )
            .unwrap();
        let normf0 = normf;

        let mut state = LmState::alloc(2).unwrap();
        state.set(&LargeNlsConfig::default(), &jtj);
        state
            .iterate(&mut function, &mut x, &mut dx, &mut jtj, &mut g, &mut normf)
            .unwrap();

        assert!(normf < normf0);
        assert_eq!(x, dx);
    }

    #[test]
    fn test_rejections_bounded() {
        // The residual norm reported at trial points is always larger
        struct Uphill;

        impl LargeNlsFunction for Uphill {
            fn n_params(&self) -> usize {
                1
            }

            fn n_residuals(&self) -> usize {
                1
            }

            fn eval(
                &mut self,
                x: &DVector<f64>,
                normal: Option<NormalEquations<'_>>,
            ) -> Result<f64, SolverError> {
                match normal {
                    Some(ne) => {
                        ne.jtj[(0, 0)] = 1.0;
                        ne.jtf[0] = x[0];
                        Ok(x[0].abs())
                    }
                    None => Ok(1e6),
                }
            }
        }

        let mut function = Uphill;
        let mut x = DVector::from_element(1, 1.0);
        let mut dx = DVector::zeros(1);
        let mut jtj = DMatrix::from_element(1, 1, 1.0);
        let mut g = DVector::from_element(1, 1.0);
        let mut normf = 1.0;

        let mut state = LmState::alloc(1).unwrap();
        let config = LargeNlsConfig {
            max_rejections: 4,
            ..Default::default()
        };
        state.set(&config, &jtj);
        let mu0 = state.mu();

        let result = state.iterate(&mut function, &mut x, &mut dx, &mut jtj, &mut g, &mut normf);
        assert_eq!(result, Err(SolverError::NoProgress { attempts: 4 }));
        assert_eq!(x[0], 1.0);
        assert_eq!(dx[0], 0.0);
        // μ grew by ν = 2, 4, 8, 16
        assert!((state.mu() - mu0 * 1024.0).abs() < 1e-12);
    }
}
