//! Solver configuration types.

/// Configuration for the multiroot drivers.
///
/// The driver stops as soon as either the residual test
/// (`Σ|f_i| < epsabs`) or the step test
/// (`|dx_i| < epsabs_dx + epsrel_dx·|x_i|`) passes.
///
/// # Example
///
/// ```
/// use nlsolve_core::math::solvers::MultirootConfig;
///
/// let config = MultirootConfig::default();
/// assert!(config.epsabs < 1e-8);
/// assert!(config.max_iterations >= 100);
///
/// let custom = MultirootConfig {
///     epsabs: 1e-12,
///     ..MultirootConfig::default()
/// };
/// assert_eq!(custom.max_iterations, config.max_iterations);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MultirootConfig {
    /// Absolute tolerance on the residual sum `Σ|f_i|`.
    pub epsabs: f64,
    /// Absolute tolerance on each step component.
    pub epsabs_dx: f64,
    /// Relative tolerance on each step component.
    pub epsrel_dx: f64,
    /// Maximum number of iterations before giving up.
    pub max_iterations: usize,
}

impl Default for MultirootConfig {
    /// Default values:
    /// - `epsabs`: 1e-10
    /// - `epsabs_dx`: 0
    /// - `epsrel_dx`: 1e-12
    /// - `max_iterations`: 1000
    fn default() -> Self {
        Self {
            epsabs: 1e-10,
            epsabs_dx: 0.0,
            epsrel_dx: 1e-12,
            max_iterations: 1000,
        }
    }
}

impl MultirootConfig {
    /// Create a configuration with the given residual tolerance and iteration limit.
    ///
    /// # Panics
    ///
    /// Panics if `epsabs <= 0` or `max_iterations == 0`.
    ///
    /// # Example
    ///
    /// ```
    /// use nlsolve_core::math::solvers::MultirootConfig;
    ///
    /// let config = MultirootConfig::new(1e-12, 200);
    /// assert_eq!(config.max_iterations, 200);
    /// ```
    pub fn new(epsabs: f64, max_iterations: usize) -> Self {
        assert!(epsabs > 0.0, "tolerance must be positive");
        assert!(max_iterations > 0, "max_iterations must be > 0");
        Self {
            epsabs,
            max_iterations,
            ..Default::default()
        }
    }

    /// Tight tolerances for cases requiring extreme precision.
    pub fn high_precision() -> Self {
        Self {
            epsabs: 1e-14,
            epsabs_dx: 0.0,
            epsrel_dx: 1e-15,
            max_iterations: 5000,
        }
    }

    /// Relaxed tolerances for cases where speed matters more than precision.
    pub fn fast() -> Self {
        Self {
            epsabs: 1e-6,
            epsabs_dx: 0.0,
            epsrel_dx: 1e-8,
            max_iterations: 100,
        }
    }

    /// Check that all tolerances are non-negative and the budget is positive.
    pub fn validate(&self) -> Result<(), crate::types::SolverError> {
        use crate::types::SolverError;

        if !(self.epsabs >= 0.0) || !(self.epsabs_dx >= 0.0) || !(self.epsrel_dx >= 0.0) {
            return Err(SolverError::invalid_input("tolerances must be non-negative"));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::invalid_input("max_iterations must be > 0"));
        }
        Ok(())
    }
}

/// Damping and restart limits for the Broyden solver.
///
/// # Fields
///
/// * `max_damping_steps` - Trial evaluations per direction before the Jacobian is refreshed
/// * `min_step` - Step fraction at or below which damping gives up
/// * `max_restarts` - Jacobian refreshes allowed within one iteration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BroydenParams {
    /// Trial evaluations per search direction.
    pub max_damping_steps: usize,
    /// Smallest step fraction that may still be reduced.
    pub min_step: f64,
    /// Finite-difference Jacobian refreshes allowed per iteration.
    pub max_restarts: usize,
}

impl Default for BroydenParams {
    fn default() -> Self {
        Self {
            max_damping_steps: 10,
            min_step: 0.1,
            max_restarts: 10,
        }
    }
}

/// Diagonal scaling strategy for the Levenberg–Marquardt trust region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Scaling {
    /// Identity scaling: `D = I`.
    Levenberg,
    /// `D = √diag(JᵗJ)` at the current point.
    Marquardt,
    /// Running maximum of `√diag(JᵗJ)` over all iterations.
    #[default]
    More,
}

impl Scaling {
    /// Lower-case name, as accepted by [`str::parse`].
    pub fn name(&self) -> &'static str {
        match self {
            Scaling::Levenberg => "levenberg",
            Scaling::Marquardt => "marquardt",
            Scaling::More => "more",
        }
    }
}

impl std::str::FromStr for Scaling {
    type Err = crate::types::SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "levenberg" => Ok(Scaling::Levenberg),
            "marquardt" => Ok(Scaling::Marquardt),
            "more" => Ok(Scaling::More),
            other => Err(crate::types::SolverError::invalid_input(format!(
                "unknown scaling '{other}'"
            ))),
        }
    }
}

/// Configuration for the large-scale nonlinear least-squares solver.
///
/// # Example
///
/// ```
/// use nlsolve_core::math::solvers::{LargeNlsConfig, Scaling};
///
/// let config = LargeNlsConfig::default();
/// assert_eq!(config.scaling, Scaling::More);
/// assert_eq!(config.ftol, 0.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LargeNlsConfig {
    /// Step tolerance: `|δ_i| ≤ xtol·(|x_i| + xtol)`.
    pub xtol: f64,
    /// Scaled gradient tolerance.
    pub gtol: f64,
    /// Relative reduction tolerance on `‖f‖`; zero disables the test.
    pub ftol: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Trust-region scaling strategy.
    pub scaling: Scaling,
    /// Initial damping parameter.
    pub initial_mu: f64,
    /// Consecutive rejected steps tolerated within one iteration.
    pub max_rejections: usize,
}

impl Default for LargeNlsConfig {
    /// Default values:
    /// - `xtol`, `gtol`: `ε^0.9` (≈ 8.0e-15). Problems with a nonzero
    ///   minimum can hit rounding first and end as
    ///   [`ConvergenceReason::Stalled`](super::ConvergenceReason::Stalled).
    /// - `ftol`: 0
    /// - `max_iterations`: 1000
    /// - `scaling`: [`Scaling::More`]
    /// - `initial_mu`: 1e-3
    /// - `max_rejections`: 15
    fn default() -> Self {
        let tol = f64::EPSILON.powf(0.9);
        Self {
            xtol: tol,
            gtol: tol,
            ftol: 0.0,
            max_iterations: 1000,
            scaling: Scaling::More,
            initial_mu: 1e-3,
            max_rejections: 15,
        }
    }
}

impl LargeNlsConfig {
    /// Create a configuration with the given step tolerance and iteration limit.
    ///
    /// # Panics
    ///
    /// Panics if `xtol <= 0` or `max_iterations == 0`.
    pub fn new(xtol: f64, max_iterations: usize) -> Self {
        assert!(xtol > 0.0, "tolerance must be positive");
        assert!(max_iterations > 0, "max_iterations must be > 0");
        Self {
            xtol,
            max_iterations,
            ..Default::default()
        }
    }

    /// Relaxed tolerances and a small budget.
    pub fn fast() -> Self {
        Self {
            xtol: 1e-8,
            gtol: 1e-8,
            max_iterations: 200,
            ..Default::default()
        }
    }

    /// Use the given scaling strategy.
    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Check tolerances, damping and budgets.
    pub fn validate(&self) -> Result<(), crate::types::SolverError> {
        use crate::types::SolverError;

        if !(self.xtol >= 0.0) || !(self.gtol >= 0.0) || !(self.ftol >= 0.0) {
            return Err(SolverError::invalid_input("tolerances must be non-negative"));
        }
        if !(self.initial_mu > 0.0) || !self.initial_mu.is_finite() {
            return Err(SolverError::invalid_input("initial_mu must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::invalid_input("max_iterations must be > 0"));
        }
        if self.max_rejections == 0 {
            return Err(SolverError::invalid_input("max_rejections must be > 0"));
        }
        Ok(())
    }
}

/// Configuration for the fitting harness.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HarnessConfig {
    /// Settings passed to every large-scale solver the harness allocates.
    pub solver: LargeNlsConfig,
}
