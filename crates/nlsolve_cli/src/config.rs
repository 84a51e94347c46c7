//! CLI configuration management.
//!
//! Settings are read from an optional TOML file (`nlsolve.toml` by
//! default), then overridden by `NLSOLVE_*` environment variables and
//! validated before any command runs.
//!
//! ```toml
//! format = "json"
//!
//! [multiroot]
//! epsabs = 1e-12
//! max_iterations = 200
//!
//! [broyden]
//! max_restarts = 5
//!
//! [harness.solver]
//! scaling = "marquardt"
//! ```

use std::path::Path;

use nlsolve_core::math::solvers::{BroydenParams, HarnessConfig, MultirootConfig, Scaling};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON document on stdout
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::Parse(format!(
                "Unknown format '{}'. Supported: table, json",
                other
            ))),
        }
    }
}

/// Effective configuration of one `nlsolve` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlsolveConfig {
    /// Output format
    pub format: OutputFormat,
    /// Tolerances for the `roots` command
    pub multiroot: MultirootConfig,
    /// Broyden damping and restart limits
    pub broyden: BroydenParams,
    /// Least-squares settings for the `fit` command
    pub harness: HarnessConfig,
}

impl NlsolveConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `NLSOLVE_*` environment variable overrides.
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(format) = lookup("NLSOLVE_FORMAT") {
            self.format = format.parse()?;
        }

        if let Some(epsabs) = lookup("NLSOLVE_EPSABS") {
            self.multiroot.epsabs = parse_value("NLSOLVE_EPSABS", &epsabs)?;
        }

        if let Some(max_iterations) = lookup("NLSOLVE_MAX_ITERATIONS") {
            let max_iterations = parse_value("NLSOLVE_MAX_ITERATIONS", &max_iterations)?;
            self.multiroot.max_iterations = max_iterations;
            self.harness.solver.max_iterations = max_iterations;
        }

        if let Some(max_restarts) = lookup("NLSOLVE_MAX_RESTARTS") {
            self.broyden.max_restarts = parse_value("NLSOLVE_MAX_RESTARTS", &max_restarts)?;
        }

        if let Some(xtol) = lookup("NLSOLVE_XTOL") {
            self.harness.solver.xtol = parse_value("NLSOLVE_XTOL", &xtol)?;
        }

        if let Some(scaling) = lookup("NLSOLVE_SCALING") {
            self.harness.solver.scaling = scaling
                .parse::<Scaling>()
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
        }

        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.multiroot.validate() {
            errors.push(format!("multiroot: {}", e));
        }

        if let Err(e) = self.harness.solver.validate() {
            errors.push(format!("harness.solver: {}", e));
        }

        if self.broyden.max_damping_steps == 0 {
            errors.push("broyden.max_damping_steps must be greater than 0".to_string());
        }
        if !(self.broyden.min_step > 0.0 && self.broyden.min_step < 1.0) {
            errors.push(format!(
                "broyden.min_step {} must lie in (0, 1)",
                self.broyden.min_step
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from file (if present) with environment overrides and validate.
    pub fn load_with_env_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_or_default(path)?.with_env_override()?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Parse(format!("{} has invalid value '{}'", key, value)))
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file or environment
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
