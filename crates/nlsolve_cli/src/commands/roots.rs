//! Roots command implementation
//!
//! Solves one of the square test systems with a chosen multiroot algorithm.

use nalgebra::DVector;
use nlsolve_core::math::solvers::{FSolver, FSolverType, FdfSolver, FdfSolverType, MultirootResult};
use nlsolve_core::problems::systems::TestSystem;
use serde::Serialize;
use tracing::info;

use crate::config::{NlsolveConfig, OutputFormat};
use crate::{CliError, Result};

/// Algorithm selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    F(FSolverType),
    Fdf(FdfSolverType),
}

impl Algorithm {
    fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "newton" => Ok(Algorithm::Fdf(FdfSolverType::Newton)),
            "gnewton" => Ok(Algorithm::Fdf(FdfSolverType::GNewton)),
            "broyden" => Ok(Algorithm::F(FSolverType::Broyden)),
            "dnewton" => Ok(Algorithm::F(FSolverType::DNewton)),
            other => Err(CliError::InvalidArgument(format!(
                "Unknown solver: {}. Supported: newton, gnewton, broyden, dnewton",
                other
            ))),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Algorithm::F(t) => t.name(),
            Algorithm::Fdf(t) => t.name(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RootsOutput<'a> {
    system: &'a str,
    solver: &'a str,
    #[serde(flatten)]
    result: MultirootResult,
}

fn solve(
    config: &NlsolveConfig,
    algorithm: Algorithm,
    system: TestSystem,
) -> Result<MultirootResult> {
    let x0 = DVector::from_vec(system.start());
    let result = match algorithm {
        Algorithm::F(solver_type) => {
            let mut solver =
                FSolver::new(solver_type, x0.len())?.with_broyden_params(config.broyden);
            solver.solve(&system, &x0, &config.multiroot)?
        }
        Algorithm::Fdf(solver_type) => {
            let mut solver = FdfSolver::new(solver_type, x0.len())?;
            solver.solve(&system, &x0, &config.multiroot)?
        }
    };
    Ok(result)
}

/// Run the roots command
pub fn run(config: &NlsolveConfig, solver: &str, system: &str) -> Result<()> {
    let algorithm = Algorithm::parse(solver)?;
    let system: TestSystem = system.parse()?;

    info!("Starting root finding...");
    info!("  System: {}", system);
    info!("  Solver: {}", algorithm.name());

    let result = solve(config, algorithm, system)?;

    match config.format {
        OutputFormat::Json => {
            let output = RootsOutput {
                system: system.name(),
                solver: algorithm.name(),
                result,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("system      {}", system);
            println!("solver      {}", algorithm.name());
            println!("iterations  {}", result.iterations);
            println!("|f|         {:.6e}", result.residual_norm);
            for (i, (xi, fi)) in result.x.iter().zip(&result.f).enumerate() {
                println!("x[{}] = {:>22.15e}   f[{}] = {:>10.3e}", i, xi, i, fi);
            }
        }
    }

    info!("Root finding complete");
    Ok(())
}
