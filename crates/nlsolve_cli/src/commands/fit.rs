//! Fit command implementation
//!
//! Runs the reference least-squares problems through the fitting harness
//! and reports each result against its known minimum.

use nlsolve_core::math::solvers::Scaling;
use nlsolve_core::problems::{all_problems, problem_by_name, run_all, FitReport, FittingProblem};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{NlsolveConfig, OutputFormat};
use crate::{CliError, Result};

/// Per-problem outcome as printed by the command.
#[derive(Debug, Serialize)]
struct FitOutcome {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<FitReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn select_problems(name: &str) -> Result<Vec<FittingProblem>> {
    if name.eq_ignore_ascii_case("all") {
        return Ok(all_problems());
    }
    problem_by_name(&name.to_lowercase())
        .map(|problem| vec![problem])
        .ok_or_else(|| {
            CliError::InvalidArgument(format!(
                "Unknown problem: {}. Supported: bard, penalty2, all",
                name
            ))
        })
}

/// Run the fit command
pub fn run(config: &NlsolveConfig, problem: &str, scaling: Option<&str>) -> Result<()> {
    let mut harness = config.harness;
    if let Some(scaling) = scaling {
        harness.solver.scaling = scaling.parse::<Scaling>()?;
    }
    harness.solver.validate()?;

    let mut problems = select_problems(problem)?;
    info!("Starting fits...");
    info!("  Problems: {}", problems.len());
    info!("  Scaling: {}", harness.solver.scaling.name());

    let results = run_all(&mut problems, &harness);
    let outcomes: Vec<FitOutcome> = problems
        .iter()
        .zip(results)
        .map(|(problem, result)| match result {
            Ok(report) => FitOutcome {
                name: problem.name.to_string(),
                report: Some(report),
                error: None,
            },
            Err(err) => {
                warn!("{} failed: {}", problem.name, err);
                FitOutcome {
                    name: problem.name.to_string(),
                    report: None,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect();

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        OutputFormat::Table => print_table(&outcomes),
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    if failed > 0 {
        return Err(CliError::FitsFailed {
            failed,
            total: outcomes.len(),
        });
    }
    info!("Fits complete");
    Ok(())
}

fn print_table(outcomes: &[FitOutcome]) {
    println!(
        "{:<10} {:>22} {:>6} {:>6} {:>10}  x",
        "problem", "sumsq", "iter", "tries", "reason"
    );
    for outcome in outcomes {
        match (&outcome.report, &outcome.error) {
            (Some(report), _) => {
                let x: Vec<String> = report.x.iter().map(|xi| format!("{:.12e}", xi)).collect();
                println!(
                    "{:<10} {:>22.15e} {:>6} {:>6} {:>10}  [{}]",
                    report.name,
                    report.sumsq,
                    report.iterations,
                    report.tries,
                    report.reason.name(),
                    x.join(", ")
                );
            }
            (None, Some(error)) => println!("{:<10} FAILED: {}", outcome.name, error),
            (None, None) => {}
        }
    }
}
