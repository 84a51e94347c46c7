//! nlsolve CLI - Root Finding and Reference Fits from the Command Line
//!
//! Operational entry point for the `nlsolve_core` library.
//!
//! # Commands
//!
//! - `nlsolve fit [--problem bard|penalty2|all] [--scaling more]` - Run reference least-squares fits
//! - `nlsolve roots [--solver newton] [--system rosenbrock]` - Solve a square test system
//! - `nlsolve check` - Print the effective configuration
//!
//! Logging goes through `tracing`; set `RUST_LOG=debug` to see every iteration.

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use config::{NlsolveConfig, OutputFormat};

/// Multidimensional root finding and nonlinear least squares
#[derive(Parser)]
#[command(name = "nlsolve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "nlsolve.toml")]
    config: String,

    /// Output format (table, json); overrides the configuration file
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit reference least-squares problems and check them against known minima
    Fit {
        /// Problem name (bard, penalty2) or "all"
        #[arg(short, long, default_value = "all")]
        problem: String,

        /// Trust-region scaling (levenberg, marquardt, more)
        #[arg(short, long)]
        scaling: Option<String>,
    },

    /// Solve a square test system f(x) = 0
    Roots {
        /// Algorithm (newton, gnewton, broyden, dnewton)
        #[arg(long, default_value = "newton")]
        solver: String,

        /// Test system (rosenbrock, powell, roth)
        #[arg(long, default_value = "rosenbrock")]
        system: String,
    },

    /// Print the effective configuration
    Check,
}

fn main() -> Result<()> {
    // Initialise tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let mut config = NlsolveConfig::load_with_env_and_validate(Path::new(&cli.config))?;
    if let Some(format) = cli.format.as_deref() {
        config.format = format.parse::<OutputFormat>()?;
    }

    match cli.command {
        Commands::Fit { problem, scaling } => {
            commands::fit::run(&config, &problem, scaling.as_deref())
        }
        Commands::Roots { solver, system } => commands::roots::run(&config, &solver, &system),
        Commands::Check => commands::check::run(&config),
    }
}
