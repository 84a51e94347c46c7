//! Check command implementation
//!
//! Prints the configuration after file loading, environment overrides and
//! validation.

use tracing::info;

use crate::config::{NlsolveConfig, OutputFormat};
use crate::Result;

/// Run the check command
pub fn run(config: &NlsolveConfig) -> Result<()> {
    info!("Configuration is valid");

    match config.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Table => {
            println!("{}", toml::to_string_pretty(config)?);
        }
    }
    Ok(())
}
