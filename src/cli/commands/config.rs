//! `landing config show|sample`

use std::path::Path;

use crate::cli::error::CliError;
use crate::config::{CONFIG_FILENAME, LandingConfig};

/// Print the resolved configuration with the password masked
pub fn handle_config_show(config_dir: &Path) -> Result<(), CliError> {
    let config = LandingConfig::load(config_dir)?;
    println!("# Resolved from {}", config_dir.join(CONFIG_FILENAME).display());
    println!("# Connection: {}", config.database.connection_string_masked());
    println!();
    println!("{}", config.display_masked()?);
    Ok(())
}

/// Print a commented sample `landing.toml`
pub fn handle_config_sample() -> Result<(), CliError> {
    println!("{}", LandingConfig::sample_config());
    Ok(())
}
