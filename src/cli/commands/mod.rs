//! CLI command implementations
//!
//! Handlers are synchronous; each builds a Tokio runtime for the async
//! library calls it makes.

pub mod config;
pub mod holidays;
pub mod ingest;
pub mod ingest_file;
pub mod inspect;

use crate::cli::error::CliError;
use crate::config::LandingConfig;
use crate::database::{LandingStore, MemoryStore, PostgresStore};

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}

/// Postgres from configuration, or an in-memory store for dry runs
pub(crate) async fn open_store(
    config: &LandingConfig,
    dry_run: bool,
) -> Result<Box<dyn LandingStore>, CliError> {
    if dry_run {
        println!("Dry run: loading into memory, the database is not touched");
        return Ok(Box::new(MemoryStore::new()));
    }
    Ok(Box::new(PostgresStore::connect(&config.database).await?))
}
