//! CLI-specific error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::database::DatabaseError;
use crate::holidays::HolidayError;
use crate::pipeline::IngestError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("{0}")]
    Holidays(#[from] HolidayError),

    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit status for this error; 130 follows the SIGINT convention
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Ingest(IngestError::Interrupted) => 130,
            _ => 1,
        }
    }
}
