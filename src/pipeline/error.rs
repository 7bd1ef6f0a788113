//! Errors raised while ingesting a source

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::database::DatabaseError;

/// Error type for ingestion runs
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Configured input file or directory does not exist
    #[error("Input not found: {0}")]
    MissingInput(PathBuf),

    /// Input directory exists but holds nothing this source reads
    #[error("No {expected} found under {root}")]
    NoInputFiles { root: PathBuf, expected: String },

    /// File extension is not one this loader reads
    #[error("Unsupported file {path}: expected {expected}")]
    UnsupportedFormat { path: PathBuf, expected: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to parse CSV {path}: {message}")]
    Csv { path: PathBuf, message: String },

    #[error("Failed to parse JSON {path}: {message}")]
    Json { path: PathBuf, message: String },

    #[error("Failed to parse XML {path}: {message}")]
    Xml { path: PathBuf, message: String },

    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// File has no usable header row
    #[error("{0} has no header row")]
    EmptyInput(PathBuf),

    #[error("Table {0} has no columns")]
    NoColumns(String),

    /// User declined or interrupted the confirmation prompt
    #[error("Ingestion aborted by user")]
    Aborted,

    /// Ctrl-C during the load; committed batches are kept
    #[error("Ingestion interrupted; batches committed so far are kept")]
    Interrupted,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Whether the run should stop instead of moving to the next file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::MissingInput(_)
                | IngestError::NoInputFiles { .. }
                | IngestError::Aborted
                | IngestError::Interrupted
                | IngestError::Config(_)
                | IngestError::Database(DatabaseError::ConnectionFailed(_))
        )
    }
}

/// Result type for ingestion
pub type IngestResult<T> = Result<T, IngestError>;
