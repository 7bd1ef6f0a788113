//! Single-file loader for ad hoc uploads
//!
//! Loads one CSV (or JSON document) into a table named after the file. This is
//! the entry point a chat front end calls after saving an upload; it never
//! prompts.

use std::fmt;
use std::path::Path;

use crate::database::LandingStore;
use crate::formats::csv::open_csv;
use crate::formats::json::{extract_records, flatten_records, read_json};
use crate::pipeline::headers::{sanitize_header_strings, table_name_from_file};
use crate::pipeline::{
    DEFAULT_BATCH_SIZE, FileFormat, IngestError, IngestResult, Pipeline, SourceFile, TableLoad,
};

/// Schema used when the caller names none
pub const DEFAULT_SCHEMA: &str = "staging";

/// Outcome of [`ingest_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub file_name: String,
    pub schema: String,
    pub table: String,
    pub rows: u64,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully ingested {} into {}.{} with {} rows.",
            self.file_name, self.schema, self.table, self.rows
        )
    }
}

/// Load one file into `<schema>.<cleaned file stem>`, replacing the table
///
/// # Errors
/// [`IngestError::MissingInput`] when the file does not exist; parse and
/// database errors otherwise.
pub async fn ingest_file(
    path: &Path,
    schema: &str,
    store: &dyn LandingStore,
    batch_size: Option<usize>,
) -> IngestResult<IngestReport> {
    if !path.is_file() {
        return Err(IngestError::MissingInput(path.to_path_buf()));
    }
    let file = SourceFile::new(path.to_path_buf())?;
    let table = table_name_from_file(file.file_name());

    store.ensure_schema(schema).await?;
    let mut pipeline = Pipeline::new(store, schema, batch_size.unwrap_or(DEFAULT_BATCH_SIZE));

    let rows = match file.format {
        FileFormat::Csv => {
            let csv = open_csv(&file.path)?;
            let columns = sanitize_header_strings(&csv.headers);
            pipeline
                .load_table(TableLoad::full_refresh(&table, columns), csv.rows)
                .await?
        }
        FileFormat::Json => {
            let flat = flatten_records(&extract_records(read_json(&file.path)?));
            if flat.is_empty() {
                return Err(IngestError::EmptyInput(file.path));
            }
            pipeline
                .load_table(
                    TableLoad::full_refresh(&table, flat.columns),
                    flat.rows.into_iter().map(Ok),
                )
                .await?
        }
        other => {
            return Err(IngestError::UnsupportedFormat {
                path: file.path,
                expected: format!("a CSV or JSON file, not {}", other),
            });
        }
    };

    Ok(IngestReport {
        file_name: file.file_name(),
        schema: schema.to_string(),
        table,
        rows,
    })
}
