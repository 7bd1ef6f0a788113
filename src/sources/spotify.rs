//! Spotify privacy export: JSON documents and the odd CSV

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::formats::csv::open_csv;
use crate::formats::json::{extract_records, flatten_records, read_json};
use crate::pipeline::headers::{sanitize_header_strings, table_name_from_file};
use crate::pipeline::{
    FileFormat, IngestResult, Pipeline, SourceAdapter, SourceFile, TableLoad, discover_all,
};

pub const SCHEMA: &str = "s_spotify";

pub struct SpotifySource {
    root: PathBuf,
}

impl SpotifySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait(?Send)]
impl SourceAdapter for SpotifySource {
    fn name(&self) -> &'static str {
        "spotify"
    }

    fn schema(&self) -> &str {
        SCHEMA
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn expected_inputs(&self) -> String {
        ".json or .csv files".to_string()
    }

    fn discover(&self) -> IngestResult<Vec<SourceFile>> {
        discover_all(&self.root, &["**/*.json", "**/*.csv"])
    }

    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()> {
        let table = table_name_from_file(file.file_name());
        let written = match file.format {
            FileFormat::Json => {
                let records = extract_records(read_json(&file.path)?);
                let flat = flatten_records(&records);
                if flat.is_empty() {
                    tracing::info!("No records found in {}", file.path.display());
                    return Ok(());
                }
                pipeline
                    .load_table(
                        TableLoad::full_refresh(&table, flat.columns),
                        flat.rows.into_iter().map(Ok),
                    )
                    .await?
            }
            _ => {
                let csv = open_csv(&file.path)?;
                let columns = sanitize_header_strings(&csv.headers);
                pipeline
                    .load_table(TableLoad::full_refresh(&table, columns), csv.rows)
                    .await?
            }
        };
        println!("  Ingested {} records into table '{}'", written, table);
        Ok(())
    }
}
