//! Bolt ride-sharing export: a folder of CSV files, one table each

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::formats::csv::open_csv;
use crate::pipeline::headers::{sanitize_header_strings, table_name_from_file};
use crate::pipeline::{
    IngestResult, LARGE_BATCH_SIZE, Pipeline, SourceAdapter, SourceFile, TableLoad, discover_files,
};

pub const SCHEMA: &str = "s_bolt";

/// Export file names with fixed table names
const KNOWN_FILES: [(&str, &str); 7] = [
    ("rides.csv", "rides"),
    ("transactions.csv", "transactions"),
    ("orders.csv", "orders"),
    ("micromobility_events.csv", "micromobility_events"),
    ("car_rental_events.csv", "car_rental_events"),
    ("profile.csv", "profile"),
    ("login_history.csv", "login_history"),
];

pub struct BoltSource {
    root: PathBuf,
}

impl BoltSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Table for a Bolt export file: a known name, else the cleaned stem
pub fn table_for(file_name: &str) -> String {
    let lowered = file_name.to_lowercase();
    KNOWN_FILES
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, table)| table.to_string())
        .unwrap_or_else(|| table_name_from_file(file_name))
}

#[async_trait(?Send)]
impl SourceAdapter for BoltSource {
    fn name(&self) -> &'static str {
        "bolt"
    }

    fn schema(&self) -> &str {
        SCHEMA
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn expected_inputs(&self) -> String {
        "CSV files".to_string()
    }

    fn default_batch_size(&self) -> usize {
        LARGE_BATCH_SIZE
    }

    fn discover(&self) -> IngestResult<Vec<SourceFile>> {
        discover_files(&self.root, "**/*.csv")
    }

    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()> {
        let table = table_for(&file.file_name());
        let csv = open_csv(&file.path)?;
        let columns = sanitize_header_strings(&csv.headers);
        pipeline
            .load_table(TableLoad::full_refresh(table, columns), csv.rows)
            .await?;
        Ok(())
    }
}
