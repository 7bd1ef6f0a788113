//! Ingestion run statistics

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Most errors kept verbatim in a report
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Statistics from one ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of files loaded without error
    pub files_processed: usize,
    /// Number of files that failed and were skipped
    pub files_failed: usize,
    /// Rows written, per table name
    pub table_rows: BTreeMap<String, u64>,
    /// Total bytes of input read
    pub bytes_processed: u64,
    /// Number of errors encountered
    pub errors_count: usize,
    /// List of errors (limited to the first 100)
    pub errors: Vec<String>,
    /// Duration of the ingestion
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error);
        }
    }

    /// Count rows against a table
    pub fn add_rows(&mut self, table: &str, rows: u64) {
        *self.table_rows.entry(table.to_string()).or_insert(0) += rows;
    }

    /// Rows written across all tables
    pub fn records_ingested(&self) -> u64 {
        self.table_rows.values().sum()
    }

    /// Get rows per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_ingested() as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }

    /// Final row-count report, one line per table
    pub fn report(&self, schema: &str) -> String {
        let mut out = String::new();
        let width = self
            .table_rows
            .keys()
            .map(|t| t.len() + schema.len() + 1)
            .max()
            .unwrap_or(0);
        for (table, rows) in &self.table_rows {
            let name = format!("{}.{}", schema, table);
            out.push_str(&format!("  {:width$}  {:>10} rows\n", name, rows, width = width));
        }
        out.push_str(&format!(
            "Loaded {} rows into {} tables from {} files in {} ({:.0} rows/s)",
            self.records_ingested(),
            self.table_rows.len(),
            self.files_processed,
            self.duration_string(),
            self.throughput()
        ));
        if self.files_failed > 0 {
            out.push_str(&format!("\n{} files failed:", self.files_failed));
            for error in &self.errors {
                out.push_str(&format!("\n  - {}", error));
            }
            if self.errors_count > self.errors.len() {
                out.push_str(&format!(
                    "\n  ... and {} more",
                    self.errors_count - self.errors.len()
                ));
            }
        }
        out
    }
}
