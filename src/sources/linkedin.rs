//! LinkedIn exports
//!
//! Two export kinds share one schema: creator insight workbooks under
//! `basic/` and the full data archive CSVs under `complete/`. Table names
//! carry the kind as a prefix so the two never collide. Names are claimed
//! through the run's [`Pipeline`] so long names that share a prefix stay
//! distinct within the identifier limit.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::formats::csv::open_csv;
use crate::formats::xlsx::read_workbook;
use crate::pipeline::headers::{
    MAX_IDENTIFIER_BYTES, clean_header, sanitize_header_strings, sanitize_headers,
    table_name_from_file, truncate_identifier,
};
use crate::pipeline::{
    FileFormat, IngestResult, Pipeline, SourceAdapter, SourceFile, TableLoad, discover_files,
};

pub const SCHEMA: &str = "s_linkedin";
pub const BASIC_DIR: &str = "basic";
pub const COMPLETE_DIR: &str = "complete";

pub struct LinkedinSource {
    root: PathBuf,
}

impl LinkedinSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn basic_path(&self) -> PathBuf {
        self.root.join(BASIC_DIR)
    }

    fn complete_path(&self) -> PathBuf {
        self.root.join(COMPLETE_DIR)
    }
}

/// `<prefix>_<stem>` for an export file
pub fn base_table_name(prefix: &str, file_name: &str) -> String {
    truncate_identifier(
        &format!("{}_{}", prefix, table_name_from_file(file_name)),
        MAX_IDENTIFIER_BYTES,
    )
}

/// Table for one sheet; the sheet name is appended only for multi-sheet books
pub fn sheet_table_name(base: &str, sheet: &str, sheet_count: usize) -> String {
    if sheet_count > 1 {
        let suffix = clean_header(sheet);
        if suffix.is_empty() {
            base.to_string()
        } else {
            truncate_identifier(&format!("{}_{}", base, suffix), MAX_IDENTIFIER_BYTES)
        }
    } else {
        base.to_string()
    }
}

#[async_trait(?Send)]
impl SourceAdapter for LinkedinSource {
    fn name(&self) -> &'static str {
        "linkedin"
    }

    fn schema(&self) -> &str {
        SCHEMA
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn expected_inputs(&self) -> String {
        format!(
            "{} (.xlsx files) or {} (.csv files)",
            self.basic_path().display(),
            self.complete_path().display()
        )
    }

    fn discover(&self) -> IngestResult<Vec<SourceFile>> {
        let mut files = Vec::new();
        let basic = self.basic_path();
        if basic.is_dir() {
            files.extend(discover_files(&basic, "**/*.xlsx")?);
        }
        let complete = self.complete_path();
        if complete.is_dir() {
            files.extend(discover_files(&complete, "**/*.csv")?);
        }
        Ok(files)
    }

    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()> {
        match file.format {
            FileFormat::Xlsx => {
                let base = base_table_name(BASIC_DIR, &file.file_name());
                let workbook = read_workbook(&file.path)?;
                let sheet_count = workbook.sheet_names.len();
                for sheet in workbook.tables {
                    if sheet.headers.iter().all(Option::is_none) {
                        tracing::info!("Skipping sheet with no headers: {}", sheet.sheet);
                        continue;
                    }
                    let table =
                        pipeline.unique_table_name(&sheet_table_name(&base, &sheet.sheet, sheet_count));
                    let columns = sanitize_headers(&sheet.headers);
                    let rows = sheet.rows.into_iter().map(Ok);
                    let written = pipeline
                        .load_table(TableLoad::full_refresh(&table, columns), rows)
                        .await?;
                    println!("  Ingested sheet '{}' into table '{}' ({} rows)", sheet.sheet, table, written);
                }
            }
            _ => {
                let table = pipeline.unique_table_name(&base_table_name(COMPLETE_DIR, &file.file_name()));
                let csv = open_csv(&file.path)?;
                let columns = sanitize_header_strings(&csv.headers);
                pipeline
                    .load_table(TableLoad::full_refresh(table, columns), csv.rows)
                    .await?;
            }
        }
        Ok(())
    }
}
