//! Apple Health `export.xml`
//!
//! Streams `<Record>` elements into one `records` table. Nested metadata
//! entries are not kept; `metadata` is always `{}`.

use async_trait::async_trait;
use chrono::DateTime;
use std::cell::Cell;
use std::path::{Path, PathBuf};

use crate::database::Row;
use crate::formats::xml::{Attributes, ElementAttributes, count_elements};
use crate::pipeline::{
    Estimate, IngestResult, LARGE_BATCH_SIZE, Pipeline, SourceAdapter, SourceFile, TableLoad,
    Throughput,
};

pub const SCHEMA: &str = "s_apple_health";
pub const TABLE: &str = "records";

/// Accepted spellings of the export file name
pub const EXPORT_FILE_NAMES: [&str; 2] = ["export.xml", "Export.xml"];

/// Landing columns, paired with the `Record` attribute each one reads
pub const COLUMNS: [(&str, &str); 9] = [
    ("type", "type"),
    ("source_name", "sourceName"),
    ("source_version", "sourceVersion"),
    ("unit", "unit"),
    ("creation_date", "creationDate"),
    ("start_date", "startDate"),
    ("end_date", "endDate"),
    ("value", "value"),
    ("device", "device"),
];

const DATE_COLUMNS: [&str; 3] = ["creationDate", "startDate", "endDate"];

/// Format of every date attribute in the export, e.g. `2023-10-25 07:12:05 +0200`
pub const HEALTH_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

pub struct AppleHealthSource {
    root: PathBuf,
    record_count: Cell<Option<u64>>,
}

impl AppleHealthSource {
    /// `path` may be the export file itself or the directory holding it
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = locate_export(&path).unwrap_or(path);
        Self {
            root,
            record_count: Cell::new(None),
        }
    }
}

/// Resolve the export file, accepting either capitalisation
pub fn locate_export(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let dir = if path.is_dir() { path } else { path.parent()? };
    EXPORT_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Normalise an export date to RFC 3339; unparsable input is `None`
pub fn parse_health_date(raw: &str) -> Option<String> {
    DateTime::parse_from_str(raw.trim(), HEALTH_DATE_FORMAT)
        .ok()
        .map(|dt| dt.to_rfc3339())
}

/// Landing row for one `Record` element
pub fn record_row(attrs: &Attributes) -> Row {
    let mut row: Row = COLUMNS
        .iter()
        .map(|(_, attr)| {
            let value = attrs.get(*attr)?;
            if DATE_COLUMNS.contains(attr) {
                parse_health_date(value)
            } else {
                Some(value.clone())
            }
        })
        .collect();
    row.push(Some("{}".to_string()));
    row
}

fn column_names() -> Vec<String> {
    COLUMNS
        .iter()
        .map(|(c, _)| c.to_string())
        .chain(std::iter::once("metadata".to_string()))
        .collect()
}

#[async_trait(?Send)]
impl SourceAdapter for AppleHealthSource {
    fn name(&self) -> &'static str {
        "apple_health"
    }

    fn schema(&self) -> &str {
        SCHEMA
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn expected_inputs(&self) -> String {
        EXPORT_FILE_NAMES.join(" or ")
    }

    fn default_batch_size(&self) -> usize {
        LARGE_BATCH_SIZE
    }

    fn default_answer(&self) -> bool {
        true
    }

    fn discover(&self) -> IngestResult<Vec<SourceFile>> {
        match locate_export(&self.root) {
            Some(path) => Ok(vec![SourceFile::new(path)?]),
            None => Ok(Vec::new()),
        }
    }

    fn estimate(&self, files: &[SourceFile]) -> IngestResult<Estimate> {
        println!("Pre-scanning file to estimate records...");
        let mut total = 0;
        for file in files {
            total += count_elements(&file.path, "Record")?;
        }
        self.record_count.set(Some(total));
        Ok(Estimate::from_files(files, Throughput::HEALTH_RECORDS).with_records(total))
    }

    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()> {
        let mut load = TableLoad::full_refresh(TABLE, column_names());
        if let Some(count) = self.record_count.get() {
            load = load.with_expected_rows(count);
        }
        let rows = ElementAttributes::open(&file.path, "Record")?
            .map(|attrs| attrs.map(|a| record_row(&a)));
        pipeline.load_table(load, rows).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_health_date() {
        assert_eq!(
            parse_health_date("2023-10-25 07:12:05 +0200").as_deref(),
            Some("2023-10-25T07:12:05+02:00")
        );
        assert_eq!(parse_health_date("yesterday"), None);
    }

    #[test]
    fn test_record_row_shape() {
        let mut attrs = Attributes::new();
        attrs.insert("type".into(), "HKQuantityTypeIdentifierStepCount".into());
        attrs.insert("startDate".into(), "2024-01-01 10:00:00 +0100".into());
        attrs.insert("endDate".into(), "garbage".into());
        attrs.insert("value".into(), "120".into());

        let row = record_row(&attrs);
        assert_eq!(row.len(), column_names().len());
        assert_eq!(row[0].as_deref(), Some("HKQuantityTypeIdentifierStepCount"));
        assert_eq!(row[1], None);
        assert_eq!(row[5].as_deref(), Some("2024-01-01T10:00:00+01:00"));
        assert_eq!(row[6], None);
        assert_eq!(row[7].as_deref(), Some("120"));
        assert_eq!(row[9].as_deref(), Some("{}"));
    }

    #[test]
    fn test_locate_export_capitalised() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Export.xml"), "<HealthData/>").unwrap();

        let from_dir = locate_export(dir.path()).unwrap();
        assert!(from_dir.ends_with("Export.xml"));

        let from_missing_file = locate_export(&dir.path().join("export.xml")).unwrap();
        assert!(from_missing_file.ends_with("Export.xml"));
    }
}
