//! Delimited text reader
//!
//! The header row is the first record. Records may be shorter or longer than
//! the header; shape repair happens in the batch loader. Empty cells load as
//! NULL.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::{TextEncoding, read_text};
use crate::database::Row;
use crate::pipeline::{IngestError, IngestResult};

/// An opened CSV file: raw headers and a lazy row iterator
pub struct CsvTable {
    /// Header cells exactly as written in the file
    pub headers: Vec<String>,
    pub rows: CsvRows,
    pub encoding: TextEncoding,
}

/// Remaining records of a [`CsvTable`]
pub struct CsvRows {
    path: PathBuf,
    records: ::csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
}

impl Iterator for CsvRows {
    type Item = IngestResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(record.map(|r| record_to_row(&r)).map_err(|e| IngestError::Csv {
            path: self.path.clone(),
            message: e.to_string(),
        }))
    }
}

fn record_to_row(record: &::csv::StringRecord) -> Row {
    record
        .iter()
        .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
        .collect()
}

/// Open a CSV file, decoding UTF-8 (with or without BOM) or Latin-1
pub fn open_csv(path: &Path) -> IngestResult<CsvTable> {
    let (text, encoding) = read_text(path)?;
    parse_csv(path, text, encoding)
}

fn parse_csv(path: &Path, text: String, encoding: TextEncoding) -> IngestResult<CsvTable> {
    let reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(text.into_bytes()));
    let mut records = reader.into_records();

    let headers = match records.next() {
        Some(Ok(record)) => record.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        Some(Err(e)) => {
            return Err(IngestError::Csv {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
        None => return Err(IngestError::EmptyInput(path.to_path_buf())),
    };
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::EmptyInput(path.to_path_buf()));
    }

    Ok(CsvTable {
        headers,
        rows: CsvRows {
            path: path.to_path_buf(),
            records,
        },
        encoding,
    })
}

/// Parse CSV text held in memory
pub fn parse_csv_str(text: &str) -> IngestResult<CsvTable> {
    parse_csv(Path::new("<memory>"), text.to_string(), TextEncoding::Utf8)
}
