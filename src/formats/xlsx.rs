//! Spreadsheet reader
//!
//! Every sheet of a workbook becomes its own table. Exports often start with a
//! title block, so the header row is the first row with at least two filled
//! cells, or failing that the first row with any filled cell.

use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;

use crate::database::Row;
use crate::pipeline::{IngestError, IngestResult};

/// One worksheet with its located header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub sheet: String,
    /// Header cells; `None` for blank header cells
    pub headers: Vec<Option<String>>,
    /// Rows after the header, fully empty rows removed
    pub rows: Vec<Row>,
}

/// All sheets of a workbook, in workbook order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workbook {
    /// Names of every sheet, including ones that produced no table
    pub sheet_names: Vec<String>,
    pub tables: Vec<SheetTable>,
}

/// Read every worksheet of an Excel file
///
/// Sheets without any filled cell are skipped with a log line.
pub fn read_workbook(path: &Path) -> IngestResult<Workbook> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut tables = Vec::new();

    for sheet in &sheet_names {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| IngestError::Workbook {
                path: path.to_path_buf(),
                message: format!("sheet '{}': {}", sheet, e),
            })?;

        let grid: Vec<Row> = range
            .rows()
            .map(|cells| cells.iter().map(cell_text).collect())
            .collect();

        match sheet_from_grid(sheet, grid) {
            Some(table) => tables.push(table),
            None => tracing::info!("Skipping empty sheet: {}", sheet),
        }
    }

    Ok(Workbook {
        sheet_names,
        tables,
    })
}

/// Locate the header and split a raw cell grid into a [`SheetTable`]
pub fn sheet_from_grid(sheet: &str, grid: Vec<Row>) -> Option<SheetTable> {
    let header_idx = header_row_index(&grid)?;
    let mut rows = grid.into_iter().skip(header_idx);
    let headers = rows.next()?;
    let rows = rows
        .filter(|row| row.iter().any(Option::is_some))
        .collect();
    Some(SheetTable {
        sheet: sheet.to_string(),
        headers,
        rows,
    })
}

/// First row with two or more filled cells, else the first row with one
pub fn header_row_index(grid: &[Row]) -> Option<usize> {
    let filled = |row: &Row| row.iter().filter(|c| c.is_some()).count();
    grid.iter()
        .position(|row| filled(row) >= 2)
        .or_else(|| grid.iter().position(|row| filled(row) >= 1))
}

/// Text form of a cell; empty and whitespace-only cells are `None`
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR({:?})", e),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.time() == chrono::NaiveTime::MIN => {
                ndt.format("%Y-%m-%d").to_string()
            }
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Whole numbers without a trailing `.0`
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
