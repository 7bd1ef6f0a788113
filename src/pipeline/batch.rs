//! Buffered, committed row loading
//!
//! Rows are repaired to the table width, buffered, and written in batches. Each
//! flush is committed on its own, so an interrupted load keeps every batch
//! flushed before the interruption.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::database::{DatabaseResult, LandingStore, Row, TableTarget};

/// Default rows per batch for most sources
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Rows per batch for the large, narrow exports (health records, rides)
pub const LARGE_BATCH_SIZE: usize = 5000;

/// Pad with NULL or truncate so the row is exactly `width` values wide
pub fn repair_row(mut row: Row, width: usize) -> Row {
    row.resize(width, None);
    row
}

/// Maps rows in file column order onto a table's column order
///
/// Used when appending into a table whose columns were fixed by an earlier file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAlignment {
    /// For every table column, the index of the source column feeding it
    sources: Vec<Option<usize>>,
    /// Source columns the table has no place for
    pub dropped: Vec<String>,
}

impl ColumnAlignment {
    /// `None` when no reordering is needed
    pub fn between(source: &[String], table: &[String]) -> Option<Self> {
        if source == table {
            return None;
        }
        let sources = table
            .iter()
            .map(|t| source.iter().position(|s| s == t))
            .collect();
        let dropped = source
            .iter()
            .filter(|s| !table.contains(s))
            .cloned()
            .collect();
        Some(Self { sources, dropped })
    }

    pub fn apply(&self, row: &Row) -> Row {
        self.sources
            .iter()
            .map(|idx| idx.and_then(|i| row.get(i).cloned().flatten()))
            .collect()
    }
}

/// Row progress shown on stderr while a table loads
pub struct LoadProgress {
    bar: ProgressBar,
}

impl LoadProgress {
    /// Progress for one table; a bar when the total is known, a spinner otherwise
    pub fn new(label: &str, total: Option<u64>) -> Self {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {pos} rows | {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Progress that never draws
    pub fn hidden() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::hidden());
        Self { bar }
    }

    pub fn inc(&self, rows: u64) {
        self.bar.inc(rows);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Buffers rows for one table and writes them in committed batches
pub struct BatchLoader<'a> {
    store: &'a dyn LandingStore,
    target: TableTarget,
    columns: Vec<String>,
    batch_size: usize,
    buffer: Vec<Row>,
    written: u64,
    progress: LoadProgress,
}

impl<'a> BatchLoader<'a> {
    /// `batch_size` of zero is treated as one
    pub fn new(
        store: &'a dyn LandingStore,
        target: TableTarget,
        columns: Vec<String>,
        batch_size: usize,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            target,
            columns,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            written: 0,
            progress: LoadProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: LoadProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows committed so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Repair and buffer a row, flushing when the batch is full
    pub async fn push(&mut self, row: Row) -> DatabaseResult<()> {
        self.buffer.push(repair_row(row, self.columns.len()));
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Write and commit whatever is buffered
    pub async fn flush(&mut self) -> DatabaseResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(&mut self.buffer);
        let count = self
            .store
            .insert_batch(&self.target, &self.columns, &rows)
            .await?;
        self.written += count;
        self.progress.inc(count);
        tracing::debug!("Committed {} rows into {}", count, self.target);
        Ok(())
    }

    /// Flush the remainder and return the total rows written
    pub async fn finish(mut self) -> DatabaseResult<u64> {
        self.flush().await?;
        self.progress.finish();
        Ok(self.written)
    }
}
