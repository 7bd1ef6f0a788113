//! Tabular landing pipeline
//!
//! Turns source files into TEXT-typed landing tables. A run is driven by
//! [`run_source`]:
//!
//! 1. the source adapter discovers its input files
//! 2. an [`Estimate`] is printed and the user confirms
//! 3. the landing schema is ensured
//! 4. each file is loaded through [`Pipeline::load_table`]; a failing file is
//!    reported and the run moves on
//!
//! # Example
//!
//! ```rust,ignore
//! use landing_loader::database::MemoryStore;
//! use landing_loader::pipeline::{LoadOptions, run_source};
//! use landing_loader::sources::bolt::BoltSource;
//!
//! let store = MemoryStore::new();
//! let source = BoltSource::new("/data/bolt");
//! let stats = run_source(&source, &store, &LoadOptions::assume_yes()).await?;
//! println!("{}", stats.report("s_bolt"));
//! ```

pub mod batch;
pub mod discover;
pub mod error;
pub mod headers;
pub mod preflight;
pub mod stats;

pub use batch::{BatchLoader, ColumnAlignment, DEFAULT_BATCH_SIZE, LARGE_BATCH_SIZE, repair_row};
pub use discover::{FileFormat, SourceFile, discover_all, discover_files};
pub use error::{IngestError, IngestResult};
pub use preflight::{Estimate, Throughput};
pub use stats::IngestStats;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::Instrument;

use crate::database::{LandingStore, LoadPolicy, Row, TableTarget};
use batch::LoadProgress;

/// Per-run switches
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the adapter's batch size
    pub batch_size: Option<usize>,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    /// Drop the adapter's append tables before loading
    pub reset: bool,
    /// Draw row progress on stderr
    pub show_progress: bool,
}

impl LoadOptions {
    /// No prompt, no progress bars
    pub fn assume_yes() -> Self {
        Self {
            assume_yes: true,
            ..Self::default()
        }
    }
}

/// One table to write
#[derive(Debug, Clone)]
pub struct TableLoad {
    pub table: String,
    /// Data columns, in source row order
    pub columns: Vec<String>,
    pub policy: LoadPolicy,
    /// Constant-valued columns appended after the data columns
    pub provenance: Vec<(String, String)>,
    /// Known row count, for a bounded progress bar
    pub expected_rows: Option<u64>,
}

impl TableLoad {
    pub fn full_refresh(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            policy: LoadPolicy::FullRefresh,
            provenance: Vec::new(),
            expected_rows: None,
        }
    }

    pub fn append(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            policy: LoadPolicy::IncrementalAppend,
            ..Self::full_refresh(table, columns)
        }
    }

    pub fn with_provenance(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.provenance.push((column.into(), value.into()));
        self
    }

    pub fn with_expected_rows(mut self, rows: u64) -> Self {
        self.expected_rows = Some(rows);
        self
    }
}

/// Shared load step used by every source adapter
///
/// Holds the store, the landing schema and the run's statistics.
pub struct Pipeline<'a> {
    store: &'a dyn LandingStore,
    schema: String,
    batch_size: usize,
    show_progress: bool,
    stats: IngestStats,
    table_names: headers::UniqueNames,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn LandingStore, schema: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            schema: schema.into(),
            batch_size: batch_size.max(1),
            show_progress: false,
            stats: IngestStats::new(),
            table_names: headers::UniqueNames::new(),
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn store(&self) -> &'a dyn LandingStore {
        self.store
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn target(&self, table: &str) -> TableTarget {
        TableTarget::new(self.schema.clone(), table)
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut IngestStats {
        &mut self.stats
    }

    pub fn into_stats(self) -> IngestStats {
        self.stats
    }

    /// A table name no earlier caller in this run has been given
    ///
    /// For adapters that derive one table per file or sheet, where two long
    /// names could otherwise collapse into the same Postgres identifier.
    pub fn unique_table_name(&mut self, name: &str) -> String {
        let claimed = self.table_names.claim(name);
        if claimed != name {
            tracing::warn!("Table name {} is taken or too long; using {}", name, claimed);
        }
        claimed
    }

    /// Materialize a table under its policy and stream rows into it
    ///
    /// Each row is padded or truncated to the data column count, then the
    /// provenance values are appended. When appending into a table whose
    /// columns differ, values are matched by column name; unknown columns are
    /// dropped with a warning.
    ///
    /// # Returns
    /// Rows written
    pub async fn load_table<I>(&mut self, load: TableLoad, rows: I) -> IngestResult<u64>
    where
        I: IntoIterator<Item = IngestResult<Row>>,
    {
        if load.columns.is_empty() {
            return Err(IngestError::NoColumns(load.table));
        }

        let data_width = load.columns.len();
        let mut requested: Vec<String> = load.columns.clone();
        requested.extend(load.provenance.iter().map(|(c, _)| c.clone()));
        let requested = headers::sanitize_header_strings(&requested);
        let provenance_values: Vec<Option<String>> = load
            .provenance
            .iter()
            .map(|(_, v)| Some(v.clone()))
            .collect();

        let target = self.target(&load.table);
        let effective = self
            .store
            .materialize(&target, &requested, load.policy)
            .await?;

        let alignment = ColumnAlignment::between(&requested, &effective);
        if let Some(alignment) = &alignment
            && !alignment.dropped.is_empty()
        {
            tracing::warn!(
                "{} has no columns {:?}; those values are dropped",
                target,
                alignment.dropped
            );
        }

        let progress = if self.show_progress {
            LoadProgress::new(&target.to_string(), load.expected_rows)
        } else {
            LoadProgress::hidden()
        };
        let mut loader = BatchLoader::new(self.store, target.clone(), effective, self.batch_size)
            .with_progress(progress);

        for row in rows {
            let mut row = repair_row(row?, data_width);
            row.extend(provenance_values.iter().cloned());
            let row = match &alignment {
                Some(alignment) => alignment.apply(&row),
                None => row,
            };
            loader.push(row).await?;
        }

        let written = loader.finish().await?;
        self.stats.add_rows(&load.table, written);
        tracing::info!("Loaded {} rows into {} ({})", written, target, load.policy);
        Ok(written)
    }
}

/// A source of landing data: one export format from one application
#[async_trait(?Send)]
pub trait SourceAdapter {
    /// Short name used in logs and on the command line
    fn name(&self) -> &'static str;

    /// Landing schema written by this adapter
    fn schema(&self) -> &str;

    /// Configured input location
    fn root(&self) -> &Path;

    /// What the adapter looks for, for the "nothing found" diagnostic
    fn expected_inputs(&self) -> String;

    fn default_batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }

    /// Answer assumed when the user just presses enter
    fn default_answer(&self) -> bool {
        false
    }

    /// Input files in load order
    fn discover(&self) -> IngestResult<Vec<SourceFile>>;

    fn estimate(&self, files: &[SourceFile]) -> IngestResult<Estimate> {
        Ok(Estimate::from_files(files, Throughput::FILE_COLLECTION))
    }

    /// Runs once after the schema exists and before the first file
    async fn prepare(&self, _pipeline: &mut Pipeline<'_>, _options: &LoadOptions) -> IngestResult<()> {
        Ok(())
    }

    /// Load one discovered file
    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()>;
}

/// Run one adapter end to end
///
/// Missing input, an empty input directory, a refused prompt and an
/// unreachable database end the run with an error. Any other per-file failure
/// is logged, counted in the returned stats, and the next file is loaded.
/// Ctrl-C at any point stops the run; see [`run_source_until`].
pub async fn run_source(
    adapter: &dyn SourceAdapter,
    store: &dyn LandingStore,
    options: &LoadOptions,
) -> IngestResult<IngestStats> {
    run_source_until(adapter, store, options, ctrl_c()).await
}

/// Resolves on SIGINT; never resolves when the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// [`run_source`] with an explicit interrupt
///
/// The same `interrupt` is watched from discovery to the last file. Firing
/// before the prompt is answered returns [`IngestError::Aborted`] with nothing
/// written. Firing during the load returns [`IngestError::Interrupted`];
/// batches already committed stay in the database and the open batch is
/// discarded.
pub async fn run_source_until<F>(
    adapter: &dyn SourceAdapter,
    store: &dyn LandingStore,
    options: &LoadOptions,
    interrupt: F,
) -> IngestResult<IngestStats>
where
    F: Future<Output = ()>,
{
    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "ingest",
        source = adapter.name(),
        schema = adapter.schema(),
        run = %run_id
    );

    async move {
        let start = Instant::now();
        tokio::pin!(interrupt);

        let files = tokio::select! {
            biased;
            _ = &mut interrupt => {
                println!("\nOperation cancelled.");
                return Err(IngestError::Aborted);
            }
            files = plan(adapter, options) => files?,
        };

        let mut pipeline = Pipeline::new(store, adapter.schema(), 1);
        let loaded = tokio::select! {
            biased;
            _ = &mut interrupt => None,
            loaded = load_files(adapter, store, options, &files, &mut pipeline) => Some(loaded),
        };
        match loaded {
            Some(loaded) => loaded?,
            None => {
                tracing::warn!(
                    "Interrupted after {} completed table(s); committed batches are kept",
                    pipeline.stats().table_rows.len()
                );
                return Err(IngestError::Interrupted);
            }
        }

        let mut stats = pipeline.into_stats();
        stats.duration = start.elapsed();
        tracing::info!(
            "Ingestion complete: {} rows, {} files, {} failed",
            stats.records_ingested(),
            stats.files_processed,
            stats.files_failed
        );
        Ok(stats)
    }
    .instrument(span)
    .await
}

fn input_base(root: &Path) -> &Path {
    if root.is_dir() {
        root
    } else {
        root.parent().unwrap_or(root)
    }
}

/// Discover, print the plan and ask for confirmation
async fn plan(adapter: &dyn SourceAdapter, options: &LoadOptions) -> IngestResult<Vec<SourceFile>> {
    let root = adapter.root();
    if !root.exists() {
        return Err(IngestError::MissingInput(root.to_path_buf()));
    }

    let files = adapter.discover()?;
    if files.is_empty() {
        return Err(IngestError::NoInputFiles {
            root: root.to_path_buf(),
            expected: adapter.expected_inputs(),
        });
    }

    let base = input_base(root);
    println!("Found the following {} files to ingest:", adapter.name());
    let mut by_format: BTreeMap<FileFormat, Vec<&SourceFile>> = BTreeMap::new();
    for file in &files {
        by_format.entry(file.format).or_default().push(file);
    }
    for (format, group) in &by_format {
        println!();
        println!("{} - {} file(s):", format, group.len());
        for file in group {
            println!("   - {}", file.display_relative(base));
        }
    }
    println!();
    let estimate = adapter.estimate(&files)?;
    println!("{}", estimate.summary());

    preflight::confirm(
        &format!("Do you want to proceed with {} ingestion?", adapter.name()),
        adapter.default_answer(),
        options.assume_yes,
    )
    .await?;
    Ok(files)
}

/// Ensure the schema and load every file into `pipeline`
async fn load_files<'a>(
    adapter: &dyn SourceAdapter,
    store: &'a dyn LandingStore,
    options: &LoadOptions,
    files: &[SourceFile],
    pipeline: &mut Pipeline<'a>,
) -> IngestResult<()> {
    println!("Loading into {} via {}", adapter.schema(), store.describe());
    store.ensure_schema(adapter.schema()).await?;

    let batch_size = options
        .batch_size
        .unwrap_or_else(|| adapter.default_batch_size());
    pipeline.batch_size = batch_size.max(1);
    pipeline.show_progress = options.show_progress;

    adapter.prepare(pipeline, options).await?;

    let base = input_base(adapter.root());
    for file in files {
        tracing::info!("Processing {}", file.display_relative(base));
        match adapter.load(file, pipeline).await {
            Ok(()) => {
                let stats = pipeline.stats_mut();
                stats.files_processed += 1;
                stats.bytes_processed += file.size;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Failed to ingest {}: {}", file.path.display(), e);
                let stats = pipeline.stats_mut();
                stats.files_failed += 1;
                stats.add_error(format!("{}: {}", file.display_relative(base), e));
            }
        }
    }
    Ok(())
}
