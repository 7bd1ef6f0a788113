//! `landing inspect tables|sample|cleanup`
//!
//! Read-mostly maintenance over a landing schema in Postgres.

use std::path::PathBuf;

use crate::cli::commands::runtime;
use crate::cli::error::CliError;
use crate::config::LandingConfig;
use crate::database::{LandingStore, OutputFormat, PostgresStore, TableTarget, format_query_result};
use crate::pipeline::IngestError;
use crate::pipeline::preflight::confirm;

#[derive(Debug, Clone)]
pub enum InspectAction {
    Tables,
    Sample {
        table: String,
        limit: usize,
        format: String,
    },
    Cleanup {
        keep: Vec<String>,
        yes: bool,
    },
}

#[derive(Debug, Clone)]
pub struct InspectArgs {
    pub schema: String,
    pub action: InspectAction,
    pub config_dir: PathBuf,
}

pub fn handle_inspect(args: &InspectArgs) -> Result<(), CliError> {
    // Validate before connecting
    let format = match &args.action {
        InspectAction::Sample { format, .. } => Some(
            format
                .parse::<OutputFormat>()
                .map_err(CliError::InvalidArgument)?,
        ),
        _ => None,
    };

    let config = LandingConfig::load(&args.config_dir)?;
    let rt = runtime()?;
    rt.block_on(async {
        let store = PostgresStore::connect(&config.database).await?;
        match &args.action {
            InspectAction::Tables => print_tables(&store, &args.schema).await,
            InspectAction::Sample { table, limit, .. } => {
                let target = TableTarget::new(&args.schema, table);
                let result = store.sample(&target, *limit).await?;
                let format = format.unwrap_or_default();
                println!("--- Sample from {} ---", target);
                println!("{}", format_query_result(&result, format)?);
                if format != OutputFormat::Json {
                    eprintln!("\nExecution time: {}ms", result.execution_time_ms);
                }
                Ok(())
            }
            InspectAction::Cleanup { keep, yes } => cleanup(&store, &args.schema, keep, *yes).await,
        }
    })
}

async fn print_tables(store: &dyn LandingStore, schema: &str) -> Result<(), CliError> {
    let tables = store.list_tables(schema).await?;
    if tables.is_empty() {
        println!("No tables in {}", schema);
        return Ok(());
    }
    println!("Tables in {}:", schema);
    for table in tables {
        let count = store.row_count(&TableTarget::new(schema, &table)).await?;
        println!(" - {}: {} rows", table, count);
    }
    Ok(())
}

/// Tables of `existing` not named in `keep`
pub fn tables_to_drop(existing: &[String], keep: &[String]) -> Vec<String> {
    existing
        .iter()
        .filter(|t| !keep.iter().any(|k| k == *t))
        .cloned()
        .collect()
}

/// Drop every table of a schema except `keep`, after confirmation
pub async fn cleanup(
    store: &dyn LandingStore,
    schema: &str,
    keep: &[String],
    yes: bool,
) -> Result<(), CliError> {
    let existing = store.list_tables(schema).await?;
    let doomed = tables_to_drop(&existing, keep);
    if doomed.is_empty() {
        println!("Nothing to drop in {}", schema);
        return Ok(());
    }

    println!("Tables to drop from {}:", schema);
    for table in &doomed {
        println!(" - {}", table);
    }
    match confirm(
        &format!("Drop {} table(s)?", doomed.len()),
        false,
        yes,
    )
    .await
    {
        Ok(()) => {}
        Err(IngestError::Aborted) => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    for table in &doomed {
        println!("Dropping unwanted table: {}", table);
        store.drop_table(&TableTarget::new(schema, table)).await?;
    }
    println!("Cleanup complete.");
    Ok(())
}
