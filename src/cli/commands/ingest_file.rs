//! `landing ingest-file <FILE>`

use std::path::PathBuf;

use crate::cli::commands::{open_store, runtime};
use crate::cli::error::CliError;
use crate::config::LandingConfig;
use crate::sources::generic::ingest_file;

#[derive(Debug, Clone)]
pub struct IngestFileArgs {
    pub file: PathBuf,
    pub schema: String,
    pub dry_run: bool,
    pub config_dir: PathBuf,
}

pub fn handle_ingest_file(args: &IngestFileArgs) -> Result<(), CliError> {
    let config = LandingConfig::load(&args.config_dir)?;
    let rt = runtime()?;
    rt.block_on(async {
        let store = open_store(&config, args.dry_run).await?;
        let report = ingest_file(
            &args.file,
            &args.schema,
            store.as_ref(),
            config.ingest.batch_size,
        )
        .await?;
        println!("{}", report);
        Ok(())
    })
}
