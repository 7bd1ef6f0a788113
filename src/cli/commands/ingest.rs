//! `landing ingest <source>`

use std::path::PathBuf;

use crate::cli::commands::{open_store, runtime};
use crate::cli::error::CliError;
use crate::config::LandingConfig;
use crate::pipeline::{IngestError, LoadOptions, run_source};
use crate::sources::SourceKind;

/// Ingest command arguments
#[derive(Debug, Clone)]
pub struct IngestArgs {
    pub source: SourceKind,
    /// Overrides the configured input path
    pub path: Option<PathBuf>,
    pub yes: bool,
    pub dry_run: bool,
    pub batch_size: Option<usize>,
    pub reset: bool,
    pub config_dir: PathBuf,
}

impl IngestArgs {
    /// Combine command line flags with the resolved configuration
    pub fn load_options(&self, config: &LandingConfig) -> LoadOptions {
        LoadOptions {
            batch_size: self.batch_size.or(config.ingest.batch_size),
            assume_yes: self.yes || config.ingest.assume_yes,
            reset: self.reset,
            show_progress: true,
        }
    }
}

/// Run one source adapter end to end
pub fn handle_ingest(args: &IngestArgs) -> Result<(), CliError> {
    if args.batch_size == Some(0) {
        return Err(CliError::InvalidArgument(
            "--batch-size must be greater than zero".to_string(),
        ));
    }

    let config = LandingConfig::load(&args.config_dir)?;
    let root = args
        .path
        .clone()
        .unwrap_or_else(|| args.source.configured_path(&config.sources).to_path_buf());
    let options = args.load_options(&config);
    let adapter = args.source.adapter(root);

    println!("{} Data Ingestion", args.source);
    println!("{}", "=".repeat(50));
    println!("Data Path: {}", adapter.root().display());
    println!();

    let rt = runtime()?;
    rt.block_on(async {
        let store = open_store(&config, args.dry_run).await?;
        match run_source(adapter.as_ref(), store.as_ref(), &options).await {
            Ok(stats) => {
                println!();
                println!("{}", stats.report(adapter.schema()));
                Ok(())
            }
            // Already reported at the prompt
            Err(IngestError::Aborted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> IngestArgs {
        IngestArgs {
            source: SourceKind::Bolt,
            path: None,
            yes: false,
            dry_run: true,
            batch_size: None,
            reset: false,
            config_dir: PathBuf::from("docker"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = LandingConfig::new();
        config.ingest.batch_size = Some(250);
        config.ingest.assume_yes = true;

        let options = args().load_options(&config);
        assert_eq!(options.batch_size, Some(250));
        assert!(options.assume_yes);

        let explicit = IngestArgs {
            batch_size: Some(10),
            ..args()
        };
        assert_eq!(explicit.load_options(&config).batch_size, Some(10));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let zero = IngestArgs {
            batch_size: Some(0),
            ..args()
        };
        assert!(matches!(
            handle_ingest(&zero),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
