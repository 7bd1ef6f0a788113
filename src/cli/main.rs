//! CLI binary entry point for landing-loader

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use landing_loader::cli::commands::config::{handle_config_sample, handle_config_show};
#[cfg(feature = "cli")]
use landing_loader::cli::commands::holidays::{HolidayArgs, handle_holidays};
#[cfg(feature = "cli")]
use landing_loader::cli::commands::ingest::{IngestArgs, handle_ingest};
#[cfg(feature = "cli")]
use landing_loader::cli::commands::ingest_file::{IngestFileArgs, handle_ingest_file};
#[cfg(feature = "cli")]
use landing_loader::cli::commands::inspect::{InspectAction, InspectArgs, handle_inspect};
#[cfg(feature = "cli")]
use landing_loader::config::DEFAULT_CONFIG_DIR;
#[cfg(feature = "cli")]
use landing_loader::sources::SourceKind;
#[cfg(feature = "cli")]
use landing_loader::sources::generic::DEFAULT_SCHEMA;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "landing")]
#[command(about = "Load personal data exports into Postgres landing schemas")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Directory holding landing.toml, .env and .env.example
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Ingest one source's export into its landing schema
    Ingest {
        /// Source to ingest
        #[arg(value_enum)]
        source: SourceArg,
        /// Input path (default: from configuration)
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Load into memory instead of Postgres
        #[arg(long)]
        dry_run: bool,
        /// Rows per insert batch
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Drop append tables before loading (substack)
        #[arg(long)]
        reset: bool,
    },
    /// Load a single CSV or JSON file into a table named after it
    IngestFile {
        file: PathBuf,
        /// Target schema
        #[arg(short, long, default_value = DEFAULT_SCHEMA)]
        schema: String,
        /// Load into memory instead of Postgres
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate the public holiday seed CSV
    Holidays {
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        start_year: Option<i32>,
        /// Last year, inclusive
        #[arg(long)]
        end_year: Option<i32>,
        /// Subdivision to include, e.g. DE-BE (repeatable)
        #[arg(long = "subdivision")]
        subdivisions: Vec<String>,
    },
    /// Inspect or clean up a landing schema
    Inspect {
        #[command(subcommand)]
        command: InspectCommands,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum InspectCommands {
    /// List tables with row counts
    Tables { schema: String },
    /// Print the first rows of a table
    Sample {
        schema: String,
        table: String,
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Drop every table not in the keep list
    Cleanup {
        schema: String,
        /// Tables to keep, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        keep: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration (password masked)
    Show,
    /// Print a sample landing.toml
    Sample,
}

#[cfg(feature = "cli")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    AppleHealth,
    Bolt,
    Linkedin,
    Spotify,
    Substack,
    Telegram,
}

#[cfg(feature = "cli")]
fn convert_source(source: SourceArg) -> SourceKind {
    match source {
        SourceArg::AppleHealth => SourceKind::AppleHealth,
        SourceArg::Bolt => SourceKind::Bolt,
        SourceArg::Linkedin => SourceKind::Linkedin,
        SourceArg::Spotify => SourceKind::Spotify,
        SourceArg::Substack => SourceKind::Substack,
        SourceArg::Telegram => SourceKind::Telegram,
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose {
        "landing_loader=debug"
    } else {
        "landing_loader=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_dir = cli.config_dir;

    let result = match cli.command {
        Commands::Ingest {
            source,
            path,
            yes,
            dry_run,
            batch_size,
            reset,
        } => {
            let args = IngestArgs {
                source: convert_source(source),
                path,
                yes,
                dry_run,
                batch_size,
                reset,
                config_dir,
            };
            handle_ingest(&args)
        }
        Commands::IngestFile {
            file,
            schema,
            dry_run,
        } => {
            let args = IngestFileArgs {
                file,
                schema,
                dry_run,
                config_dir,
            };
            handle_ingest_file(&args)
        }
        Commands::Holidays {
            output,
            start_year,
            end_year,
            subdivisions,
        } => {
            let args = HolidayArgs {
                output,
                start_year,
                end_year,
                subdivisions,
            };
            handle_holidays(&args)
        }
        Commands::Inspect { command } => {
            let (schema, action) = match command {
                InspectCommands::Tables { schema } => (schema, InspectAction::Tables),
                InspectCommands::Sample {
                    schema,
                    table,
                    limit,
                    format,
                } => (
                    schema,
                    InspectAction::Sample {
                        table,
                        limit,
                        format,
                    },
                ),
                InspectCommands::Cleanup { schema, keep, yes } => {
                    (schema, InspectAction::Cleanup { keep, yes })
                }
            };
            let args = InspectArgs {
                schema,
                action,
                config_dir,
            };
            handle_inspect(&args)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => handle_config_show(&config_dir),
            ConfigCommands::Sample => handle_config_sample(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
