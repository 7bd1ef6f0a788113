//! Landing Loader - loads personal data exports into Postgres landing schemas
//!
//! Provides:
//! - Source adapters for Apple Health, Bolt, LinkedIn, Spotify, Substack and Telegram exports
//! - A single-file loader for ad hoc uploads
//! - The shared landing pipeline (header sanitising, batching, table refresh/append)
//! - Postgres and in-memory landing stores
//! - A public holiday seed generator
//! - Configuration from `landing.toml`, `.env` files and the environment

pub mod config;
pub mod database;
pub mod formats;
pub mod holidays;
pub mod pipeline;
pub mod sources;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::{ConfigError, LandingConfig};
pub use database::{
    DatabaseError, LandingStore, LoadPolicy, MemoryStore, PostgresStore, Row, TableTarget,
};
pub use holidays::{BuiltinCalendar, HolidayCalendar, HolidayConfig, HolidayRecord};
pub use pipeline::{
    IngestError, IngestResult, IngestStats, LoadOptions, Pipeline, SourceAdapter, TableLoad,
    run_source,
};
pub use sources::SourceKind;
pub use sources::generic::{IngestReport, ingest_file};
