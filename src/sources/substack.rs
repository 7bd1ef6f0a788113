//! Substack newsletter exports
//!
//! A Substack export is a folder per download, each holding `posts.csv`, an
//! `email_list*.csv` and per-post `posts/<id>.delivers.csv` /
//! `posts/<id>.opens.csv` event files. Several downloads can sit side by side
//! below the root; their rows are unioned into four role tables, tagged with
//! the folder they came from. Any other CSV becomes its own table.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

use crate::database::TableTarget;
use crate::formats::csv::open_csv;
use crate::pipeline::headers::{sanitize_header_strings, table_name_from_file};
use crate::pipeline::{
    IngestResult, LoadOptions, Pipeline, SourceAdapter, SourceFile, TableLoad, discover_files,
};

pub const SCHEMA: &str = "s_substack";

pub const POSTS_TABLE: &str = "posts";
pub const EMAILS_TABLE: &str = "emails";
pub const POST_DELIVERS_TABLE: &str = "post_delivers";
pub const POST_OPENS_TABLE: &str = "post_opens";

/// Tables that union rows across export folders
pub const ROLE_TABLES: [&str; 4] = [POSTS_TABLE, EMAILS_TABLE, POST_DELIVERS_TABLE, POST_OPENS_TABLE];

pub const SOURCE_FOLDER_COLUMN: &str = "source_folder";
pub const POST_ID_COLUMN: &str = "post_id";

static RE_EMAIL_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^email_list.*\.csv$").expect("Invalid regex"));
static RE_POST_EVENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<id>.+)\.(?P<kind>delivers|opens)\.csv$").expect("Invalid regex")
});

/// What a file in the export contributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstackRole {
    Posts,
    Emails,
    PostDelivers { post_id: String },
    PostOpens { post_id: String },
    /// Not part of the known layout; loaded as its own table
    Other { table: String },
}

impl SubstackRole {
    /// Classify a file by its path below the export root
    pub fn classify(relative: &Path) -> Self {
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let in_posts_dir = relative
            .parent()
            .and_then(|p| p.file_name())
            .is_some_and(|p| p.eq_ignore_ascii_case("posts"));

        if file_name.eq_ignore_ascii_case("posts.csv") {
            return SubstackRole::Posts;
        }
        if RE_EMAIL_LIST.is_match(&file_name) {
            return SubstackRole::Emails;
        }
        if in_posts_dir && let Some(caps) = RE_POST_EVENTS.captures(&file_name) {
            let post_id = caps["id"].to_string();
            return if caps["kind"].eq_ignore_ascii_case("delivers") {
                SubstackRole::PostDelivers { post_id }
            } else {
                SubstackRole::PostOpens { post_id }
            };
        }
        SubstackRole::Other {
            table: table_name_from_file(&file_name),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            SubstackRole::Posts => POSTS_TABLE,
            SubstackRole::Emails => EMAILS_TABLE,
            SubstackRole::PostDelivers { .. } => POST_DELIVERS_TABLE,
            SubstackRole::PostOpens { .. } => POST_OPENS_TABLE,
            SubstackRole::Other { table } => table,
        }
    }

    fn post_id(&self) -> Option<&str> {
        match self {
            SubstackRole::PostDelivers { post_id } | SubstackRole::PostOpens { post_id } => {
                Some(post_id)
            }
            _ => None,
        }
    }
}

/// Export folder directly below the root, `.` for files at the root
pub fn source_folder(relative: &Path) -> String {
    let mut components = relative.components().filter(|c| matches!(c, Component::Normal(_)));
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => ".".to_string(),
    }
}

pub struct SubstackSource {
    root: PathBuf,
}

impl SubstackSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[async_trait(?Send)]
impl SourceAdapter for SubstackSource {
    fn name(&self) -> &'static str {
        "substack"
    }

    fn schema(&self) -> &str {
        SCHEMA
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn expected_inputs(&self) -> String {
        ".csv files".to_string()
    }

    fn discover(&self) -> IngestResult<Vec<SourceFile>> {
        discover_files(&self.root, "**/*.csv")
    }

    async fn prepare(&self, pipeline: &mut Pipeline<'_>, options: &LoadOptions) -> IngestResult<()> {
        if !options.reset {
            return Ok(());
        }
        for table in ROLE_TABLES {
            let target = TableTarget::new(SCHEMA, table);
            tracing::info!("Resetting {}", target);
            pipeline.store().drop_table(&target).await?;
        }
        Ok(())
    }

    async fn load(&self, file: &SourceFile, pipeline: &mut Pipeline<'_>) -> IngestResult<()> {
        let relative = self.relative(&file.path);
        let role = SubstackRole::classify(relative);
        let csv = open_csv(&file.path)?;
        let columns = sanitize_header_strings(&csv.headers);

        let load = match &role {
            SubstackRole::Other { table } => TableLoad::full_refresh(table, columns),
            _ => {
                let mut load = TableLoad::append(role.table(), columns)
                    .with_provenance(SOURCE_FOLDER_COLUMN, source_folder(relative));
                if let Some(post_id) = role.post_id() {
                    load = load.with_provenance(POST_ID_COLUMN, post_id);
                }
                load
            }
        };

        tracing::debug!("{} -> {}", relative.display(), role.table());
        pipeline.load_table(load, csv.rows).await?;
        Ok(())
    }
}
