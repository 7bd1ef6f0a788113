//! Landing store abstraction
//!
//! Every source adapter writes through [`LandingStore`], which covers the
//! operations a landing load needs:
//! - schema bootstrap (`CREATE SCHEMA IF NOT EXISTS`)
//! - table materialization under a [`LoadPolicy`]
//! - committed multi-row inserts
//! - the inspection queries used by the maintenance commands
//!
//! [`postgres::PostgresStore`] is the production backend. [`memory::MemoryStore`]
//! keeps everything in process and backs dry runs and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use schema::LandingSql;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Identifier cannot be used as a schema, table or column name
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Query result could not be rendered
    #[error("Failed to format output: {0}")]
    Output(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// One row bound for a landing table; `None` is SQL NULL
pub type Row = Vec<Option<String>>;

/// A landing table, addressed as `<schema>.<table>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableTarget {
    pub schema: String,
    pub table: String,
}

impl TableTarget {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for TableTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// How a load treats an existing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Drop (cascading to dependents) and recreate before loading
    #[default]
    FullRefresh,
    /// Create if absent, then append
    IncrementalAppend,
}

impl std::fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadPolicy::FullRefresh => write!(f, "full refresh"),
            LoadPolicy::IncrementalAppend => write!(f, "incremental append"),
        }
    }
}

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Build a result from positional landing rows
    pub fn from_rows(columns: &[String], rows: &[Row]) -> Self {
        let json_rows = rows
            .iter()
            .map(|row| {
                let map: serde_json::Map<String, serde_json::Value> = columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| {
                        let value = value
                            .as_ref()
                            .map(|v| serde_json::Value::String(v.clone()))
                            .unwrap_or(serde_json::Value::Null);
                        (col.clone(), value)
                    })
                    .collect();
                serde_json::Value::Object(map)
            })
            .collect();
        Self::new(columns.to_vec(), json_rows)
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Storage operations used by landing loads
///
/// Identifiers passed in are quoted by the implementation; values are always bound
/// as parameters.
#[async_trait(?Send)]
pub trait LandingStore: Send + Sync {
    /// Human-readable target, safe for logs
    fn describe(&self) -> String;

    /// Create the schema if it does not exist. Idempotent.
    async fn ensure_schema(&self, schema: &str) -> DatabaseResult<()>;

    /// Prepare a table for loading
    ///
    /// Under [`LoadPolicy::FullRefresh`] the table is dropped with CASCADE and
    /// recreated with one TEXT column per entry of `columns`. Under
    /// [`LoadPolicy::IncrementalAppend`] it is created only if absent.
    ///
    /// # Returns
    /// The table's effective column list. For an append into an existing table
    /// this is the existing column list.
    async fn materialize(
        &self,
        target: &TableTarget,
        columns: &[String],
        policy: LoadPolicy,
    ) -> DatabaseResult<Vec<String>>;

    /// Insert rows and commit. Every row must be exactly `columns.len()` wide.
    ///
    /// # Returns
    /// Number of rows written
    async fn insert_batch(
        &self,
        target: &TableTarget,
        columns: &[String],
        rows: &[Row],
    ) -> DatabaseResult<u64>;

    /// Number of rows in a table
    async fn row_count(&self, target: &TableTarget) -> DatabaseResult<u64>;

    /// Base tables in a schema, sorted by name
    async fn list_tables(&self, schema: &str) -> DatabaseResult<Vec<String>>;

    /// Drop a table (CASCADE) if it exists
    async fn drop_table(&self, target: &TableTarget) -> DatabaseResult<()>;

    /// First `limit` rows of a table
    async fn sample(&self, target: &TableTarget, limit: usize) -> DatabaseResult<QueryResult>;
}

pub(crate) fn check_row_widths(columns: &[String], rows: &[Row]) -> DatabaseResult<()> {
    if let Some((idx, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(DatabaseError::InvalidInput(format!(
            "row {} has {} values, expected {}",
            idx,
            row.len(),
            columns.len()
        )));
    }
    Ok(())
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> DatabaseResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&result.rows)
            .map_err(|e| DatabaseError::Output(e.to_string())),
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => Ok(format_as_table(result)),
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn format_as_csv(result: &QueryResult) -> DatabaseResult<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(&result.columns)
        .map_err(|e| DatabaseError::Output(e.to_string()))?;

    for row in &result.rows {
        let values = result
            .columns
            .iter()
            .map(|col| match row.get(col).unwrap_or(&serde_json::Value::Null) {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            });
        writer
            .write_record(values)
            .map_err(|e| DatabaseError::Output(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DatabaseError::Output(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DatabaseError::Output(e.to_string()))
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &result.rows {
        for (i, col) in result.columns.iter().enumerate() {
            let value = row.get(col).unwrap_or(&serde_json::Value::Null);
            widths[i] = widths[i].max(display_value(value).chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(&header.join(" | "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let value = row.get(col).unwrap_or(&serde_json::Value::Null);
                format!("{:width$}", display_value(value), width = widths[i])
            })
            .collect();
        output.push_str(&values.join(" | "));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("unknown").is_err());
    }

    #[test]
    fn test_table_target_display() {
        let target = TableTarget::new("s_bolt", "rides");
        assert_eq!(target.to_string(), "s_bolt.rides");
    }

    #[test]
    fn test_query_result_from_rows() {
        let columns = vec!["name".to_string(), "age".to_string()];
        let rows = vec![
            vec![Some("Alice".to_string()), Some("30".to_string())],
            vec![Some("Bob".to_string()), None],
        ];
        let result = QueryResult::from_rows(&columns, &rows);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[1]["age"], serde_json::Value::Null);
        assert_eq!(result.rows[0]["name"], "Alice");
    }

    #[test]
    fn test_format_as_table() {
        let result = QueryResult::new(
            vec!["name".to_string(), "count".to_string()],
            vec![
                serde_json::json!({"name": "users", "count": "10"}),
                serde_json::json!({"name": "orders", "count": null}),
            ],
        );

        let output = format_as_table(&result);
        assert!(output.contains("name"));
        assert!(output.contains("orders"));
        assert!(output.contains("null"));
        assert!(output.contains("(2 rows)"));
    }

    #[test]
    fn test_format_as_csv() {
        let result = QueryResult::new(
            vec!["name".to_string(), "note, raw".to_string()],
            vec![
                serde_json::json!({"name": "test", "note, raw": "simple"}),
                serde_json::json!({"name": "complex", "note, raw": "has, comma"}),
                serde_json::json!({"name": "carriage\rreturn", "note, raw": null}),
                serde_json::json!({"name": "say \"hi\"", "note, raw": 3}),
            ],
        );

        let output = format_as_csv(&result).unwrap();
        assert_eq!(
            output,
            "name,\"note, raw\"\n\
             test,simple\n\
             complex,\"has, comma\"\n\
             \"carriage\rreturn\",\n\
             \"say \"\"hi\"\"\",3\n"
        );
    }

    #[test]
    fn test_check_row_widths() {
        let columns = vec!["a".to_string(), "b".to_string()];
        assert!(check_row_widths(&columns, &[vec![None, None]]).is_ok());
        assert!(check_row_widths(&columns, &[vec![None]]).is_err());
    }
}
