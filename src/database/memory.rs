//! In-process landing store
//!
//! Mirrors the Postgres semantics that loads depend on: a table can only be
//! created in an existing schema, full refresh discards previous rows, append
//! keeps the existing column list. Used for `--dry-run` and in tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{
    DatabaseError, DatabaseResult, LandingStore, LoadPolicy, QueryResult, Row, TableTarget,
    check_row_widths,
};

/// Contents of one in-memory table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    /// Value at `row`, looked up by column name
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// All values of one column
    pub fn column(&self, column: &str) -> Vec<Option<String>> {
        match self.columns.iter().position(|c| c == column) {
            Some(idx) => self.rows.iter().map(|r| r[idx].clone()).collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    schemas: BTreeSet<String>,
    tables: BTreeMap<TableTarget, MemoryTable>,
    commits: usize,
}

/// Landing store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> DatabaseResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| DatabaseError::TransactionFailed("memory store lock poisoned".into()))
    }

    /// Snapshot of a table
    pub fn table(&self, schema: &str, table: &str) -> Option<MemoryTable> {
        let state = self.state().ok()?;
        state.tables.get(&TableTarget::new(schema, table)).cloned()
    }

    pub fn has_schema(&self, schema: &str) -> bool {
        self.state()
            .map(|s| s.schemas.contains(schema))
            .unwrap_or(false)
    }

    /// Number of committed insert batches so far
    pub fn commit_count(&self) -> usize {
        self.state().map(|s| s.commits).unwrap_or(0)
    }

    /// Every table currently held, sorted by schema then name
    pub fn targets(&self) -> Vec<TableTarget> {
        self.state()
            .map(|s| s.tables.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl LandingStore for MemoryStore {
    fn describe(&self) -> String {
        "in-memory store (dry run)".to_string()
    }

    async fn ensure_schema(&self, schema: &str) -> DatabaseResult<()> {
        if schema.is_empty() {
            return Err(DatabaseError::InvalidIdentifier(schema.to_string()));
        }
        self.state()?.schemas.insert(schema.to_string());
        Ok(())
    }

    async fn materialize(
        &self,
        target: &TableTarget,
        columns: &[String],
        policy: LoadPolicy,
    ) -> DatabaseResult<Vec<String>> {
        let mut state = self.state()?;
        if !state.schemas.contains(&target.schema) {
            return Err(DatabaseError::QueryFailed(format!(
                "schema \"{}\" does not exist",
                target.schema
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(DatabaseError::QueryFailed(format!(
                "column \"{}\" specified more than once",
                dup
            )));
        }

        match policy {
            LoadPolicy::FullRefresh => {
                state.tables.insert(
                    target.clone(),
                    MemoryTable {
                        columns: columns.to_vec(),
                        rows: Vec::new(),
                    },
                );
                Ok(columns.to_vec())
            }
            LoadPolicy::IncrementalAppend => {
                let table = state
                    .tables
                    .entry(target.clone())
                    .or_insert_with(|| MemoryTable {
                        columns: columns.to_vec(),
                        rows: Vec::new(),
                    });
                Ok(table.columns.clone())
            }
        }
    }

    async fn insert_batch(
        &self,
        target: &TableTarget,
        columns: &[String],
        rows: &[Row],
    ) -> DatabaseResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        check_row_widths(columns, rows)?;

        let mut state = self.state()?;
        let table = state
            .tables
            .get_mut(target)
            .ok_or_else(|| DatabaseError::TableNotFound(target.to_string()))?;

        let positions = columns
            .iter()
            .map(|c| {
                table.columns.iter().position(|t| t == c).ok_or_else(|| {
                    DatabaseError::QueryFailed(format!(
                        "column \"{}\" of relation \"{}\" does not exist",
                        c, target.table
                    ))
                })
            })
            .collect::<DatabaseResult<Vec<_>>>()?;

        let width = table.columns.len();
        for row in rows {
            let mut stored = vec![None; width];
            for (value, &pos) in row.iter().zip(&positions) {
                stored[pos] = value.clone();
            }
            table.rows.push(stored);
        }
        state.commits += 1;
        Ok(rows.len() as u64)
    }

    async fn row_count(&self, target: &TableTarget) -> DatabaseResult<u64> {
        let state = self.state()?;
        state
            .tables
            .get(target)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| DatabaseError::TableNotFound(target.to_string()))
    }

    async fn list_tables(&self, schema: &str) -> DatabaseResult<Vec<String>> {
        let state = self.state()?;
        Ok(state
            .tables
            .keys()
            .filter(|t| t.schema == schema)
            .map(|t| t.table.clone())
            .collect())
    }

    async fn drop_table(&self, target: &TableTarget) -> DatabaseResult<()> {
        self.state()?.tables.remove(target);
        Ok(())
    }

    async fn sample(&self, target: &TableTarget, limit: usize) -> DatabaseResult<QueryResult> {
        let state = self.state()?;
        let table = state
            .tables
            .get(target)
            .ok_or_else(|| DatabaseError::TableNotFound(target.to_string()))?;
        let rows: Vec<Row> = table.rows.iter().take(limit).cloned().collect();
        Ok(QueryResult::from_rows(&table.columns, &rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_materialize_requires_schema() {
        let store = MemoryStore::new();
        let target = TableTarget::new("s_bolt", "rides");
        let err = store
            .materialize(&target, &cols(&["a"]), LoadPolicy::FullRefresh)
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_full_refresh_discards_rows() {
        let store = MemoryStore::new();
        store.ensure_schema("s_bolt").await.unwrap();
        let target = TableTarget::new("s_bolt", "rides");
        let columns = cols(&["a"]);

        store
            .materialize(&target, &columns, LoadPolicy::FullRefresh)
            .await
            .unwrap();
        store
            .insert_batch(&target, &columns, &[vec![Some("1".into())]])
            .await
            .unwrap();
        store
            .materialize(&target, &columns, LoadPolicy::FullRefresh)
            .await
            .unwrap();

        assert_eq!(store.row_count(&target).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_keeps_existing_columns() {
        let store = MemoryStore::new();
        store.ensure_schema("s_substack").await.unwrap();
        let target = TableTarget::new("s_substack", "posts");

        let first = store
            .materialize(&target, &cols(&["a", "b"]), LoadPolicy::IncrementalAppend)
            .await
            .unwrap();
        let second = store
            .materialize(&target, &cols(&["b", "c"]), LoadPolicy::IncrementalAppend)
            .await
            .unwrap();

        assert_eq!(first, cols(&["a", "b"]));
        assert_eq!(second, cols(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_insert_by_column_name() {
        let store = MemoryStore::new();
        store.ensure_schema("staging").await.unwrap();
        let target = TableTarget::new("staging", "t");
        store
            .materialize(&target, &cols(&["a", "b"]), LoadPolicy::FullRefresh)
            .await
            .unwrap();
        store
            .insert_batch(&target, &cols(&["b"]), &[vec![Some("x".into())]])
            .await
            .unwrap();

        let table = store.table("staging", "t").unwrap();
        assert_eq!(table.rows, vec![vec![None, Some("x".to_string())]]);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_columns_rejected() {
        let store = MemoryStore::new();
        store.ensure_schema("staging").await.unwrap();
        let target = TableTarget::new("staging", "t");
        assert!(
            store
                .materialize(&target, &cols(&["a", "a"]), LoadPolicy::FullRefresh)
                .await
                .is_err()
        );
    }
}
