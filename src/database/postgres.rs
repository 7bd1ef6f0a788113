//! PostgreSQL landing store
//!
//! A single client connection, shared behind a mutex. Every insert batch runs in
//! its own transaction and is committed before the call returns.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;

use super::schema::LandingSql;
use super::{
    DatabaseError, DatabaseResult, LandingStore, LoadPolicy, QueryResult, Row, TableTarget,
    check_row_widths,
};
use crate::config::{DatabaseSection, mask_connection_string};

/// PostgreSQL landing store
pub struct PostgresStore {
    /// Masked connection target, for display
    target: String,
    /// PostgreSQL client (wrapped for async access)
    client: Arc<Mutex<tokio_postgres::Client>>,
}

/// Client configuration from resolved settings, one parameter at a time
pub fn connection_config(database: &DatabaseSection) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&database.host)
        .port(database.port)
        .user(&database.user)
        .password(&database.password)
        .dbname(&database.name);
    config
}

impl PostgresStore {
    /// Connect using resolved configuration
    ///
    /// Fails fast: an unreachable server is reported immediately as
    /// [`DatabaseError::ConnectionFailed`] with the masked target in the message.
    pub async fn connect(database: &DatabaseSection) -> DatabaseResult<Self> {
        Self::connect_with(
            connection_config(database),
            database.connection_string_masked(),
        )
        .await
    }

    /// Connect with an explicit connection string
    pub async fn new(connection_string: &str) -> DatabaseResult<Self> {
        let target = mask_connection_string(connection_string);
        let config = connection_string
            .parse::<tokio_postgres::Config>()
            .map_err(|e| {
                DatabaseError::ConnectionFailed(format!("Invalid connection string {}: {}", target, e))
            })?;
        Self::connect_with(config, target).await
    }

    async fn connect_with(config: tokio_postgres::Config, target: String) -> DatabaseResult<Self> {
        let (client, connection) = config
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| {
                DatabaseError::ConnectionFailed(format!("Failed to connect to {}: {}", target, e))
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        tracing::info!("Connected to {}", target);

        Ok(Self {
            target,
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Get the connection string (masked for security)
    pub fn connection_string_masked(&self) -> String {
        self.target.clone()
    }

    async fn table_columns(&self, target: &TableTarget) -> DatabaseResult<Vec<String>> {
        let client = self.client.lock().await;
        let rows = client
            .query(LandingSql::table_columns(), &[&target.schema, &target.table])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to describe {}: {}", target, e)))?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }
}

#[async_trait(?Send)]
impl LandingStore for PostgresStore {
    fn describe(&self) -> String {
        self.connection_string_masked()
    }

    async fn ensure_schema(&self, schema: &str) -> DatabaseResult<()> {
        let sql = LandingSql::create_schema(schema)?;
        let client = self.client.lock().await;
        client.batch_execute(&sql).await.map_err(|e| {
            DatabaseError::QueryFailed(format!("Failed to create schema {}: {}", schema, e))
        })?;
        tracing::debug!("Schema {} is present", schema);
        Ok(())
    }

    async fn materialize(
        &self,
        target: &TableTarget,
        columns: &[String],
        policy: LoadPolicy,
    ) -> DatabaseResult<Vec<String>> {
        match policy {
            LoadPolicy::FullRefresh => {
                let sql = LandingSql::recreate_table(target, columns)?;
                let client = self.client.lock().await;
                client.batch_execute(&sql).await.map_err(|e| {
                    DatabaseError::QueryFailed(format!("Failed to recreate {}: {}", target, e))
                })?;
                Ok(columns.to_vec())
            }
            LoadPolicy::IncrementalAppend => {
                let sql = LandingSql::create_table(target, columns, true)?;
                {
                    let client = self.client.lock().await;
                    client.batch_execute(&sql).await.map_err(|e| {
                        DatabaseError::QueryFailed(format!("Failed to create {}: {}", target, e))
                    })?;
                }
                self.table_columns(target).await
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

        let mut client = self.client.lock().await;
        let transaction = client.transaction().await.map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to begin transaction: {}", e))
        })?;

        let mut written = 0;
        for chunk in rows.chunks(LandingSql::rows_per_statement(columns.len())) {
            let sql = LandingSql::insert(target, columns, chunk.len())?;
            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flat_map(|row| row.iter().map(|value| value as &(dyn ToSql + Sync)))
                .collect();
            written += transaction.execute(sql.as_str(), &params).await.map_err(|e| {
                DatabaseError::QueryFailed(format!("Failed to insert into {}: {}", target, e))
            })?;
        }

        transaction.commit().await.map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to commit {}: {}", target, e))
        })?;

        Ok(written)
    }

    async fn row_count(&self, target: &TableTarget) -> DatabaseResult<u64> {
        let sql = LandingSql::count(target)?;
        let client = self.client.lock().await;
        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to count {}: {}", target, e)))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn list_tables(&self, schema: &str) -> DatabaseResult<Vec<String>> {
        let client = self.client.lock().await;
        let rows = client
            .query(LandingSql::list_tables(), &[&schema])
            .await
            .map_err(|e| {
                DatabaseError::QueryFailed(format!("Failed to list tables in {}: {}", schema, e))
            })?;
        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    async fn drop_table(&self, target: &TableTarget) -> DatabaseResult<()> {
        let sql = LandingSql::drop_table(target)?;
        let client = self.client.lock().await;
        client
            .batch_execute(&sql)
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to drop {}: {}", target, e)))
    }

    async fn sample(&self, target: &TableTarget, limit: usize) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();
        let sql = LandingSql::sample(target, limit)?;
        let columns = self.table_columns(target).await?;
        let client = self.client.lock().await;

        let rows = client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let json_rows = rows
            .iter()
            .map(|row| {
                let text: String = row.try_get(0).map_err(|e| {
                    DatabaseError::QueryFailed(format!("Invalid row from {}: {}", target, e))
                })?;
                serde_json::from_str(&text).map_err(|e| {
                    DatabaseError::QueryFailed(format!("Invalid row from {}: {}", target, e))
                })
            })
            .collect::<DatabaseResult<Vec<serde_json::Value>>>()?;

        Ok(QueryResult {
            columns,
            rows: json_rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
