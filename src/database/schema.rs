//! SQL text for landing tables
//!
//! Landing tables are untyped: every column is TEXT. Identifiers are always
//! double-quoted here, values are always bound as `$n` parameters by the caller.

use super::{DatabaseError, DatabaseResult, TableTarget};

/// Upper bound on bind parameters in one Postgres statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// SQL builder for landing schemas and tables
pub struct LandingSql;

impl LandingSql {
    /// Quote an identifier, doubling embedded quotes
    pub fn quote_ident(name: &str) -> DatabaseResult<String> {
        if name.is_empty() || name.contains('\0') {
            return Err(DatabaseError::InvalidIdentifier(name.to_string()));
        }
        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    }

    /// `"schema"."table"`
    pub fn qualified(target: &TableTarget) -> DatabaseResult<String> {
        Ok(format!(
            "{}.{}",
            Self::quote_ident(&target.schema)?,
            Self::quote_ident(&target.table)?
        ))
    }

    pub fn create_schema(schema: &str) -> DatabaseResult<String> {
        Ok(format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            Self::quote_ident(schema)?
        ))
    }

    pub fn drop_table(target: &TableTarget) -> DatabaseResult<String> {
        Ok(format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            Self::qualified(target)?
        ))
    }

    /// `CREATE TABLE` with one TEXT column per name
    pub fn create_table(
        target: &TableTarget,
        columns: &[String],
        if_not_exists: bool,
    ) -> DatabaseResult<String> {
        let column_defs = columns
            .iter()
            .map(|c| Self::quote_ident(c).map(|q| format!("{} TEXT", q)))
            .collect::<DatabaseResult<Vec<_>>>()?;
        Ok(format!(
            "CREATE TABLE {}{} ({})",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            Self::qualified(target)?,
            column_defs.join(", ")
        ))
    }

    /// Drop-then-create, run as one simple-query batch
    pub fn recreate_table(target: &TableTarget, columns: &[String]) -> DatabaseResult<String> {
        Ok(format!(
            "{};\n{};",
            Self::drop_table(target)?,
            Self::create_table(target, columns, false)?
        ))
    }

    /// Multi-row parameterised insert for `row_count` rows
    pub fn insert(
        target: &TableTarget,
        columns: &[String],
        row_count: usize,
    ) -> DatabaseResult<String> {
        if columns.is_empty() {
            return Err(DatabaseError::InvalidInput(format!(
                "no columns to insert into {}",
                target
            )));
        }
        let column_list = columns
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<DatabaseResult<Vec<_>>>()?
            .join(", ");

        let width = columns.len();
        let tuples: Vec<String> = (0..row_count)
            .map(|row| {
                let placeholders: Vec<String> = (1..=width)
                    .map(|col| format!("${}", row * width + col))
                    .collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            Self::qualified(target)?,
            column_list,
            tuples.join(", ")
        ))
    }

    /// Rows that fit in one insert without exceeding [`MAX_BIND_PARAMS`]
    pub fn rows_per_statement(column_count: usize) -> usize {
        (MAX_BIND_PARAMS / column_count.max(1)).max(1)
    }

    pub fn count(target: &TableTarget) -> DatabaseResult<String> {
        Ok(format!("SELECT COUNT(*) FROM {}", Self::qualified(target)?))
    }

    ///
    /// Each row comes back as one JSON text column, so every column type is
    /// rendered by the server.
    pub fn sample(target: &TableTarget, limit: usize) -> DatabaseResult<String> {
        Ok(format!(
            "SELECT row_to_json(t)::text FROM {} AS t LIMIT {}",
            Self::qualified(target)?,
            limit
        ))
    }

    /// Base tables of schema `$1`
    pub fn list_tables() -> &'static str {
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
         ORDER BY table_name"
    }

    /// Columns of table `$2` in schema `$1`, in ordinal order
    pub fn table_columns() -> &'static str {
        "SELECT column_name::text FROM information_schema.columns \
         WHERE table_schema = $1 AND table_name = $2 \
         ORDER BY ordinal_position"
    }
}
