//! Schema mutation (DDL).
//!
//! Statements are rendered by pure builder functions so each dialect's output
//! can be checked without a live server, then executed unprepared. New
//! identifiers must pass [`validate_identifier`]; existing ones are quoted.

use crate::db::dialect::{Dialect, sql_literal, validate_identifier};
use crate::db::executor;
use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnChange, ColumnSpec, DatabaseType, IndexSpec};
use tracing::{info, warn};

const SQLITE_MODIFY_UNSUPPORTED: &str =
    "SQLite does not support column modification directly. You need to recreate the table.";

/// Schema mutator for table, column and index DDL.
pub struct SchemaMutator;

impl SchemaMutator {
    pub async fn create_table(pool: &DbPool, table: &str, columns: &[ColumnSpec]) -> DbResult<()> {
        let sql = create_table_sql(pool.dialect(), table, columns)?;
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, columns = columns.len(), "Table created");
        Ok(())
    }

    pub async fn drop_table(pool: &DbPool, table: &str) -> DbResult<()> {
        let sql = format!("DROP TABLE {}", pool.dialect().quote_ident(table));
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, "Table dropped");
        Ok(())
    }

    pub async fn rename_table(pool: &DbPool, table: &str, new_name: &str) -> DbResult<()> {
        let sql = rename_table_sql(pool.dialect(), table, new_name)?;
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, new_name = %new_name, "Table renamed");
        Ok(())
    }

    /// Remove every row, keeping the table definition.
    pub async fn truncate_table(pool: &DbPool, table: &str) -> DbResult<()> {
        let sql = truncate_table_sql(pool.dialect(), table);
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, "Table truncated");
        Ok(())
    }

    pub async fn add_column(pool: &DbPool, table: &str, column: &ColumnSpec) -> DbResult<()> {
        let dialect = pool.dialect();
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            dialect.quote_ident(table),
            column_definition(dialect, column)?
        );
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, column = %column.name, "Column added");
        Ok(())
    }

    /// Requires SQLite 3.35 or later on SQLite.
    pub async fn drop_column(pool: &DbPool, table: &str, column: &str) -> DbResult<()> {
        let dialect = pool.dialect();
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            dialect.quote_ident(table),
            dialect.quote_ident(column)
        );
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, column = %column, "Column dropped");
        Ok(())
    }

    /// Rename, retype or change the default of a column.
    ///
    /// Always unsupported on SQLite. Nullability changes are accepted and
    /// ignored.
    pub async fn modify_column(
        pool: &DbPool,
        table: &str,
        column: &str,
        change: &ColumnChange,
    ) -> DbResult<()> {
        let statements = modify_column_sql(pool.dialect(), table, column, change)?;

        if let Some(nullable) = change.nullable {
            warn!(
                table = %table,
                column = %column,
                nullable,
                "Nullability change requested but not applied"
            );
        }

        for sql in &statements {
            executor::execute_sql(pool, sql).await?;
        }
        info!(
            table = %table,
            column = %column,
            statements = statements.len(),
            "Column modified"
        );
        Ok(())
    }

    pub async fn create_index(pool: &DbPool, table: &str, index: &IndexSpec) -> DbResult<()> {
        let sql = create_index_sql(pool.dialect(), table, index)?;
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, index = %index.name, "Index created");
        Ok(())
    }

    pub async fn drop_index(pool: &DbPool, table: &str, index: &str) -> DbResult<()> {
        let sql = drop_index_sql(pool.dialect(), table, index);
        executor::execute_sql(pool, &sql).await?;
        info!(table = %table, index = %index, "Index dropped");
        Ok(())
    }
}

// =============================================================================
// Statement Builders
// =============================================================================

/// Render one column definition.
///
/// `autoIncrement` implies `PRIMARY KEY`; every engine requires the
/// auto-increment column to be a key.
pub fn column_definition(dialect: Dialect, column: &ColumnSpec) -> DbResult<String> {
    validate_identifier(&column.name, "column name")?;

    let mut def = format!(
        "{} {}",
        dialect.quote_ident(&column.name),
        dialect.render_type(&column.data_type)
    );
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.primary_key || column.auto_increment {
        def.push_str(" PRIMARY KEY");
    }
    if column.auto_increment {
        def.push(' ');
        def.push_str(dialect.auto_increment_clause());
    }
    if let Some(default) = &column.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(&sql_literal(default));
    }
    Ok(def)
}

pub fn create_table_sql(dialect: Dialect, table: &str, columns: &[ColumnSpec]) -> DbResult<String> {
    if table.is_empty() || columns.is_empty() {
        return Err(DbError::invalid_input("Table name and columns are required"));
    }
    validate_identifier(table, "table name")?;

    let definitions = columns
        .iter()
        .map(|c| column_definition(dialect, c))
        .collect::<DbResult<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({})",
        dialect.quote_ident(table),
        definitions.join(", ")
    ))
}

pub fn rename_table_sql(dialect: Dialect, table: &str, new_name: &str) -> DbResult<String> {
    validate_identifier(new_name, "table name")?;
    let (from, to) = (dialect.quote_ident(table), dialect.quote_ident(new_name));
    Ok(match dialect.db_type() {
        DatabaseType::MySQL => format!("RENAME TABLE {} TO {}", from, to),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => {
            format!("ALTER TABLE {} RENAME TO {}", from, to)
        }
    })
}

pub fn truncate_table_sql(dialect: Dialect, table: &str) -> String {
    let quoted = dialect.quote_ident(table);
    match dialect.db_type() {
        DatabaseType::SQLite => format!("DELETE FROM {}", quoted),
        DatabaseType::PostgreSQL | DatabaseType::MySQL => format!("TRUNCATE TABLE {}", quoted),
    }
}

/// Statements for a column change, in execution order. The rename runs last
/// so earlier statements can still use the old name.
pub fn modify_column_sql(
    dialect: Dialect,
    table: &str,
    column: &str,
    change: &ColumnChange,
) -> DbResult<Vec<String>> {
    if dialect.db_type() == DatabaseType::SQLite {
        return Err(DbError::unsupported(SQLITE_MODIFY_UNSUPPORTED));
    }
    if let Some(new_name) = &change.new_name {
        validate_identifier(new_name, "column name")?;
    }

    let table_q = dialect.quote_ident(table);
    let column_q = dialect.quote_ident(column);
    let mut statements = Vec::new();

    if let Some(data_type) = &change.data_type {
        let rendered = dialect.render_type(data_type);
        statements.push(match dialect.db_type() {
            DatabaseType::MySQL => {
                format!("ALTER TABLE {} MODIFY COLUMN {} {}", table_q, column_q, rendered)
            }
            _ => format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                table_q, column_q, rendered
            ),
        });
    }

    match &change.default_value {
        Some(serde_json::Value::Null) => statements.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            table_q, column_q
        )),
        Some(value) => statements.push(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            table_q,
            column_q,
            sql_literal(value)
        )),
        None => {}
    }

    if let Some(new_name) = &change.new_name {
        if new_name != column {
            statements.push(format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                table_q,
                column_q,
                dialect.quote_ident(new_name)
            ));
        }
    }

    Ok(statements)
}

pub fn create_index_sql(dialect: Dialect, table: &str, index: &IndexSpec) -> DbResult<String> {
    if index.name.is_empty() || index.columns.is_empty() {
        return Err(DbError::invalid_input("Index name and columns are required"));
    }
    validate_identifier(&index.name, "index name")?;

    let columns: Vec<String> = index
        .columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect();
    Ok(format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        dialect.quote_ident(&index.name),
        dialect.quote_ident(table),
        columns.join(", ")
    ))
}

pub fn drop_index_sql(dialect: Dialect, table: &str, index: &str) -> String {
    match dialect.db_type() {
        DatabaseType::MySQL => format!(
            "DROP INDEX {} ON {}",
            dialect.quote_ident(index),
            dialect.quote_ident(table)
        ),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => {
            format!("DROP INDEX {}", dialect.quote_ident(index))
        }
    }
}
