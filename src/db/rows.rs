//! Row-level CRUD over a single table.
//!
//! Every statement is built from introspected column metadata: request
//! column names are checked against it, identifiers are quoted per dialect
//! and values are bound after coercion to the column's type category.

use crate::db::dialect::Dialect;
use crate::db::executor::{self, Statement};
use crate::db::params::to_sql_value;
use crate::db::pool::DbPool;
use crate::db::schema::{SchemaInspector, single_primary_key};
use crate::db::types::{TypeCategory, categorize_type, is_searchable_type};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, Row, RowsPage, RowsQuery, SqlValue};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

/// Introspected columns of one table, used to validate and type requests.
#[derive(Debug, Clone)]
pub struct TableColumns {
    table: String,
    dialect: Dialect,
    columns: Vec<ColumnMetadata>,
}

impl TableColumns {
    /// Load the table's columns; fails with `Table '...' not found`.
    pub async fn load(pool: &DbPool, table: &str) -> DbResult<Self> {
        let columns = SchemaInspector::list_columns(pool, table).await?;
        Ok(Self::new(table, pool.dialect(), columns))
    }

    pub fn new(table: impl Into<String>, dialect: Dialect, columns: Vec<ColumnMetadata>) -> Self {
        Self {
            table: table.into(),
            dialect,
            columns,
        }
    }

    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Look up a column named in a request.
    fn column(&self, name: &str) -> DbResult<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                DbError::invalid_input(format!(
                    "Unknown column '{}' in table '{}'",
                    name, self.table
                ))
            })
    }

    fn primary_key(&self) -> DbResult<&ColumnMetadata> {
        single_primary_key(&self.columns).ok_or_else(|| DbError::no_primary_key(&self.table))
    }

    fn category(&self, column: &ColumnMetadata) -> TypeCategory {
        categorize_type(&column.data_type, self.dialect.db_type())
    }

    fn quoted_table(&self) -> String {
        self.dialect.quote_ident(&self.table)
    }
}

/// Accumulates bound values and hands out matching placeholders.
struct StatementBuilder<'a> {
    table: &'a TableColumns,
    params: Vec<SqlValue>,
}

impl<'a> StatementBuilder<'a> {
    fn new(table: &'a TableColumns) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    /// Bind a request value for `column` and return its placeholder.
    fn bind(&mut self, column: &ColumnMetadata, value: &JsonValue) -> String {
        self.params
            .push(to_sql_value(value, self.table.category(column)));
        self.table
            .dialect
            .typed_placeholder(self.params.len(), Some(&column.data_type))
    }

    /// Bind an untyped text value (search patterns).
    fn bind_text(&mut self, value: String) -> String {
        self.params.push(SqlValue::String(value));
        self.table.dialect.placeholder(self.params.len())
    }

    /// `col = ?` for a value, `col IS NULL` for null.
    fn equals(&mut self, column: &ColumnMetadata, value: &JsonValue) -> String {
        let quoted = self.table.dialect.quote_ident(&column.name);
        if value.is_null() {
            format!("{} IS NULL", quoted)
        } else {
            format!("{} = {}", quoted, self.bind(column, value))
        }
    }

    fn finish(self, sql: String) -> Statement {
        Statement::new(sql, self.params)
    }
}

/// Row operations engine.
pub struct RowOperations;

impl RowOperations {
    /// One page of rows matching the query, plus the filtered total.
    pub async fn get_rows(pool: &DbPool, table: &str, query: &RowsQuery) -> DbResult<RowsPage> {
        let columns = TableColumns::load(pool, table).await?;
        let (count, page) = build_select(&columns, query)?;

        let total = executor::fetch_count(pool, &count).await?;
        let rows = executor::fetch_rows(pool, &page).await?;

        debug!(table = %table, total, returned = rows.len(), "Fetched rows");
        Ok(RowsPage { rows, total })
    }

    /// Insert one row and return it as stored.
    pub async fn insert_row(pool: &DbPool, table: &str, data: &Row) -> DbResult<Row> {
        let columns = TableColumns::load(pool, table).await?;
        Self::insert_with_columns(pool, &columns, data).await
    }

    /// Insert using already-loaded column metadata (bulk import path).
    pub async fn insert_with_columns(
        pool: &DbPool,
        columns: &TableColumns,
        data: &Row,
    ) -> DbResult<Row> {
        let stmt = build_insert(columns, data)?;

        if columns.dialect.supports_returning() {
            return executor::fetch_optional_row(pool, &stmt)
                .await?
                .ok_or_else(|| DbError::internal("INSERT ... RETURNING produced no row"));
        }

        let outcome = executor::execute(pool, &stmt).await?;

        // MySQL: re-select through the auto-increment key when there is one
        let auto_pk = single_primary_key(&columns.columns).filter(|pk| pk.auto_increment);
        match (auto_pk, outcome.last_insert_id) {
            (Some(pk), Some(id)) if id > 0 => {
                let id = data.get(&pk.name).cloned().unwrap_or(JsonValue::from(id));
                let select = build_select_by_key(columns, pk, &id);
                Ok(executor::fetch_optional_row(pool, &select)
                    .await?
                    .unwrap_or_else(|| data.clone()))
            }
            _ => Ok(data.clone()),
        }
    }

    /// Update the row identified by its primary key and return the new row.
    pub async fn update_row(
        pool: &DbPool,
        table: &str,
        row_id: &JsonValue,
        data: &Row,
    ) -> DbResult<Row> {
        if data.is_empty() {
            return Err(DbError::invalid_input("No data provided for update"));
        }

        let columns = TableColumns::load(pool, table).await?;
        let pk = columns.primary_key()?;
        let update = build_update(&columns, pk, row_id, data)?;
        executor::execute(pool, &update).await?;

        // The key itself may have been part of the update
        let current_id = data.get(&pk.name).unwrap_or(row_id);
        let select = build_select_by_key(&columns, pk, current_id);
        let row = executor::fetch_optional_row(pool, &select)
            .await?
            .ok_or_else(|| DbError::not_found("Row not found"))?;

        info!(table = %table, "Row updated");
        Ok(row)
    }

    /// Delete the row identified by its primary key.
    pub async fn delete_row(pool: &DbPool, table: &str, row_id: &JsonValue) -> DbResult<()> {
        let columns = TableColumns::load(pool, table).await?;
        let pk = columns.primary_key()?;
        let stmt = build_delete(&columns, pk, std::slice::from_ref(row_id));

        let outcome = executor::execute(pool, &stmt).await?;
        if outcome.rows_affected == 0 {
            return Err(DbError::not_found("Row not found"));
        }

        info!(table = %table, "Row deleted");
        Ok(())
    }

    /// Delete every row whose primary key is in `ids`; returns the count removed.
    pub async fn bulk_delete(pool: &DbPool, table: &str, ids: &[JsonValue]) -> DbResult<u64> {
        if ids.is_empty() {
            return Err(DbError::invalid_input("No row ids provided"));
        }

        let columns = TableColumns::load(pool, table).await?;
        let pk = columns.primary_key()?;
        let stmt = build_delete(&columns, pk, ids);

        let outcome = executor::execute(pool, &stmt).await?;
        info!(table = %table, deleted = outcome.rows_affected, "Rows deleted");
        Ok(outcome.rows_affected)
    }
}

// =============================================================================
// Statement Builders
// =============================================================================

/// Build the `COUNT(*)` and page statements for a rows query.
fn build_select(columns: &TableColumns, query: &RowsQuery) -> DbResult<(Statement, Statement)> {
    let dialect = columns.dialect;
    let mut builder = StatementBuilder::new(columns);
    let mut conditions = Vec::new();

    for (name, value) in &query.filters {
        let column = columns.column(name)?;
        conditions.push(builder.equals(column, value));
    }

    if let Some(term) = query.search.as_deref().filter(|t| !t.is_empty()) {
        let searchable: Vec<&ColumnMetadata> = columns
            .columns
            .iter()
            .filter(|c| is_searchable_type(&c.data_type))
            .collect();
        if !searchable.is_empty() {
            let pattern = format!("%{}%", term);
            let ors: Vec<String> = searchable
                .iter()
                .map(|c| {
                    let ph = builder.bind_text(pattern.clone());
                    format!("{} LIKE {}", dialect.quote_ident(&c.name), ph)
                })
                .collect();
            conditions.push(format!("({})", ors.join(" OR ")));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let order_clause = match &query.order_by {
        Some(name) => {
            let column = columns.column(name)?;
            format!(
                " ORDER BY {} {}",
                dialect.quote_ident(&column.name),
                query.order_direction.as_sql()
            )
        }
        None => String::new(),
    };

    let table = columns.quoted_table();
    let params = builder.params;
    let count = Statement::new(
        format!("SELECT COUNT(*) FROM {}{}", table, where_clause),
        params.clone(),
    );
    let page = Statement::new(
        format!(
            "SELECT * FROM {}{}{}{}",
            table,
            where_clause,
            order_clause,
            dialect.paging_clause(query.limit, query.offset)
        ),
        params,
    );
    Ok((count, page))
}

fn build_insert(columns: &TableColumns, data: &Row) -> DbResult<Statement> {
    let dialect = columns.dialect;
    let table = columns.quoted_table();
    let returning = if dialect.supports_returning() {
        " RETURNING *"
    } else {
        ""
    };

    if data.is_empty() {
        return Ok(Statement::new(
            format!("{}{}", dialect.insert_defaults(&table), returning),
            Vec::new(),
        ));
    }

    let mut builder = StatementBuilder::new(columns);
    let mut names = Vec::with_capacity(data.len());
    let mut placeholders = Vec::with_capacity(data.len());
    for (name, value) in data {
        let column = columns.column(name)?;
        names.push(dialect.quote_ident(&column.name));
        placeholders.push(builder.bind(column, value));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}){}",
        table,
        names.join(", "),
        placeholders.join(", "),
        returning
    );
    Ok(builder.finish(sql))
}

fn build_update(
    columns: &TableColumns,
    pk: &ColumnMetadata,
    row_id: &JsonValue,
    data: &Row,
) -> DbResult<Statement> {
    let dialect = columns.dialect;
    let mut builder = StatementBuilder::new(columns);

    let mut assignments = Vec::with_capacity(data.len());
    for (name, value) in data {
        let column = columns.column(name)?;
        let ph = builder.bind(column, value);
        assignments.push(format!("{} = {}", dialect.quote_ident(&column.name), ph));
    }
    let key = builder.equals(pk, row_id);

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        columns.quoted_table(),
        assignments.join(", "),
        key
    );
    Ok(builder.finish(sql))
}

fn build_select_by_key(columns: &TableColumns, pk: &ColumnMetadata, id: &JsonValue) -> Statement {
    let mut builder = StatementBuilder::new(columns);
    let key = builder.equals(pk, id);
    let sql = format!("SELECT * FROM {} WHERE {}", columns.quoted_table(), key);
    builder.finish(sql)
}

fn build_delete(columns: &TableColumns, pk: &ColumnMetadata, ids: &[JsonValue]) -> Statement {
    let mut builder = StatementBuilder::new(columns);
    let sql = if let [id] = ids {
        let key = builder.equals(pk, id);
        format!("DELETE FROM {} WHERE {}", columns.quoted_table(), key)
    } else {
        let placeholders: Vec<String> = ids.iter().map(|id| builder.bind(pk, id)).collect();
        format!(
            "DELETE FROM {} WHERE {} IN ({})",
            columns.quoted_table(),
            columns.dialect.quote_ident(&pk.name),
            placeholders.join(", ")
        )
    };
    builder.finish(sql)
}
