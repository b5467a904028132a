//! Query execution engine.
//!
//! This module runs two kinds of SQL:
//! - verbatim user SQL from the query console (`QueryExecutor::execute_query`),
//!   timed and bounded by the configured timeout
//! - statements built by the row and transfer layers (`Statement`), whose
//!   values are always bound as parameters
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and write operations
//! - `postgres`: PostgreSQL-specific fetch and write operations
//! - `sqlite`: SQLite-specific fetch and write operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{QueryResult, Row, SqlValue};
use futures_util::StreamExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub rows_affected: u64,
    /// MySQL only; other engines report ids through `RETURNING`
    pub last_insert_id: Option<u64>,
}

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor {
    query_timeout: Option<Duration>,
}

impl QueryExecutor {
    /// `None` disables the timeout.
    pub fn new(query_timeout: Option<Duration>) -> Self {
        Self { query_timeout }
    }

    /// Execute verbatim SQL and return its rows.
    ///
    /// No parameter binding, no validation and no transaction. Columns come
    /// from the first row's metadata, so statements that return no rows
    /// produce empty columns.
    pub async fn execute_query(&self, pool: &DbPool, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();

        debug!(
            sql = %sql,
            timeout_secs = ?self.query_timeout.map(|t| t.as_secs()),
            "Executing query"
        );

        let (columns, rows) = match pool {
            DbPool::MySql(p) => {
                let rows = with_timeout(self.query_timeout, mysql::fetch_raw(p, sql)).await?;
                process_rows(rows)
            }
            DbPool::Postgres(p) => {
                let rows = with_timeout(self.query_timeout, postgres::fetch_raw(p, sql)).await?;
                process_rows(rows)
            }
            DbPool::SQLite(p) => {
                let rows = with_timeout(self.query_timeout, sqlite::fetch_raw(p, sql)).await?;
                process_rows(rows)
            }
        };

        let execution_time = start.elapsed().as_secs_f64() * 1000.0;
        debug!(rows = rows.len(), execution_time_ms = execution_time, "Query finished");
        Ok(QueryResult::new(columns, rows, execution_time))
    }
}

/// Fetch every row a bound statement returns.
pub async fn fetch_rows(pool: &DbPool, stmt: &Statement) -> DbResult<Vec<Row>> {
    debug!(sql = %stmt.sql, params = stmt.params.len(), "Fetching rows");
    let rows = impl_db_dispatch!(pool, {
        MySql(p) => process_rows(mysql::fetch_all(p, stmt).await?).1,
        Postgres(p) => process_rows(postgres::fetch_all(p, stmt).await?).1,
        SQLite(p) => process_rows(sqlite::fetch_all(p, stmt).await?).1,
    });
    Ok(rows)
}

/// Fetch the first row a bound statement returns, if any.
pub async fn fetch_optional_row(pool: &DbPool, stmt: &Statement) -> DbResult<Option<Row>> {
    Ok(fetch_rows(pool, stmt).await?.into_iter().next())
}

/// Run a bound `SELECT COUNT(*)`-style statement.
pub async fn fetch_count(pool: &DbPool, stmt: &Statement) -> DbResult<u64> {
    debug!(sql = %stmt.sql, params = stmt.params.len(), "Counting rows");
    let count = impl_db_dispatch!(pool, {
        MySql(p) => mysql::fetch_count(p, stmt).await?,
        Postgres(p) => postgres::fetch_count(p, stmt).await?,
        SQLite(p) => sqlite::fetch_count(p, stmt).await?,
    });
    Ok(count.max(0) as u64)
}

/// Execute a bound statement that returns no rows.
pub async fn execute(pool: &DbPool, stmt: &Statement) -> DbResult<WriteOutcome> {
    debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing statement");
    impl_db_dispatch!(pool, {
        MySql(p) => mysql::execute(p, stmt).await,
        Postgres(p) => postgres::execute(p, stmt).await,
        SQLite(p) => sqlite::execute(p, stmt).await,
    })
}

/// Execute unbound SQL text, e.g. DDL built by the schema mutator.
pub async fn execute_sql(pool: &DbPool, sql: &str) -> DbResult<u64> {
    debug!(sql = %sql, "Executing DDL");
    let result = impl_db_dispatch!(pool, {
        MySql(p) => sqlx::raw_sql(sql).execute(p).await?.rows_affected(),
        Postgres(p) => sqlx::raw_sql(sql).execute(p).await?.rows_affected(),
        SQLite(p) => sqlx::raw_sql(sql).execute(p).await?.rows_affected(),
    });
    Ok(result)
}

/// Convert fetched rows into (column names, JSON rows).
fn process_rows<R: RowToJson>(rows: Vec<R>) -> (Vec<String>, Vec<Row>) {
    let columns = rows
        .first()
        .map(|row| row.column_names())
        .unwrap_or_default();
    let json_rows = rows.iter().map(|r| r.to_json_map()).collect();
    (columns, json_rows)
}

// =============================================================================
// Common Helper Functions
// =============================================================================

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match limit {
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(timeout_error("query execution", limit)),
        },
        None => fut.await,
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(DbError::from)?);
    }
    Ok(rows)
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs() as u32)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    /// Unprepared text protocol: some statements (e.g. `CREATE PROCEDURE`)
    /// cannot be prepared.
    pub async fn fetch_raw(pool: &MySqlPool, sql: &str) -> DbResult<Vec<MySqlRow>> {
        use sqlx::Executor;
        let results = pool.fetch(sql).collect::<Vec<_>>().await;
        collect_rows(results)
    }

    pub async fn fetch_all(pool: &MySqlPool, stmt: &Statement) -> DbResult<Vec<MySqlRow>> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_mysql_param(query, param);
        }
        Ok(query.fetch_all(pool).await?)
    }

    pub async fn fetch_count(pool: &MySqlPool, stmt: &Statement) -> DbResult<i64> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_mysql_param(query, param);
        }
        let row = query.fetch_one(pool).await?;
        Ok(sqlx::Row::try_get::<i64, _>(&row, 0)?)
    }

    pub async fn execute(pool: &MySqlPool, stmt: &Statement) -> DbResult<WriteOutcome> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_mysql_param(query, param);
        }
        let result = query.execute(pool).await?;
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_id()),
        })
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    /// Simple query protocol: allows several `;`-separated statements.
    pub async fn fetch_raw(pool: &PgPool, sql: &str) -> DbResult<Vec<PgRow>> {
        use sqlx::Executor;
        let results = pool.fetch(sql).collect::<Vec<_>>().await;
        collect_rows(results)
    }

    pub async fn fetch_all(pool: &PgPool, stmt: &Statement) -> DbResult<Vec<PgRow>> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_postgres_param(query, param);
        }
        Ok(query.fetch_all(pool).await?)
    }

    pub async fn fetch_count(pool: &PgPool, stmt: &Statement) -> DbResult<i64> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_postgres_param(query, param);
        }
        let row = query.fetch_one(pool).await?;
        Ok(sqlx::Row::try_get::<i64, _>(&row, 0)?)
    }

    pub async fn execute(pool: &PgPool, stmt: &Statement) -> DbResult<WriteOutcome> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_postgres_param(query, param);
        }
        let result = query.execute(pool).await?;
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_raw(pool: &SqlitePool, sql: &str) -> DbResult<Vec<SqliteRow>> {
        use sqlx::Executor;
        let results = pool.fetch(sql).collect::<Vec<_>>().await;
        collect_rows(results)
    }

    pub async fn fetch_all(pool: &SqlitePool, stmt: &Statement) -> DbResult<Vec<SqliteRow>> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_sqlite_param(query, param);
        }
        Ok(query.fetch_all(pool).await?)
    }

    pub async fn fetch_count(pool: &SqlitePool, stmt: &Statement) -> DbResult<i64> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_sqlite_param(query, param);
        }
        let row = query.fetch_one(pool).await?;
        Ok(sqlx::Row::try_get::<i64, _>(&row, 0)?)
    }

    pub async fn execute(pool: &SqlitePool, stmt: &Statement) -> DbResult<WriteOutcome> {
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_sqlite_param(query, param);
        }
        let result = query.execute(pool).await?;
        Ok(WriteOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }
}
