//! Parameter binding utilities for database queries.
//!
//! This module converts request JSON into `SqlValue`s steered by the target
//! column's type category, and binds them to database-specific query objects.

use crate::db::types::TypeCategory;
use crate::models::SqlValue;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

/// Convert a request value into a bind value for a column of `category`.
///
/// Strings are parsed into the column's native shape when they can be, so
/// CSV text reaches typed columns. Anything unparseable is passed through
/// as text and left to the database to accept or reject.
pub fn to_sql_value(value: &JsonValue, category: TypeCategory) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Float(f)
            } else {
                SqlValue::String(n.to_string())
            }
        }
        JsonValue::String(s) => coerce_string(s, category),
        JsonValue::Array(_) | JsonValue::Object(_) => SqlValue::Json(value.clone()),
    }
}

fn coerce_string(s: &str, category: TypeCategory) -> SqlValue {
    let trimmed = s.trim();
    let parsed = match category {
        TypeCategory::Integer => trimmed.parse::<i64>().ok().map(SqlValue::Int),
        TypeCategory::Float => trimmed.parse::<f64>().ok().map(SqlValue::Float),
        TypeCategory::Boolean => parse_bool(trimmed).map(SqlValue::Bool),
        TypeCategory::Json => serde_json::from_str::<JsonValue>(trimmed)
            .ok()
            .map(SqlValue::Json),
        TypeCategory::Binary => STANDARD.decode(trimmed).ok().map(SqlValue::Bytes),
        _ => None,
    };
    parsed.unwrap_or_else(|| SqlValue::String(s.to_string()))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Json(v) => query.bind(Json(v)),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q SqlValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        // SQLite doesn't have native JSON type, store as string
        SqlValue::Json(v) => query.bind(v.to_string()),
    }
}
