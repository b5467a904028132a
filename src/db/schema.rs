//! Schema introspection module.
//!
//! This module provides database schema introspection functionality
//! for SQLite, PostgreSQL, and MySQL databases.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.

use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, IndexMetadata, IndexType, TableMetadata};
use std::collections::HashMap;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List user tables with a row count and column count for each.
    ///
    /// Counts are a snapshot taken table by table, not a consistent view.
    pub async fn list_tables(pool: &DbPool) -> DbResult<Vec<TableMetadata>> {
        let names = Self::table_names(pool).await?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let row_count = Self::count_rows(pool, &name).await?;
            let column_count = Self::list_columns(pool, &name).await?.len();
            tables.push(TableMetadata::new(name, row_count, column_count));
        }

        debug!(count = tables.len(), db_type = %pool.db_type(), "Listed tables");
        Ok(tables)
    }

    /// Names of user tables, sorted.
    pub async fn table_names(pool: &DbPool) -> DbResult<Vec<String>> {
        impl_db_dispatch!(pool, {
            MySql(p) => mysql::table_names(p).await,
            Postgres(p) => postgres::table_names(p).await,
            SQLite(p) => sqlite::table_names(p).await,
        })
    }

    /// Describe a table's columns in declaration order.
    pub async fn list_columns(pool: &DbPool, table: &str) -> DbResult<Vec<ColumnMetadata>> {
        let columns = impl_db_dispatch!(pool, {
            MySql(p) => mysql::list_columns(p, table).await?,
            Postgres(p) => postgres::list_columns(p, table).await?,
            SQLite(p) => sqlite::list_columns(p, table).await?,
        });

        if columns.is_empty() {
            return Err(DbError::table_not_found(table));
        }
        Ok(columns)
    }

    /// List a table's indexes with their ordered columns.
    pub async fn list_indexes(pool: &DbPool, table: &str) -> DbResult<Vec<IndexMetadata>> {
        impl_db_dispatch!(pool, {
            MySql(p) => mysql::list_indexes(p, table).await,
            Postgres(p) => postgres::list_indexes(p, table).await,
            SQLite(p) => sqlite::list_indexes(p, table).await,
        })
    }

    /// `SELECT COUNT(*)` over the whole table.
    pub async fn count_rows(pool: &DbPool, table: &str) -> DbResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            pool.dialect().quote_ident(table)
        );
        let count: i64 = impl_db_dispatch!(pool, {
            MySql(p) => sqlx::query_scalar(&sql).fetch_one(p).await?,
            Postgres(p) => sqlx::query_scalar(&sql).fetch_one(p).await?,
            SQLite(p) => sqlx::query_scalar(&sql).fetch_one(p).await?,
        });
        Ok(count.max(0) as u64)
    }
}

/// The only primary key column, or `None` for keyless and composite-key tables.
pub fn single_primary_key(columns: &[ColumnMetadata]) -> Option<&ColumnMetadata> {
    let mut keys = columns.iter().filter(|c| c.primary_key);
    match (keys.next(), keys.next()) {
        (Some(pk), None) => Some(pk),
        _ => None,
    }
}

/// Group `(index, column, is_unique, is_primary)` entries into indexes,
/// keeping first-seen index order and entry order within each index.
fn group_index_columns(entries: Vec<(String, String, bool, bool)>) -> Vec<IndexMetadata> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, (Vec<String>, bool, bool)> = HashMap::new();

    for (index, column, unique, primary) in entries {
        let entry = grouped.entry(index.clone()).or_insert_with(|| {
            order.push(index);
            (Vec::new(), unique, primary)
        });
        entry.0.push(column);
    }

    order
        .into_iter()
        .filter_map(|name| {
            let (columns, unique, primary) = grouped.remove(&name)?;
            let index_type = if primary {
                IndexType::Primary
            } else if unique {
                IndexType::Unique
            } else {
                IndexType::Index
            };
            Some(IndexMetadata::new(name, columns, index_type))
        })
        .collect()
}

// =============================================================================
// SQL Query Templates
// =============================================================================
//
// Centralized SQL queries for schema introspection. Each database has its own
// submodule with queries adapted to its specific system catalogs.

mod queries {
    pub mod postgres {
        pub const TABLE_NAMES: &str = r#"
            SELECT tablename::text AS table_name
            FROM pg_tables
            WHERE schemaname = 'public'
            ORDER BY tablename
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            a.attname::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            NOT a.attnotnull AS is_nullable,
            pg_get_expr(d.adbin, d.adrelid) AS column_default,
            a.attidentity <> '' AS is_identity,
            COALESCE(bool_or(ix.indisprimary), false) AS is_primary_key,
            COALESCE(bool_or(NOT ix.indisprimary), false) AS is_indexed
        FROM pg_attribute a
        LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
        LEFT JOIN pg_index ix ON ix.indrelid = a.attrelid AND a.attnum = ANY(ix.indkey)
        WHERE a.attrelid = to_regclass(format('public.%I', $1::text))
        AND a.attnum > 0
        AND NOT a.attisdropped
        GROUP BY a.attnum, a.attname, a.atttypid, a.atttypmod, a.attnotnull,
                 d.adbin, d.adrelid, a.attidentity
        ORDER BY a.attnum
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            kcu.column_name::text AS column_name,
            ccu.table_name::text AS foreign_table_name,
            ccu.column_name::text AS foreign_column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage ccu
            ON ccu.constraint_name = tc.constraint_name
            AND ccu.table_schema = tc.table_schema
        WHERE tc.table_name = $1
        AND tc.table_schema = 'public'
        AND tc.constraint_type = 'FOREIGN KEY'
        "#;

        pub const DESCRIBE_INDEXES: &str = r#"
        SELECT
            i.relname::text AS index_name,
            array_agg(a.attname::text ORDER BY array_position(ix.indkey::int2[], a.attnum)) AS column_names,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary
        FROM pg_index ix
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = ANY(ix.indkey)
        WHERE ix.indrelid = to_regclass(format('public.%I', $1::text))
        GROUP BY i.relname, ix.indisunique, ix.indisprimary
        ORDER BY i.relname
        "#;
    }

    pub mod mysql {
        pub const TABLE_NAMES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const TABLE_EXISTS: &str = r#"
            SELECT COUNT(*)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_NAME USING utf8) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8) AS REFERENCED_COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_NAME = ?
        AND TABLE_SCHEMA = DATABASE()
        AND REFERENCED_TABLE_NAME IS NOT NULL
        "#;
    }

    pub mod sqlite {
        pub const TABLE_NAMES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const TABLE_INFO: &str = "SELECT * FROM pragma_table_info(?) ORDER BY cid";
        pub const FOREIGN_KEY_LIST: &str = "SELECT * FROM pragma_foreign_key_list(?)";
        pub const INDEX_LIST: &str = "SELECT * FROM pragma_index_list(?) ORDER BY seq";
        pub const INDEX_INFO: &str = "SELECT * FROM pragma_index_info(?) ORDER BY seqno";
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn table_names(pool: &PgPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::TABLE_NAMES)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("table_name")).collect())
    }

    pub async fn list_columns(pool: &PgPool, table: &str) -> DbResult<Vec<ColumnMetadata>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let foreign_keys = fetch_foreign_keys(pool, table).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let column_type: String = row.get("column_type");
                let nullable: bool = row.get("is_nullable");
                let default_value: Option<String> = row.try_get("column_default").ok().flatten();
                let is_identity: bool = row.try_get("is_identity").unwrap_or(false);
                let is_pk: bool = row.get("is_primary_key");
                let indexed: bool = row.get("is_indexed");

                let auto_increment = is_identity
                    || default_value
                        .as_deref()
                        .is_some_and(|d| d.contains("nextval"));

                let mut col = ColumnMetadata::new(&name, column_type, nullable)
                    .with_primary_key(is_pk)
                    .with_auto_increment(auto_increment)
                    .with_indexed(indexed);

                if let Some(def) = default_value {
                    col = col.with_default(def);
                }
                if let Some((ref_table, ref_column)) = foreign_keys.get(&name) {
                    col = col.with_foreign_key(ref_table, ref_column);
                }
                col
            })
            .collect())
    }

    async fn fetch_foreign_keys(
        pool: &PgPool,
        table: &str,
    ) -> DbResult<HashMap<String, (String, String)>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_FOREIGN_KEYS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let column: String = row.get("column_name");
                let ref_table: String = row.get("foreign_table_name");
                let ref_column: String = row.get("foreign_column_name");
                (column, (ref_table, ref_column))
            })
            .collect())
    }

    pub async fn list_indexes(pool: &PgPool, table: &str) -> DbResult<Vec<IndexMetadata>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_INDEXES)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name: String = row.get("index_name");
                let columns: Vec<String> = row.get("column_names");
                let is_unique: bool = row.get("is_unique");
                let is_primary: bool = row.get("is_primary");

                if columns.is_empty() {
                    return None;
                }
                let index_type = if is_primary {
                    IndexType::Primary
                } else if is_unique {
                    IndexType::Unique
                } else {
                    IndexType::Index
                };
                Some(IndexMetadata::new(name, columns, index_type))
            })
            .collect())
    }
}

mod mysql {
    use super::*;
    use crate::db::dialect::Dialect;
    use crate::models::DatabaseType;
    use sqlx::{MySqlPool, Row};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    /// Safely get an optional string from a MySQL row.
    fn get_optional_string(row: &sqlx::mysql::MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    /// Try to get a u64 value from a row, handling MySQL version differences.
    fn try_get_u64(row: &sqlx::mysql::MySqlRow, column: &str) -> Option<u64> {
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
            return Some(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(column) {
            return Some(v as u64);
        }
        None
    }

    fn quoted(table: &str) -> String {
        Dialect::new(DatabaseType::MySQL).quote_ident(table)
    }

    pub async fn table_names(pool: &MySqlPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::TABLE_NAMES)
            .fetch_all(pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect())
    }

    /// `SHOW` statements take the table name as an identifier, so confirm
    /// the table exists through a bound lookup first.
    async fn table_exists(pool: &MySqlPool, table: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(queries::mysql::TABLE_EXISTS)
            .bind(table)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn list_columns(pool: &MySqlPool, table: &str) -> DbResult<Vec<ColumnMetadata>> {
        if !table_exists(pool, table).await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!("SHOW COLUMNS FROM {}", quoted(table)))
            .fetch_all(pool)
            .await?;
        let foreign_keys = fetch_foreign_keys(pool, table).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "Field");
                let column_type = get_string(row, "Type");
                let nullable = get_string(row, "Null");
                let key = get_string(row, "Key");
                let default_value = get_optional_string(row, "Default");
                let extra = get_string(row, "Extra");

                let mut col = ColumnMetadata::new(&name, column_type, nullable == "YES")
                    .with_primary_key(key == "PRI")
                    .with_auto_increment(extra.to_lowercase().contains("auto_increment"))
                    .with_indexed(key == "MUL" || key == "UNI");

                if let Some(def) = default_value {
                    col = col.with_default(def);
                }
                if let Some((ref_table, ref_column)) = foreign_keys.get(&name) {
                    col = col.with_foreign_key(ref_table, ref_column);
                }
                col
            })
            .collect())
    }

    async fn fetch_foreign_keys(
        pool: &MySqlPool,
        table: &str,
    ) -> DbResult<HashMap<String, (String, String)>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_FOREIGN_KEYS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let column = get_string(row, "COLUMN_NAME");
                let ref_table = get_string(row, "REFERENCED_TABLE_NAME");
                let ref_column = get_string(row, "REFERENCED_COLUMN_NAME");
                (column, (ref_table, ref_column))
            })
            .collect())
    }

    pub async fn list_indexes(pool: &MySqlPool, table: &str) -> DbResult<Vec<IndexMetadata>> {
        if !table_exists(pool, table).await? {
            return Err(DbError::table_not_found(table));
        }

        let rows = sqlx::query(&format!("SHOW INDEX FROM {}", quoted(table)))
            .fetch_all(pool)
            .await?;

        let mut entries: Vec<(u64, String, String, bool, bool)> = rows
            .iter()
            .map(|row| {
                let key_name = get_string(row, "Key_name");
                let column = get_string(row, "Column_name");
                let seq = try_get_u64(row, "Seq_in_index").unwrap_or(0);
                let non_unique = try_get_u64(row, "Non_unique").unwrap_or(1);
                let is_primary = key_name == "PRIMARY";
                (seq, key_name, column, non_unique == 0, is_primary)
            })
            .collect();
        // Stable sort: indexes keep their first-seen order
        entries.sort_by_key(|(seq, ..)| *seq);

        Ok(group_index_columns(
            entries
                .into_iter()
                .map(|(_, name, column, unique, primary)| (name, column, unique, primary))
                .collect(),
        ))
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Row, SqlitePool};
    use std::collections::HashSet;

    fn get_i64(row: &SqliteRow, column: &str) -> i64 {
        row.try_get::<i64, _>(column).unwrap_or(0)
    }

    pub async fn table_names(pool: &SqlitePool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::TABLE_NAMES)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    pub async fn list_columns(pool: &SqlitePool, table: &str) -> DbResult<Vec<ColumnMetadata>> {
        let rows = sqlx::query(queries::sqlite::TABLE_INFO)
            .bind(table)
            .fetch_all(pool)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let foreign_keys = fetch_foreign_keys(pool, table).await?;
        let indexed: HashSet<String> = list_indexes(pool, table)
            .await?
            .into_iter()
            .flat_map(|idx| idx.columns)
            .collect();

        // Only a lone INTEGER PRIMARY KEY aliases the rowid
        let pk_count = rows.iter().filter(|row| get_i64(row, "pk") > 0).count();

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let data_type: String = row.try_get("type").unwrap_or_default();
                let notnull = get_i64(row, "notnull");
                let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();
                let is_pk = get_i64(row, "pk") > 0;
                let auto_increment =
                    is_pk && pk_count == 1 && data_type.to_uppercase() == "INTEGER";

                let mut col = ColumnMetadata::new(&name, &data_type, notnull == 0)
                    .with_primary_key(is_pk)
                    .with_auto_increment(auto_increment)
                    .with_indexed(indexed.contains(&name));

                if let Some(def) = default_value {
                    col = col.with_default(def);
                }
                if let Some((ref_table, ref_column)) = foreign_keys.get(&name) {
                    col = col.with_foreign_key(ref_table, ref_column);
                }
                col
            })
            .collect())
    }

    async fn fetch_foreign_keys(
        pool: &SqlitePool,
        table: &str,
    ) -> DbResult<HashMap<String, (String, String)>> {
        let rows = sqlx::query(queries::sqlite::FOREIGN_KEY_LIST)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let column: String = row.get("from");
                let ref_table: String = row.get("table");
                // NULL when the reference targets the parent's primary key implicitly
                let ref_column: String = row
                    .try_get::<Option<String>, _>("to")
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                (column, (ref_table, ref_column))
            })
            .collect())
    }

    pub async fn list_indexes(pool: &SqlitePool, table: &str) -> DbResult<Vec<IndexMetadata>> {
        let idx_list = sqlx::query(queries::sqlite::INDEX_LIST)
            .bind(table)
            .fetch_all(pool)
            .await?;

        let mut indexes = Vec::with_capacity(idx_list.len());
        for idx_row in &idx_list {
            let name: String = idx_row.get("name");
            let is_unique = get_i64(idx_row, "unique") != 0;
            let origin: String = idx_row.try_get("origin").unwrap_or_default();

            let columns = fetch_index_columns(pool, &name).await?;
            if columns.is_empty() {
                continue;
            }

            let lower = name.to_lowercase();
            let index_type = if lower.contains("primary") || origin == "pk" {
                IndexType::Primary
            } else if is_unique {
                IndexType::Unique
            } else if lower.contains("fk_") {
                IndexType::Foreign
            } else {
                IndexType::Index
            };
            indexes.push(IndexMetadata::new(name, columns, index_type));
        }
        Ok(indexes)
    }

    async fn fetch_index_columns(pool: &SqlitePool, index_name: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::INDEX_INFO)
            .bind(index_name)
            .fetch_all(pool)
            .await?;
        // Expression index entries have a NULL name
        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<Option<String>, _>("name").ok().flatten())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    async fn sqlite_pool(ddl: &[&str]) -> DbPool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        for stmt in ddl {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        DbPool::SQLite(pool)
    }

    #[test]
    fn test_single_primary_key() {
        let id = ColumnMetadata::new("id", "INTEGER", false).with_primary_key(true);
        let name = ColumnMetadata::new("name", "TEXT", true);
        let columns = vec![id.clone(), name.clone()];
        assert_eq!(single_primary_key(&columns), Some(&id));

        let composite = vec![id.clone(), name.with_primary_key(true)];
        assert_eq!(single_primary_key(&composite), None);
        assert_eq!(single_primary_key(&[]), None);
    }

    #[test]
    fn test_group_index_columns() {
        let entries = vec![
            ("PRIMARY".to_string(), "id".to_string(), true, true),
            ("idx_ab".to_string(), "a".to_string(), false, false),
            ("idx_ab".to_string(), "b".to_string(), false, false),
            ("uniq_email".to_string(), "email".to_string(), true, false),
        ];
        let indexes = group_index_columns(entries);
        assert_eq!(indexes.len(), 3);
        assert_eq!(indexes[0].index_type, IndexType::Primary);
        assert_eq!(indexes[1].columns, ["a", "b"]);
        assert_eq!(indexes[1].index_type, IndexType::Index);
        assert_eq!(indexes[2].index_type, IndexType::Unique);
    }

    #[tokio::test]
    async fn test_sqlite_columns_and_foreign_keys() {
        let pool = sqlite_pool(&[
            "CREATE TABLE authors (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL)",
            "CREATE TABLE books (id INTEGER PRIMARY KEY, author_id INTEGER REFERENCES authors(id), title TEXT DEFAULT 'untitled')",
            "CREATE INDEX fk_books_author ON books (author_id)",
        ])
        .await;

        let columns = SchemaInspector::list_columns(&pool, "books").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns.iter().filter(|c| c.primary_key).count(), 1);

        let id = &columns[0];
        assert!(id.primary_key);
        assert!(id.auto_increment);

        let author_id = &columns[1];
        let fk = author_id.foreign_key.as_ref().unwrap();
        assert_eq!(fk.table, "authors");
        assert_eq!(fk.column, "id");
        assert!(author_id.indexed);
        assert!(author_id.nullable);

        let title = &columns[2];
        assert_eq!(title.default_value.as_deref(), Some("'untitled'"));
        assert!(title.foreign_key.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_indexes_classified() {
        let pool = sqlite_pool(&[
            "CREATE TABLE t (code TEXT PRIMARY KEY, email TEXT UNIQUE, a INTEGER, b INTEGER)",
            "CREATE INDEX idx_t_ab ON t (a, b)",
            "CREATE INDEX fk_t_a ON t (a)",
        ])
        .await;

        let indexes = SchemaInspector::list_indexes(&pool, "t").await.unwrap();
        let by_name =
            |n: &str| indexes.iter().find(|i| i.name == n).unwrap().clone();

        assert_eq!(by_name("idx_t_ab").columns, ["a", "b"]);
        assert_eq!(by_name("idx_t_ab").index_type, IndexType::Index);
        assert_eq!(by_name("fk_t_a").index_type, IndexType::Foreign);

        let pk = indexes.iter().find(|i| i.columns == ["code"]).unwrap();
        assert_eq!(pk.index_type, IndexType::Primary);
        let unique = indexes.iter().find(|i| i.columns == ["email"]).unwrap();
        assert_eq!(unique.index_type, IndexType::Unique);
    }

    #[tokio::test]
    async fn test_sqlite_list_tables_counts() {
        let pool = sqlite_pool(&[
            "CREATE TABLE b (x INTEGER)",
            "CREATE TABLE a (x INTEGER, y TEXT)",
            "INSERT INTO a VALUES (1, 'one'), (2, 'two')",
        ])
        .await;

        let tables = SchemaInspector::list_tables(&pool).await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0], TableMetadata::new("a", 2, 2));
        assert_eq!(tables[1], TableMetadata::new("b", 0, 1));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let pool = sqlite_pool(&[]).await;
        let err = SchemaInspector::list_columns(&pool, "missing")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Table 'missing' not found");
    }

    #[tokio::test]
    async fn test_composite_key_is_not_auto_increment() {
        let pool = sqlite_pool(&[
            "CREATE TABLE keyed (id INTEGER PRIMARY KEY, v TEXT)",
            "CREATE TABLE pair (a INTEGER, b INTEGER, PRIMARY KEY (a, b))",
        ])
        .await;

        let keyed = SchemaInspector::list_columns(&pool, "keyed").await.unwrap();
        assert!(keyed[0].auto_increment);
        assert_eq!(single_primary_key(&keyed).map(|c| c.name.as_str()), Some("id"));

        let pair = SchemaInspector::list_columns(&pool, "pair").await.unwrap();
        assert!(pair.iter().all(|c| c.primary_key && !c.auto_increment));
        assert!(single_primary_key(&pair).is_none());
    }
}
