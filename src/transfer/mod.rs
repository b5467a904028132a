//! Export and import of table data.
//!
//! Exports read the whole table in one unpaginated query. Imports insert row
//! by row outside a transaction: a failing row is reported and skipped, rows
//! already inserted stay.

pub mod csv_format;
pub mod sql_dump;

use crate::db::{DbPool, RowOperations, SchemaInspector, TableColumns};
use crate::error::{DbError, DbResult};
use crate::models::{ExportFormat, ImportFormat, ImportSummary, RowsQuery};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

/// Export / import engine.
pub struct DataTransfer;

impl DataTransfer {
    /// Serialize every row of `table` as pretty JSON or CSV.
    pub async fn export_data(pool: &DbPool, table: &str, format: ExportFormat) -> DbResult<String> {
        let page = RowOperations::get_rows(pool, table, &RowsQuery::new()).await?;

        let body = match format {
            ExportFormat::Json => serde_json::to_string_pretty(&page.rows)
                .map_err(|e| DbError::internal(format!("Failed to serialize rows: {}", e)))?,
            ExportFormat::Csv => csv_format::write_csv(&page.rows)?,
        };

        info!(table = %table, format = ?format, rows = page.rows.len(), "Exported table");
        Ok(body)
    }

    /// SQL script recreating `table`, or every table when `None`.
    pub async fn export_sql_dump(pool: &DbPool, table: Option<&str>) -> DbResult<String> {
        let tables = match table {
            Some(t) => vec![t.to_string()],
            None => SchemaInspector::table_names(pool).await?,
        };

        let dialect = pool.dialect();
        let mut out = String::new();
        for name in &tables {
            let columns = SchemaInspector::list_columns(pool, name).await?;
            let page = RowOperations::get_rows(pool, name, &RowsQuery::new()).await?;
            sql_dump::write_table(&mut out, dialect, name, &columns, &page.rows);
        }

        info!(tables = tables.len(), "Exported SQL dump");
        Ok(out)
    }

    /// Insert every record of `data` into `table`.
    ///
    /// A malformed document fails the whole import; a failing row only adds
    /// `Row {n}: {message}` to the summary, `n` counting data rows from 1.
    pub async fn import_data(
        pool: &DbPool,
        table: &str,
        format: ImportFormat,
        data: &str,
    ) -> DbResult<ImportSummary> {
        let records = match format {
            ImportFormat::Json => parse_json_records(data)?,
            ImportFormat::Csv => csv_format::parse_csv(data)?
                .into_iter()
                .map(JsonValue::Object)
                .collect(),
        };
        let columns = TableColumns::load(pool, table).await?;

        let mut summary = ImportSummary::default();
        for (idx, record) in records.iter().enumerate() {
            let result = match record {
                JsonValue::Object(row) => {
                    RowOperations::insert_with_columns(pool, &columns, row).await
                }
                _ => Err(DbError::invalid_input("Row must be a JSON object")),
            };
            match result {
                Ok(_) => summary.imported += 1,
                Err(e) => summary.errors.push(format!("Row {}: {}", idx + 1, e)),
            }
        }

        if !summary.errors.is_empty() {
            warn!(table = %table, failed = summary.errors.len(), "Some rows were not imported");
        }
        info!(table = %table, imported = summary.imported, "Import finished");
        Ok(summary)
    }
}

/// A JSON array of records, or a single object treated as one record.
fn parse_json_records(data: &str) -> DbResult<Vec<JsonValue>> {
    match serde_json::from_str::<JsonValue>(data) {
        Ok(JsonValue::Array(items)) => Ok(items),
        Ok(value @ JsonValue::Object(_)) => Ok(vec![value]),
        _ => Err(DbError::invalid_input("Invalid JSON format")),
    }
}

/// Filename offered to the browser for an export.
pub fn export_filename(table: &str, format: ExportFormat) -> String {
    format!("{}.{}", table, format.extension())
}

/// Filename offered for a SQL dump.
pub fn dump_filename(table: Option<&str>) -> String {
    match table {
        Some(t) => format!("{}.sql", t),
        None => "database_dump.sql".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;
    use serde_json::json;
    use sqlx::SqlitePool;

    async fn people_pool() -> DbPool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::raw_sql(
            "CREATE TABLE people (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER,
                score REAL,
                active BOOLEAN
            );
            INSERT INTO people (name, age, score, active) VALUES ('Ann, \"the\" first', 31, 1.5, 1);
            INSERT INTO people (name, age, score, active) VALUES ('Bob', NULL, NULL, 0);",
        )
        .execute(&pool)
        .await
        .unwrap();
        DbPool::SQLite(pool)
    }

    #[test]
    fn test_parse_json_records() {
        assert_eq!(parse_json_records("[{\"a\":1},{\"a\":2}]").unwrap().len(), 2);
        assert_eq!(parse_json_records("{\"a\":1}").unwrap().len(), 1);
        for bad in ["not json", "42", "\"text\""] {
            assert_eq!(
                parse_json_records(bad).unwrap_err().to_string(),
                "Invalid JSON format"
            );
        }
    }

    #[test]
    fn test_filenames() {
        assert_eq!(export_filename("users", ExportFormat::Csv), "users.csv");
        assert_eq!(dump_filename(Some("users")), "users.sql");
        assert_eq!(dump_filename(None), "database_dump.sql");
    }

    #[tokio::test]
    async fn test_export_json_is_pretty_array() {
        let pool = people_pool().await;
        let body = DataTransfer::export_data(&pool, "people", ExportFormat::Json)
            .await
            .unwrap();
        assert!(body.starts_with("[\n  {\n    \"id\": 1,"));

        let parsed: Vec<Row> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["age"], JsonValue::Null);
        assert_eq!(parsed[0]["active"], json!(true));
    }

    #[tokio::test]
    async fn test_export_csv_header_and_quoting() {
        let pool = people_pool().await;
        let body = DataTransfer::export_data(&pool, "people", ExportFormat::Csv)
            .await
            .unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some("id,name,age,score,active"));
        assert_eq!(
            lines.next(),
            Some("1,\"Ann, \"\"the\"\" first\",31,1.5,true")
        );
        assert_eq!(lines.next(), Some("2,Bob,,,false"));
    }

    #[tokio::test]
    async fn test_import_reports_failed_rows() {
        let pool = people_pool().await;
        let data = json!([
            {"name": "Cy", "age": 40},
            {"name": null},
            {"name": "Di", "nickname": "dd"},
            "not an object",
        ])
        .to_string();

        let summary = DataTransfer::import_data(&pool, "people", ImportFormat::Json, &data)
            .await
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.errors.len(), 3);
        assert!(summary.errors[0].starts_with("Row 2: "));
        assert!(summary.errors[1].contains("Unknown column 'nickname'"));
        assert_eq!(summary.errors[2], "Row 4: Row must be a JSON object");
    }

    #[tokio::test]
    async fn test_import_csv_coerces_types() {
        let pool = people_pool().await;
        let csv = "name,age,score,active\nEve,27,2.25,true\nFay,NULL,,false\n";
        let summary = DataTransfer::import_data(&pool, "people", ImportFormat::Csv, csv)
            .await
            .unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, errors: vec![] });

        let page = RowOperations::get_rows(
            &pool,
            "people",
            &RowsQuery::new().with_filter("name", json!("Eve")),
        )
        .await
        .unwrap();
        assert_eq!(page.rows[0]["age"], json!(27));
        assert_eq!(page.rows[0]["score"], json!(2.25));
        assert_eq!(page.rows[0]["active"], json!(true));
    }

    #[tokio::test]
    async fn test_import_invalid_document() {
        let pool = people_pool().await;
        let err = DataTransfer::import_data(&pool, "people", ImportFormat::Csv, "name\n")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));

        let err = DataTransfer::import_data(&pool, "missing", ImportFormat::Json, "[]")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Table 'missing' not found");
    }

    #[tokio::test]
    async fn test_sql_dump_all_tables() {
        let pool = people_pool().await;
        let dump = DataTransfer::export_sql_dump(&pool, None).await.unwrap();
        assert!(dump.starts_with("-- Table: people\nDROP TABLE IF EXISTS \"people\";\n"));
        assert!(dump.contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(dump.contains(
            "INSERT INTO \"people\" (\"id\", \"name\", \"age\", \"score\", \"active\") \
             VALUES (2, 'Bob', NULL, NULL, FALSE);"
        ));
    }
}
