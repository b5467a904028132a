//! Integration tests for export / import.

use db_admin_server::db::{ConnectionManager, DbPool, QueryExecutor, RowOperations};
use db_admin_server::models::{
    ConnectionConfig, ExportFormat, ImportFormat, NewConnection, RowsQuery,
};
use db_admin_server::transfer::DataTransfer;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_db(schema: &str) -> (Arc<ConnectionManager>, DbPool, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("transfer.sqlite");

    let config = ConnectionConfig::from_request(NewConnection {
        file_path: Some(path.to_str().unwrap().to_string()),
        ..NewConnection::default()
    })
    .unwrap();

    let manager = Arc::new(ConnectionManager::new());
    manager.connect(&config).await.unwrap();
    let pool = manager.get_pool(&config.id).await.unwrap();

    if let DbPool::SQLite(p) = &pool {
        sqlx::raw_sql(schema).execute(p).await.unwrap();
    }
    (manager, pool, dir)
}

const NOTES_SCHEMA: &str = "
    CREATE TABLE notes (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT,
        rating REAL,
        pinned BOOLEAN
    );
    CREATE TABLE notes_copy (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT,
        rating REAL,
        pinned BOOLEAN
    );
    INSERT INTO notes VALUES (1, 'Groceries, weekly', 'eggs, \"free range\" milk', 4.5, 1);
    INSERT INTO notes VALUES (2, 'Quote', 'She said \"hi\"
and left', NULL, 0);
    INSERT INTO notes VALUES (3, 'Plain', NULL, 2, NULL);
";

async fn all_rows(pool: &DbPool, table: &str) -> Vec<db_admin_server::models::Row> {
    RowOperations::get_rows(pool, table, &RowsQuery::new())
        .await
        .unwrap()
        .rows
}

#[tokio::test]
async fn test_csv_roundtrip_preserves_commas_and_quotes() {
    let (_manager, pool, _dir) = setup_db(NOTES_SCHEMA).await;

    let csv = DataTransfer::export_data(&pool, "notes", ExportFormat::Csv)
        .await
        .unwrap();
    assert!(csv.starts_with("id,title,body,rating,pinned\n"));

    let summary = DataTransfer::import_data(&pool, "notes_copy", ImportFormat::Csv, &csv)
        .await
        .unwrap();
    assert_eq!(summary.imported, 3, "errors: {:?}", summary.errors);
    assert!(summary.errors.is_empty());

    assert_eq!(all_rows(&pool, "notes_copy").await, all_rows(&pool, "notes").await);
}

#[tokio::test]
async fn test_json_roundtrip_is_lossless() {
    let (_manager, pool, _dir) = setup_db(NOTES_SCHEMA).await;

    let json = DataTransfer::export_data(&pool, "notes", ExportFormat::Json)
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 3);

    let summary = DataTransfer::import_data(&pool, "notes_copy", ImportFormat::Json, &json)
        .await
        .unwrap();
    assert_eq!(summary.imported, 3);

    let copied = all_rows(&pool, "notes_copy").await;
    assert_eq!(copied, all_rows(&pool, "notes").await);
    assert_eq!(copied[0]["rating"], json!(4.5));
    assert_eq!(copied[0]["pinned"], json!(true));
    assert_eq!(copied[2]["pinned"], Value::Null);
}

#[tokio::test]
async fn test_import_continues_past_failing_row() {
    let (_manager, pool, _dir) = setup_db(
        "CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER)",
    )
    .await;

    let mut csv = String::from("name,age\n");
    for i in 1..=10 {
        if i == 5 {
            csv.push_str("NULL,55\n");
        } else {
            csv.push_str(&format!("person{},{}\n", i, 20 + i));
        }
    }

    let summary = DataTransfer::import_data(&pool, "people", ImportFormat::Csv, &csv)
        .await
        .unwrap();
    assert_eq!(summary.imported, 9);
    assert_eq!(summary.errors.len(), 1);
    assert!(
        summary.errors[0].starts_with("Row 5: "),
        "unexpected error: {}",
        summary.errors[0]
    );
    assert!(summary.errors[0].contains("NOT NULL"));

    let page = RowOperations::get_rows(&pool, "people", &RowsQuery::new())
        .await
        .unwrap();
    assert_eq!(page.total, 9);
    assert_eq!(page.rows[0]["age"], json!(21));
}

#[tokio::test]
async fn test_import_single_json_object() {
    let (_manager, pool, _dir) = setup_db(NOTES_SCHEMA).await;
    let summary = DataTransfer::import_data(
        &pool,
        "notes_copy",
        ImportFormat::Json,
        r#"{"id": 10, "title": "solo"}"#,
    )
    .await
    .unwrap();
    assert_eq!(summary.imported, 1);

    let err = DataTransfer::import_data(&pool, "notes_copy", ImportFormat::Json, "{oops")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid JSON format");
}

#[tokio::test]
async fn test_sql_dump_reloads_into_fresh_database() {
    let (_manager, pool, _dir) = setup_db(NOTES_SCHEMA).await;
    let dump = DataTransfer::export_sql_dump(&pool, Some("notes"))
        .await
        .unwrap();
    assert!(dump.starts_with("-- Table: notes\n"));
    assert!(!dump.contains("notes_copy"));

    let (_manager2, target, _dir2) = setup_db("SELECT 1;").await;
    let executor = QueryExecutor::default();
    if let DbPool::SQLite(p) = &target {
        sqlx::raw_sql(&dump).execute(p).await.unwrap();
    }

    let result = executor
        .execute_query(&target, "SELECT title FROM notes ORDER BY id")
        .await
        .unwrap();
    assert_eq!(result.row_count, 3);
    assert_eq!(result.rows[0]["title"], json!("Groceries, weekly"));
    assert_eq!(all_rows(&target, "notes").await, all_rows(&pool, "notes").await);
}

#[tokio::test]
async fn test_sql_dump_reloads_blobs_as_bytes() {
    let (_manager, pool, _dir) = setup_db(
        "CREATE TABLE files (id INTEGER PRIMARY KEY, data BLOB);
         INSERT INTO files VALUES (1, x'00ff10');",
    )
    .await;
    let dump = DataTransfer::export_sql_dump(&pool, Some("files"))
        .await
        .unwrap();
    assert!(dump.contains("X'00ff10'"), "{}", dump);

    let (_manager2, target, _dir2) = setup_db("SELECT 1;").await;
    if let DbPool::SQLite(p) = &target {
        sqlx::raw_sql(&dump).execute(p).await.unwrap();
    }

    let result = QueryExecutor::default()
        .execute_query(&target, "SELECT typeof(data) AS t, length(data) AS n FROM files")
        .await
        .unwrap();
    assert_eq!(result.rows[0]["t"], json!("blob"));
    assert_eq!(result.rows[0]["n"], json!(3));
    assert_eq!(all_rows(&target, "files").await, all_rows(&pool, "files").await);
}

#[tokio::test]
async fn test_csv_roundtrip_keeps_padding() {
    let (_manager, pool, _dir) = setup_db(NOTES_SCHEMA).await;
    if let DbPool::SQLite(p) = &pool {
        sqlx::raw_sql("INSERT INTO notes (id, title, body) VALUES (4, '  padded  ', ' lead')")
            .execute(p)
            .await
            .unwrap();
    }

    let csv = DataTransfer::export_data(&pool, "notes", ExportFormat::Csv)
        .await
        .unwrap();
    let summary = DataTransfer::import_data(&pool, "notes_copy", ImportFormat::Csv, &csv)
        .await
        .unwrap();
    assert_eq!(summary.imported, 4, "errors: {:?}", summary.errors);

    let copied = all_rows(&pool, "notes_copy").await;
    assert_eq!(copied[3]["title"], json!("  padded  "));
    assert_eq!(copied[3]["body"], json!(" lead"));
}
