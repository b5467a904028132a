//! End-to-end tests of the JSON API against a SQLite file.
//!
//! Requests go straight into the router with `oneshot`; no socket is bound.

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use db_admin_server::api::create_router;
use db_admin_server::db::{ConnectionManager, ConnectionRegistry, QueryExecutor};
use db_admin_server::AppState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }
}

fn app() -> Router {
    let state = AppState::new(
        ConnectionRegistry::new(),
        Arc::new(ConnectionManager::new()),
        QueryExecutor::default(),
    );
    create_router(state, "/api", None)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Response {
        status,
        headers,
        body,
    }
}

/// Register a fresh SQLite file and return its connection id.
async fn connect_sqlite(app: &Router, dir: &TempDir) -> String {
    let path = dir.path().join("api.sqlite");
    let response = send(
        app,
        Method::POST,
        "/api/connections",
        Some(json!({"name": "local", "filePath": path.to_str().unwrap()})),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let body = response.json();
    assert_eq!(body["type"], json!("sqlite"));
    assert!(body.get("password").is_none());
    body["id"].as_str().unwrap().to_string()
}

async fn create_items_table(app: &Router, id: &str) {
    let response = send(
        app,
        Method::POST,
        &format!("/api/connections/{}/tables", id),
        Some(json!({
            "tableName": "items",
            "columns": [
                {"name": "id", "type": "integer", "autoIncrement": true},
                {"name": "label", "type": "string", "nullable": false},
                {"name": "qty", "type": "integer"}
            ]
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let app = app();
    let dir = TempDir::new().unwrap();
    let id = connect_sqlite(&app, &dir).await;

    let response = send(&app, Method::GET, "/api/connections", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let list = response.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], json!(id));
    assert_eq!(list[0]["name"], json!("local"));

    let response = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(response.json(), json!({"status": "ok", "connections": 1}));

    let response = send(&app, Method::DELETE, &format!("/api/connections/{}", id), None).await;
    assert_eq!(response.json(), json!({"success": true}));

    let response = send(&app, Method::GET, "/api/connections", None).await;
    assert_eq!(response.json(), json!([]));

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/tables", id),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json()["message"],
        json!(format!("Connection not found: {}", id))
    );
}

#[tokio::test]
async fn test_undetected_type_is_rejected() {
    let app = app();
    let response = send(
        &app,
        Method::POST,
        "/api/connections",
        Some(json!({"connectionString": "ftp://x"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json()["message"],
        json!("Could not detect database type. Please specify manually.")
    );

    let response = send(&app, Method::GET, "/api/connections", None).await;
    assert_eq!(response.json(), json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/connections")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schema_and_rows() {
    let app = app();
    let dir = TempDir::new().unwrap();
    let id = connect_sqlite(&app, &dir).await;
    create_items_table(&app, &id).await;

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/tables", id),
        None,
    )
    .await;
    assert_eq!(
        response.json(),
        json!([{"name": "items", "rowCount": 0, "columnCount": 3}])
    );

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/tables/items/columns", id),
        None,
    )
    .await;
    let columns = response.json();
    assert_eq!(columns[0]["primaryKey"], json!(true));
    assert_eq!(columns[1]["nullable"], json!(false));

    let rows_uri = format!("/api/connections/{}/tables/items/rows", id);
    let response = send(
        &app,
        Method::POST,
        &rows_uri,
        Some(json!({"label": "a", "qty": 3})),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json(), json!({"id": 1, "label": "a", "qty": 3}));

    let response = send(
        &app,
        Method::POST,
        &rows_uri,
        Some(json!({"label": "b", "qty": "7"})),
    )
    .await;
    assert_eq!(response.json()["qty"], json!(7));

    let response = send(&app, Method::GET, &format!("{}?qty=7", rows_uri), None).await;
    let page = response.json();
    assert_eq!(page["total"], json!(1));
    assert_eq!(page["rows"][0]["label"], json!("b"));

    let response = send(
        &app,
        Method::GET,
        &format!("{}?limit=1&orderBy=label&orderDirection=desc", rows_uri),
        None,
    )
    .await;
    let page = response.json();
    assert_eq!(page["total"], json!(2));
    assert_eq!(page["rows"].as_array().unwrap().len(), 1);
    assert_eq!(page["rows"][0]["label"], json!("b"));

    let response = send(&app, Method::GET, &format!("{}?limit=0", rows_uri), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["rows"].as_array().unwrap().len(), 2);

    let response = send(&app, Method::GET, &format!("{}?limit=abc", rows_uri), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        Method::PATCH,
        &format!("{}/1", rows_uri),
        Some(json!({"qty": 10})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["qty"], json!(10));

    let response = send(&app, Method::DELETE, &format!("{}/1", rows_uri), None).await;
    assert_eq!(response.json(), json!({"success": true}));

    let response = send(&app, Method::DELETE, &format!("{}/1", rows_uri), None).await;
    assert_eq!(response.json()["message"], json!("Row not found"));

    let response = send(
        &app,
        Method::POST,
        &format!("{}/bulk-delete", rows_uri),
        Some(json!({"ids": [2]})),
    )
    .await;
    assert_eq!(response.json(), json!({"deleted": 1}));
}

#[tokio::test]
async fn test_query_endpoint() {
    let app = app();
    let dir = TempDir::new().unwrap();
    let id = connect_sqlite(&app, &dir).await;
    let uri = format!("/api/connections/{}/query", id);

    let response = send(&app, Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({"message": "Query is required"}));

    let response = send(&app, Method::POST, &uri, Some(json!({"query": ""}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({"query": "SELECT 1 AS one, 'x' AS letter"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let result = response.json();
    assert_eq!(result["columns"], json!(["one", "letter"]));
    assert_eq!(result["rowCount"], json!(1));
    assert_eq!(result["rows"][0], json!({"one": 1, "letter": "x"}));

    let response = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({"query": "SELECT * FROM missing_table"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["message"].as_str().unwrap().contains("missing_table"));
}

#[tokio::test]
async fn test_export_and_import() {
    let app = app();
    let dir = TempDir::new().unwrap();
    let id = connect_sqlite(&app, &dir).await;
    create_items_table(&app, &id).await;

    let response = send(
        &app,
        Method::POST,
        &format!("/api/connections/{}/tables/items/import", id),
        Some(json!({
            "format": "csv",
            "data": "label,qty\nfirst,1\n,2\nthird,3\n"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let summary = response.json();
    assert_eq!(summary["imported"], json!(2));
    assert!(summary["errors"][0].as_str().unwrap().starts_with("Row 2: "));

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/tables/items/export?format=csv", id),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"items.csv\""
    );
    assert_eq!(response.text(), "id,label,qty\n1,first,1\n2,third,3");

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/tables/items/export", id),
        None,
    )
    .await;
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.json().as_array().unwrap().len(), 2);

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/tables/items/export?format=xml", id),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        Method::GET,
        &format!("/api/connections/{}/export/sql", id),
        None,
    )
    .await;
    assert_eq!(response.headers[header::CONTENT_TYPE], "application/sql");
    assert_eq!(
        response.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"database_dump.sql\""
    );
    assert!(response.text().contains("INSERT INTO \"items\""));
}
