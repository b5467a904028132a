//! Table, column and index endpoints.

use super::{ApiError, ApiResult, AppState, Success};
use crate::db::{SchemaInspector, SchemaMutator};
use crate::models::{
    ColumnChange, ColumnMetadata, ColumnSpec, IndexMetadata, IndexSpec, TableMetadata,
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connections/{id}/tables", get(list_tables).post(create_table))
        .route("/connections/{id}/tables/{table}", delete(drop_table))
        .route("/connections/{id}/tables/{table}/rename", patch(rename_table))
        .route("/connections/{id}/tables/{table}/truncate", post(truncate_table))
        .route(
            "/connections/{id}/tables/{table}/columns",
            get(list_columns).post(add_column),
        )
        .route(
            "/connections/{id}/tables/{table}/columns/{column}",
            patch(modify_column).delete(drop_column),
        )
        .route(
            "/connections/{id}/tables/{table}/indexes",
            get(list_indexes).post(create_index),
        )
        .route(
            "/connections/{id}/tables/{table}/indexes/{index}",
            delete(drop_index),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTableRequest {
    #[serde(default)]
    table_name: String,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameTableRequest {
    new_name: String,
}

// =============================================================================
// Tables
// =============================================================================

async fn list_tables(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TableMetadata>>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    let tables = SchemaInspector::list_tables(&pool)
        .await
        .map_err(ApiError::server)?;
    Ok(Json(tables))
}

async fn create_table(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CreateTableRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Success>)> {
    let Json(request) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    SchemaMutator::create_table(&pool, &request.table_name, &request.columns)
        .await
        .map_err(ApiError::client)?;
    Ok((StatusCode::CREATED, Success::ok()))
}

async fn drop_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<Json<Success>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    SchemaMutator::drop_table(&pool, &table)
        .await
        .map_err(ApiError::server)?;
    Ok(Success::ok())
}

async fn rename_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    payload: Result<Json<RenameTableRequest>, JsonRejection>,
) -> ApiResult<Json<Success>> {
    let Json(request) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    SchemaMutator::rename_table(&pool, &table, &request.new_name)
        .await
        .map_err(ApiError::client)?;
    Ok(Success::ok())
}

async fn truncate_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<Json<Success>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    SchemaMutator::truncate_table(&pool, &table)
        .await
        .map_err(ApiError::server)?;
    Ok(Success::ok())
}

// =============================================================================
// Columns
// =============================================================================

async fn list_columns(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<Json<Vec<ColumnMetadata>>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    let columns = SchemaInspector::list_columns(&pool, &table)
        .await
        .map_err(ApiError::server)?;
    Ok(Json(columns))
}

async fn add_column(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    payload: Result<Json<ColumnSpec>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Success>)> {
    let Json(column) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    SchemaMutator::add_column(&pool, &table, &column)
        .await
        .map_err(ApiError::client)?;
    Ok((StatusCode::CREATED, Success::ok()))
}

async fn modify_column(
    State(state): State<AppState>,
    Path((id, table, column)): Path<(String, String, String)>,
    payload: Result<Json<ColumnChange>, JsonRejection>,
) -> ApiResult<Json<Success>> {
    let Json(change) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    SchemaMutator::modify_column(&pool, &table, &column, &change)
        .await
        .map_err(ApiError::client)?;
    Ok(Success::ok())
}

async fn drop_column(
    State(state): State<AppState>,
    Path((id, table, column)): Path<(String, String, String)>,
) -> ApiResult<Json<Success>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    SchemaMutator::drop_column(&pool, &table, &column)
        .await
        .map_err(ApiError::server)?;
    Ok(Success::ok())
}

// =============================================================================
// Indexes
// =============================================================================

async fn list_indexes(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<Json<Vec<IndexMetadata>>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    let indexes = SchemaInspector::list_indexes(&pool, &table)
        .await
        .map_err(ApiError::server)?;
    Ok(Json(indexes))
}

async fn create_index(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    payload: Result<Json<IndexSpec>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Success>)> {
    let Json(index) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    SchemaMutator::create_index(&pool, &table, &index)
        .await
        .map_err(ApiError::client)?;
    Ok((StatusCode::CREATED, Success::ok()))
}

async fn drop_index(
    State(state): State<AppState>,
    Path((id, table, index)): Path<(String, String, String)>,
) -> ApiResult<Json<Success>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    SchemaMutator::drop_index(&pool, &table, &index)
        .await
        .map_err(ApiError::server)?;
    Ok(Success::ok())
}
