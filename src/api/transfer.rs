//! Export and import endpoints.

use super::{ApiError, ApiResult, AppState};
use crate::error::DbError;
use crate::models::{ExportFormat, ImportFormat, ImportSummary};
use crate::transfer::{DataTransfer, dump_filename, export_filename};
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

const SQL_CONTENT_TYPE: &str = "application/sql";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connections/{id}/tables/{table}/export", get(export_table))
        .route("/connections/{id}/export/sql", get(export_sql_dump))
        .route("/connections/{id}/tables/{table}/import", post(import_table))
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DumpParams {
    table_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    format: ImportFormat,
    data: String,
}

fn parse_export_format(format: Option<&str>) -> Result<ExportFormat, DbError> {
    match format.unwrap_or("json") {
        "json" => Ok(ExportFormat::Json),
        "csv" => Ok(ExportFormat::Csv),
        other => Err(DbError::invalid_input(format!(
            "Invalid export format '{}': expected 'json' or 'csv'",
            other
        ))),
    }
}

/// File download response.
fn attachment(content_type: &str, filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", header_filename(filename)),
            ),
        ],
        body,
    )
        .into_response()
}

/// Table names can carry quotes or control characters, which would break out
/// of the quoted `filename` parameter.
fn header_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

async fn export_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let format = parse_export_format(params.format.as_deref()).map_err(ApiError::server)?;
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    let body = DataTransfer::export_data(&pool, &table, format)
        .await
        .map_err(ApiError::server)?;
    Ok(attachment(
        format.content_type(),
        &export_filename(&table, format),
        body,
    ))
}

async fn export_sql_dump(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<DumpParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let table = params.table_name.as_deref().filter(|t| !t.is_empty());
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    let body = DataTransfer::export_sql_dump(&pool, table)
        .await
        .map_err(ApiError::server)?;
    Ok(attachment(SQL_CONTENT_TYPE, &dump_filename(table), body))
}

async fn import_table(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> ApiResult<Json<ImportSummary>> {
    let Json(request) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    let summary = DataTransfer::import_data(&pool, &table, request.format, &request.data)
        .await
        .map_err(ApiError::client)?;
    Ok(Json(summary))
}
