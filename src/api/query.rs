//! Ad-hoc SQL endpoint.

use super::{ApiError, ApiResult, AppState};
use crate::models::QueryResult;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::post,
};
use serde_json::Value as JsonValue;
use tracing::debug;

pub fn routes() -> Router<AppState> {
    Router::new().route("/connections/{id}/query", post(execute_query))
}

async fn execute_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<QueryResult>> {
    let Json(body) = payload?;
    let sql = body
        .get("query")
        .and_then(JsonValue::as_str)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query is required"))?;

    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    debug!(connection_id = %id, sql_len = sql.len(), "Executing query");
    let result = state
        .executor
        .execute_query(&pool, sql)
        .await
        .map_err(ApiError::client)?;
    Ok(Json(result))
}
