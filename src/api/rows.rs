//! Row browsing and editing endpoints.

use super::{ApiError, ApiResult, AppState, Success};
use crate::db::RowOperations;
use crate::error::{DbError, DbResult};
use crate::models::{Row, RowsPage, RowsQuery, SortDirection};
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/connections/{id}/tables/{table}/rows",
            get(get_rows).post(insert_row),
        )
        .route(
            "/connections/{id}/tables/{table}/rows/bulk-delete",
            post(bulk_delete),
        )
        .route(
            "/connections/{id}/tables/{table}/rows/{row_id}",
            patch(update_row).delete(delete_row),
        )
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<JsonValue>,
}

#[derive(Debug, Serialize)]
struct BulkDeleteResponse {
    deleted: u64,
}

/// Build a [`RowsQuery`] from query-string pairs.
///
/// Keys other than the paging, ordering and search options become equality
/// filters, in the order given.
pub fn parse_rows_query(params: Vec<(String, String)>) -> DbResult<RowsQuery> {
    let mut query = RowsQuery::new();
    for (key, value) in params {
        match key.as_str() {
            "limit" => query.limit = Some(parse_count(&key, &value)?),
            "offset" => query.offset = Some(parse_count(&key, &value)?),
            "orderBy" => query.order_by = Some(value).filter(|v| !v.is_empty()),
            "orderDirection" => {
                query.order_direction = SortDirection::parse(&value).ok_or_else(|| {
                    DbError::invalid_input(format!(
                        "Invalid orderDirection '{}': expected 'asc' or 'desc'",
                        value
                    ))
                })?;
            }
            "search" => query.search = Some(value),
            _ => {
                query.filters.insert(key, JsonValue::String(value));
            }
        }
    }
    Ok(query)
}

fn parse_count(key: &str, value: &str) -> DbResult<u64> {
    value.trim().parse().map_err(|_| {
        DbError::invalid_input(format!(
            "Invalid {} '{}': expected a non-negative integer",
            key, value
        ))
    })
}

async fn get_rows(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<RowsPage>> {
    let Query(params) = params?;
    let query = parse_rows_query(params).map_err(ApiError::server)?;
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    let page = RowOperations::get_rows(&pool, &table, &query)
        .await
        .map_err(ApiError::server)?;
    Ok(Json(page))
}

async fn insert_row(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    payload: Result<Json<Row>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Row>)> {
    let Json(data) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    let row = RowOperations::insert_row(&pool, &table, &data)
        .await
        .map_err(ApiError::client)?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn bulk_delete(
    State(state): State<AppState>,
    Path((id, table)): Path<(String, String)>,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> ApiResult<Json<BulkDeleteResponse>> {
    let Json(request) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    let deleted = RowOperations::bulk_delete(&pool, &table, &request.ids)
        .await
        .map_err(ApiError::client)?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

async fn update_row(
    State(state): State<AppState>,
    Path((id, table, row_id)): Path<(String, String, String)>,
    payload: Result<Json<Row>, JsonRejection>,
) -> ApiResult<Json<Row>> {
    let Json(data) = payload?;
    let pool = state.pool(&id).await.map_err(ApiError::client)?;
    let row = RowOperations::update_row(&pool, &table, &JsonValue::String(row_id), &data)
        .await
        .map_err(ApiError::client)?;
    Ok(Json(row))
}

async fn delete_row(
    State(state): State<AppState>,
    Path((id, table, row_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Success>> {
    let pool = state.pool(&id).await.map_err(ApiError::server)?;
    RowOperations::delete_row(&pool, &table, &JsonValue::String(row_id))
        .await
        .map_err(ApiError::server)?;
    Ok(Success::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_rows_query_options_and_filters() {
        let query = parse_rows_query(pairs(&[
            ("limit", "25"),
            ("offset", "50"),
            ("orderBy", "name"),
            ("orderDirection", "DESC"),
            ("search", "ann"),
            ("status", "active"),
            ("city", "Oslo"),
        ]))
        .unwrap();

        assert_eq!(query.limit, Some(25));
        assert_eq!(query.offset, Some(50));
        assert_eq!(query.order_by.as_deref(), Some("name"));
        assert_eq!(query.order_direction, SortDirection::Desc);
        assert_eq!(query.search.as_deref(), Some("ann"));
        let filters: Vec<(&String, &JsonValue)> = query.filters.iter().collect();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], (&"status".to_string(), &json!("active")));
        assert_eq!(filters[1], (&"city".to_string(), &json!("Oslo")));
    }

    #[test]
    fn test_parse_rows_query_rejects_bad_values() {
        assert!(parse_rows_query(pairs(&[("limit", "ten")])).is_err());
        assert!(parse_rows_query(pairs(&[("offset", "-1")])).is_err());
        let err = parse_rows_query(pairs(&[("orderDirection", "up")])).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_parse_rows_query_defaults() {
        let query = parse_rows_query(Vec::new()).unwrap();
        assert_eq!(query, RowsQuery::new());
    }
}
