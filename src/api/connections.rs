//! Connection registration endpoints.

use super::{ApiError, ApiResult, AppState, Success};
use crate::models::{ConnectionConfig, NewConnection};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/connections", get(list_connections).post(create_connection))
        .route("/connections/{id}", delete(delete_connection))
}

async fn list_connections(State(state): State<AppState>) -> Json<Vec<ConnectionConfig>> {
    Json(state.registry.list().await)
}

async fn create_connection(
    State(state): State<AppState>,
    payload: Result<Json<NewConnection>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ConnectionConfig>)> {
    let Json(request) = payload?;
    let config = state
        .open_connection(request)
        .await
        .map_err(ApiError::client)?;
    Ok((StatusCode::CREATED, Json(config)))
}

async fn delete_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Success> {
    state.close_connection(&id).await;
    Success::ok()
}
