//! HTTP/JSON API.
//!
//! Every handler borrows a pool from the [`ConnectionManager`] for the
//! duration of one request. Errors are returned as `{"message": ...}` with
//! the route's default status; validation, detection and unsupported
//! operation errors are always 400.

pub mod connections;
pub mod query;
pub mod rows;
pub mod schema;
pub mod transfer;

use crate::db::{ConnectionManager, ConnectionRegistry, DbPool, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, NewConnection};
use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{debug, error, info, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub manager: Arc<ConnectionManager>,
    pub executor: QueryExecutor,
}

impl AppState {
    pub fn new(
        registry: ConnectionRegistry,
        manager: Arc<ConnectionManager>,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            registry,
            manager,
            executor,
        }
    }

    /// Detect the engine when needed, connect, then register.
    ///
    /// Nothing is registered when the connection attempt fails.
    pub async fn open_connection(&self, request: NewConnection) -> DbResult<ConnectionConfig> {
        let config = ConnectionConfig::from_request(request)?;
        self.manager.connect(&config).await?;
        self.registry.insert(config.clone()).await;

        info!(
            connection_id = %config.id,
            db_type = %config.db_type,
            "Connection registered"
        );
        Ok(config)
    }

    /// Disconnect and forget a connection. Unknown ids are ignored.
    pub async fn close_connection(&self, connection_id: &str) {
        self.manager.disconnect(connection_id).await;
        if self.registry.remove(connection_id).await.is_some() {
            info!(connection_id = %connection_id, "Connection removed");
        }
    }

    pub async fn pool(&self, connection_id: &str) -> DbResult<DbPool> {
        self.manager.get_pool(connection_id).await
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error response: a status code and a `{"message": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Map a database error onto `status`, or 400 for client errors.
    pub fn from_db(err: DbError, status: StatusCode) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            status
        };

        if status.is_server_error() {
            error!(error = %err, suggestion = ?err.suggestion(), "Request failed");
        } else {
            debug!(error = %err, "Request rejected");
        }
        Self::new(status, err.to_string())
    }

    /// For routes whose failures are reported as 400.
    pub fn client(err: DbError) -> Self {
        Self::from_db(err, StatusCode::BAD_REQUEST)
    }

    /// For routes whose failures are reported as 500.
    pub fn server(err: DbError) -> Self {
        Self::from_db(err, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

// =============================================================================
// Router
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    connections: usize,
}

async fn health_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.manager.connection_count().await,
    })
}

/// Routes relative to the API prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .merge(connections::routes())
        .merge(schema::routes())
        .merge(rows::routes())
        .merge(query::routes())
        .merge(transfer::routes())
}

/// CORS layer allowing `origin`, or any origin when unset.
pub fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any),
        Err(e) => {
            warn!(origin = %origin, error = %e, "Invalid CORS origin, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// Build the application router with the API mounted under `prefix`.
pub fn create_router(state: AppState, prefix: &str, cors_origin: Option<&str>) -> Router {
    let prefix = prefix.trim_end_matches('/');
    let api = api_routes();
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    router
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}
