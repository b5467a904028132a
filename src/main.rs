//! DB Admin Server - Main entry point.
//!
//! Serves the JSON API used by the database admin UI for SQLite, PostgreSQL
//! and MySQL databases.

use clap::Parser;
use db_admin_server::api::AppState;
use db_admin_server::config::Config;
use db_admin_server::db::{ConnectionManager, ConnectionRegistry, QueryExecutor};
use db_admin_server::models::NewConnection;
use db_admin_server::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    let pool_options = config.pool_options();
    if let Err(message) = pool_options.validate() {
        error!(%message, "Invalid pool configuration");
        return Err(message.into());
    }

    info!("Starting DB Admin Server v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::new(
        ConnectionRegistry::new(),
        Arc::new(ConnectionManager::with_pool_options(pool_options)),
        QueryExecutor::new(config.query_timeout_duration()),
    );

    // Preconfigured connections are registered like UI-created ones
    if !config.connections.is_empty() {
        info!(
            count = config.connections.len(),
            "Connecting to preconfigured databases"
        );
    }
    for value in &config.connections {
        let registered = state
            .open_connection(NewConnection::from_url_or_path(value))
            .await?;
        info!(
            connection_id = %registered.id,
            target = %registered.display_target(),
            "Connection ready"
        );
    }

    let transport = HttpTransport::new(
        state,
        &config.http_host,
        config.http_port,
        &config.api_prefix,
    )
    .with_cors_origin(config.cors_origin.clone());

    info!(transport = transport.name(), "Using HTTP transport");
    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
