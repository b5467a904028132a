//! Configuration handling for the DB admin server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use clap::Parser;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Connection pool settings applied to every connection opened by the server.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 10 for MySQL/PostgreSQL, 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: connect timeout)
    pub acquire_timeout_secs: Option<u64>,
}

impl PoolOptions {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
            if let Some(min) = self.min_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-admin-server",
    about = "HTTP backend for browsing and editing SQLite, PostgreSQL and MySQL databases",
    version,
    author
)]
pub struct Config {
    /// Connections registered at startup.
    /// Format: a connection string ("sqlite:app.db", "postgres://...", "mysql://...")
    /// or a path to a SQLite file. Can be specified multiple times.
    #[arg(
        short = 'c',
        long = "connection",
        value_name = "URL",
        env = "DBADMIN_CONNECTIONS",
        value_delimiter = ','
    )]
    pub connections: Vec<String>,

    /// HTTP host to bind to
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "DBADMIN_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "DBADMIN_HTTP_PORT"
    )]
    pub http_port: u16,

    /// Path prefix the JSON API is mounted under
    #[arg(
        long,
        default_value = DEFAULT_API_PREFIX,
        env = "DBADMIN_API_PREFIX"
    )]
    pub api_prefix: String,

    /// Allowed CORS origin. Any origin is allowed when unset.
    #[arg(long, env = "DBADMIN_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Query timeout in seconds (0 disables the timeout)
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "DBADMIN_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DBADMIN_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum pooled connections per PostgreSQL/MySQL connection
    #[arg(long, env = "DBADMIN_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DBADMIN_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBADMIN_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            connections: Vec::new(),
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            cors_origin: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_connections: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the query timeout as a Duration. `None` when disabled.
    pub fn query_timeout_duration(&self) -> Option<Duration> {
        (self.query_timeout > 0).then(|| Duration::from_secs(self.query_timeout))
    }

    /// Pool settings derived from the CLI flags.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            acquire_timeout_secs: Some(self.connect_timeout),
            ..PoolOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
