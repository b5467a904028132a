//! Connection-related data models.
//!
//! This module defines types for database connection configuration and the
//! engine detection heuristics applied when a client omits the engine type.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

/// File extensions recognised as SQLite databases.
const SQLITE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

impl DatabaseType {
    /// Classify a connection from its file path or connection string.
    ///
    /// A file path wins over a connection string. Returns `None` when neither
    /// matches a known engine; the caller must then ask for an explicit type.
    pub fn detect(connection_string: Option<&str>, file_path: Option<&str>) -> Option<Self> {
        if let Some(path) = file_path {
            let is_sqlite_file = Path::new(path)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SQLITE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
            if is_sqlite_file {
                return Some(Self::SQLite);
            }
        }

        let lower = connection_string?.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.contains(".db") || lower.contains(".sqlite")
        {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::PostgreSQL => Some(5432),
            Self::MySQL => Some(3306),
            Self::SQLite => None,
        }
    }

    /// URL scheme used when building a connection URL from discrete fields.
    fn url_scheme(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Request body for registering a new connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConnection {
    pub name: Option<String>,
    /// Detected from `connection_string` / `file_path` when omitted.
    #[serde(rename = "type")]
    pub db_type: Option<DatabaseType>,
    pub connection_string: Option<String>,
    pub file_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl NewConnection {
    /// Build a request from a single CLI value: a connection URL or a SQLite file path.
    ///
    /// `sqlite:` URLs and bare paths are SQLite whatever their extension; other
    /// URLs go through detection.
    pub fn from_url_or_path(value: &str) -> Self {
        if value.starts_with("sqlite:") {
            Self {
                db_type: Some(DatabaseType::SQLite),
                connection_string: Some(value.to_string()),
                ..Self::default()
            }
        } else if value.contains("://") {
            Self {
                connection_string: Some(value.to_string()),
                ..Self::default()
            }
        } else {
            Self {
                db_type: Some(DatabaseType::SQLite),
                file_path: Some(value.to_string()),
                ..Self::default()
            }
        }
    }
}

/// Configuration for a registered database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub db_type: DatabaseType,
    /// May embed credentials - never log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Sensitive - never returned to clients
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConnectionConfig {
    /// Create a configuration from a request, assigning a fresh id.
    ///
    /// Fails with [`ConnectionConfigError::UndetectedType`] when the request
    /// has no type and none can be detected.
    pub fn from_request(request: NewConnection) -> Result<Self, ConnectionConfigError> {
        let db_type = match request.db_type {
            Some(db_type) => db_type,
            None => DatabaseType::detect(
                request.connection_string.as_deref(),
                request.file_path.as_deref(),
            )
            .ok_or(ConnectionConfigError::UndetectedType)?,
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            db_type,
            connection_string: request.connection_string.filter(|s| !s.is_empty()),
            file_path: request.file_path.filter(|s| !s.is_empty()),
            host: request.host,
            port: request.port,
            database: request.database,
            username: request.username,
            password: request.password,
            created_at: chrono::Utc::now(),
        })
    }

    /// Path of the SQLite database file this config points to.
    ///
    /// Uses `file_path`, else the connection string without its `sqlite:` scheme,
    /// else an in-memory database.
    pub fn sqlite_path(&self) -> String {
        if let Some(path) = &self.file_path {
            return path.clone();
        }
        match &self.connection_string {
            Some(s) => {
                let path = s
                    .strip_prefix("sqlite://")
                    .or_else(|| s.strip_prefix("sqlite:"))
                    .unwrap_or(s);
                path.split('?').next().unwrap_or(path).to_string()
            }
            None => ":memory:".to_string(),
        }
    }

    /// Connection URL for PostgreSQL / MySQL.
    ///
    /// The connection string is used verbatim when present; otherwise a URL is
    /// assembled from host, port, database and credentials.
    pub fn server_url(&self) -> Result<String, ConnectionConfigError> {
        if let Some(s) = &self.connection_string {
            return Ok(s.clone());
        }

        let host = self.host.as_deref().unwrap_or("localhost");
        let port = self.port.or(self.db_type.default_port());
        let base = format!("{}://{}", self.db_type.url_scheme(), host);
        let mut url =
            Url::parse(&base).map_err(|e| ConnectionConfigError::InvalidUrl(e.to_string()))?;

        let invalid = |_| ConnectionConfigError::InvalidUrl(format!("cannot use host '{}'", host));
        url.set_port(port).map_err(invalid)?;
        if let Some(user) = &self.username {
            url.set_username(user).map_err(invalid)?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(invalid)?;
        }
        if let Some(database) = &self.database {
            url.set_path(database);
        }
        Ok(url.to_string())
    }

    /// Human-readable location of the database, safe for logs.
    pub fn display_target(&self) -> String {
        match self.db_type {
            DatabaseType::SQLite => self.sqlite_path(),
            _ => match self.server_url() {
                Ok(url) => mask_password(&url),
                Err(_) => "<invalid url>".to_string(),
            },
        }
    }
}

/// Replace the password of a URL with `****`.
fn mask_password(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Could not detect database type. Please specify manually.")]
    UndetectedType,

    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),
}

impl From<ConnectionConfigError> for crate::error::DbError {
    fn from(err: ConnectionConfigError) -> Self {
        match err {
            ConnectionConfigError::UndetectedType => Self::Detection,
            ConnectionConfigError::InvalidUrl(_) => Self::invalid_input(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(connection_string: Option<&str>, file_path: Option<&str>) -> NewConnection {
        NewConnection {
            connection_string: connection_string.map(String::from),
            file_path: file_path.map(String::from),
            ..NewConnection::default()
        }
    }

    #[test]
    fn test_detect_from_file_path() {
        assert_eq!(
            DatabaseType::detect(None, Some("app.sqlite3")),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(
            DatabaseType::detect(None, Some("/var/data/app.DB")),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(DatabaseType::detect(None, Some("notes.txt")), None);
    }

    #[test]
    fn test_detect_from_connection_string() {
        assert_eq!(
            DatabaseType::detect(Some("mysql://u:p@h/db"), None),
            Some(DatabaseType::MySQL)
        );
        assert_eq!(
            DatabaseType::detect(Some("postgres://localhost/db"), None),
            Some(DatabaseType::PostgreSQL)
        );
        assert_eq!(
            DatabaseType::detect(Some("PostgreSQL://localhost/db"), None),
            Some(DatabaseType::PostgreSQL)
        );
        assert_eq!(
            DatabaseType::detect(Some("sqlite:///tmp/x"), None),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(
            DatabaseType::detect(Some("data/shop.db"), None),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(DatabaseType::detect(Some("ftp://x"), None), None);
        assert_eq!(DatabaseType::detect(None, None), None);
    }

    #[test]
    fn test_detect_file_path_wins() {
        assert_eq!(
            DatabaseType::detect(Some("mysql://h/db"), Some("local.sqlite")),
            Some(DatabaseType::SQLite)
        );
        // a non-sqlite path falls through to the connection string
        assert_eq!(
            DatabaseType::detect(Some("mysql://h/db"), Some("dump.sql")),
            Some(DatabaseType::MySQL)
        );
    }

    #[test]
    fn test_from_request_undetected() {
        let result = ConnectionConfig::from_request(request(Some("ftp://x"), None));
        assert!(matches!(result, Err(ConnectionConfigError::UndetectedType)));
    }

    #[test]
    fn test_from_request_assigns_unique_ids() {
        let a = ConnectionConfig::from_request(request(None, Some("a.db"))).unwrap();
        let b = ConnectionConfig::from_request(request(None, Some("a.db"))).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.db_type, DatabaseType::SQLite);
    }

    #[test]
    fn test_explicit_type_skips_detection() {
        let req = NewConnection {
            db_type: Some(DatabaseType::PostgreSQL),
            host: Some("db.internal".to_string()),
            ..NewConnection::default()
        };
        let config = ConnectionConfig::from_request(req).unwrap();
        assert_eq!(config.db_type, DatabaseType::PostgreSQL);
    }

    #[test]
    fn test_sqlite_path() {
        let config = ConnectionConfig::from_request(request(Some("sqlite://data/app.db"), None))
            .unwrap();
        assert_eq!(config.sqlite_path(), "data/app.db");

        let config = ConnectionConfig::from_request(NewConnection {
            db_type: Some(DatabaseType::SQLite),
            ..NewConnection::default()
        })
        .unwrap();
        assert_eq!(config.sqlite_path(), ":memory:");
    }

    #[test]
    fn test_server_url_from_fields() {
        let config = ConnectionConfig::from_request(NewConnection {
            db_type: Some(DatabaseType::MySQL),
            database: Some("shop".to_string()),
            username: Some("root".to_string()),
            password: Some("p@ss:word".to_string()),
            ..NewConnection::default()
        })
        .unwrap();

        let url = config.server_url().unwrap();
        assert!(url.starts_with("mysql://root:"));
        assert!(url.ends_with("@localhost:3306/shop"));
        assert!(url.contains("p%40ss"));
    }

    #[test]
    fn test_display_target_masks_password() {
        let config =
            ConnectionConfig::from_request(request(Some("postgres://u:secret@h:5432/db"), None))
                .unwrap();
        let target = config.display_target();
        assert!(!target.contains("secret"));
        assert!(target.contains("****"));
    }

    #[test]
    fn test_password_never_serialized() {
        let config = ConnectionConfig::from_request(NewConnection {
            db_type: Some(DatabaseType::PostgreSQL),
            password: Some("hunter2".to_string()),
            ..NewConnection::default()
        })
        .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"type\":\"postgresql\""));
        assert!(json.contains("createdAt"));
    }

    #[test]
    fn test_from_url_or_path() {
        assert!(NewConnection::from_url_or_path("app.db").file_path.is_some());
        assert!(
            NewConnection::from_url_or_path("mysql://h/db")
                .connection_string
                .is_some()
        );
        let memory = NewConnection::from_url_or_path("sqlite::memory:");
        assert_eq!(memory.db_type, Some(DatabaseType::SQLite));
        assert!(memory.connection_string.is_some());
        assert_eq!(
            NewConnection::from_url_or_path("data/app").db_type,
            Some(DatabaseType::SQLite)
        );
        assert_eq!(NewConnection::from_url_or_path("mysql://h/db").db_type, None);
    }
}
