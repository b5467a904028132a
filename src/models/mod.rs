//! Data models for the DB admin server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType, NewConnection};
pub use query::{
    ExportFormat, ImportFormat, ImportSummary, QueryResult, Row, RowsPage, RowsQuery,
    SortDirection, SqlValue,
};
pub use schema::{
    ColumnChange, ColumnMetadata, ColumnSpec, ForeignKeyRef, IndexMetadata, IndexSpec, IndexType,
    TableMetadata,
};
