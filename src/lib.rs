//! DB Admin Server Library
//!
//! Backend of a browser-based database administration tool: a multi-engine
//! layer over SQLite, PostgreSQL and MySQL (introspection, row CRUD, DDL,
//! import/export) exposed through an HTTP/JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod transfer;
pub mod transport;

pub use api::{AppState, create_router};
pub use config::Config;
pub use error::DbError;
