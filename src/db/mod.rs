//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management and the connection registry
//! - Per-dialect SQL rendering (quoting, placeholders, DDL types)
//! - Query execution and row decoding
//! - Schema introspection and mutation
//! - Row-level CRUD
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod dialect;
pub mod executor;
pub mod mutator;
pub mod params;
pub mod pool;
pub mod registry;
pub mod rows;
pub mod schema;
pub mod types;

pub use dialect::Dialect;
pub use executor::{QueryExecutor, Statement};
pub use mutator::SchemaMutator;
pub use pool::{ConnectionManager, DbPool};
pub use registry::ConnectionRegistry;
pub use rows::{RowOperations, TableColumns};
pub use schema::SchemaInspector;
