//! schemadoc Drivers - Database driver implementations
//!
//! This crate bundles the concrete drivers behind cargo features and
//! selects one of them at startup from the configured dialect.

#[cfg(feature = "mysql")]
pub use schemadoc_driver_mysql as mysql;
#[cfg(feature = "postgres")]
pub use schemadoc_driver_postgres as postgres;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from schemadoc-core
pub use schemadoc_core::{
    Connection, ConnectionConfig, DatabaseDriver, Dialect, QueryResult, Result, Row,
    SchemaDocError, SchemaIntrospection, StatementResult, Value,
};
