//! Error types for metadata stores

use thiserror::Error;

/// Errors raised by a metadata store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate column {table}.{column}")]
    DuplicateColumn { table: String, column: String },

    #[error("table {table_id} is already linked with domain {domain_name}")]
    TableLinkedWithDomain {
        table_id: String,
        domain_name: String,
    },

    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
