//! Error types for synchronization passes

use schemadoc_core::SchemaDocError;
use schemadoc_store::StoreError;
use thiserror::Error;

use crate::{CompareError, ConsistencyReport};

/// Errors that abort an introspection or synchronization pass
#[derive(Error, Debug)]
pub enum SyncError {
    /// The live database failed to answer a catalog query
    #[error("live database error: {0}")]
    Source(#[from] SchemaDocError),

    #[error("metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    /// The stored connection identity disagrees with the configuration
    #[error("{0}")]
    Consistency(ConsistencyReport),
}

/// Result type for synchronization operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;
