//! Schema introspection and metadata synchronization.
//!
//! The crate turns a live database schema into column descriptors, diffs
//! them against a [`MetadataStore`](schemadoc_store::MetadataStore) and
//! applies the diff without touching descriptions of unchanged entities.
//!
//! - [`introspector`]: live snapshot built from a dialect's catalog queries
//! - [`compare`]: descriptor comparison and the five-way diff
//! - [`executor`]: applies a diff to the store
//! - [`bootstrap`]: first population and the connection identity guard
//! - [`engine`]: the facade serializing sync passes

pub mod bootstrap;
pub mod compare;
pub mod engine;
mod error;
pub mod executor;
pub mod introspector;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use bootstrap::*;
pub use compare::*;
pub use engine::*;
pub use error::*;
pub use executor::*;
pub use introspector::*;
