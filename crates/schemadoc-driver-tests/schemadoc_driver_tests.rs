//! schemadoc driver integration tests
//!
//! Runs the catalog queries of every dialect against a real server started
//! in Docker with testcontainers-rs, then drives a full bootstrap and sync
//! against it. The MongoDB metadata store is exercised against a
//! single-node replica set.
//!
//! # Usage
//!
//! ```bash
//! # Docker must be running
//! cargo test -p schemadoc-driver-tests -- --ignored
//! ```

pub mod fixtures;
pub mod test_containers;

#[cfg(test)]
mod schema_tests;

#[cfg(test)]
mod store_tests;

#[cfg(test)]
mod sync_tests;
