//! schemadoc Core - Core abstractions shared by every schemadoc crate
//!
//! This crate defines:
//!
//! - `DatabaseDriver` - Trait for database driver implementations
//! - `Connection` - Trait for live database connections
//! - `SchemaIntrospection` - The dialect capability interface used to
//!   extract a schema snapshot
//! - The data dictionary model: `ConnectionIdentity`, `Table`,
//!   `ColumnDescriptor`, `Domain`
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod dialect;
mod driver;
mod error;
mod model;
mod schema;
mod types;

pub use connection::*;
pub use dialect::*;
pub use driver::*;
pub use error::*;
pub use model::*;
pub use schema::*;
pub use types::*;
