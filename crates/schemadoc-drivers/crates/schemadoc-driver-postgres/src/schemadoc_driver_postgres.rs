//! PostgreSQL driver implementation

mod connection;
mod driver;
mod schema;

pub use connection::PostgresConnection;
pub use driver::PostgresDriver;
