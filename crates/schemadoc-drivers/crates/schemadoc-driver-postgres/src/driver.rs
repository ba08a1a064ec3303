//! PostgreSQL driver implementation

use async_trait::async_trait;
use schemadoc_core::{Connection, ConnectionConfig, DatabaseDriver, Dialect, Result};
use std::sync::Arc;

use crate::PostgresConnection;

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = %config.database))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = PostgresConnection::connect(config).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to PostgreSQL database");
            e
        })?;

        tracing::info!(host = %config.host, port = %config.port, database = %config.database, "PostgreSQL connection created");
        Ok(Arc::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let mut conn_str = String::from("postgresql://");

        if !config.username.is_empty() {
            conn_str.push_str(&config.username);
            if !config.password.is_empty() {
                conn_str.push_str(":****");
            }
            conn_str.push('@');
        }

        conn_str.push_str(&format!(
            "{}:{}/{}?options=-csearch_path%3D{}",
            config.host, config.port, config.database, config.schema
        ));

        conn_str
    }
}
