//! MySQL driver implementation

use async_trait::async_trait;
use schemadoc_core::{Connection, ConnectionConfig, DatabaseDriver, Dialect, Result};
use std::sync::Arc;

use crate::MySqlConnection;

/// MySQL database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = %config.database))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        if config.schema != config.database {
            tracing::warn!(
                schema = %config.schema,
                database = %config.database,
                "MySQL schema differs from the connected database; catalog queries use the schema"
            );
        }

        let conn = MySqlConnection::connect(config).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to MySQL database");
            e
        })?;

        tracing::info!(host = %config.host, port = %config.port, database = %config.database, "MySQL connection created");
        Ok(Arc::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let mut conn_str = String::from("mysql://");

        if !config.username.is_empty() {
            conn_str.push_str(&config.username);
            if !config.password.is_empty() {
                conn_str.push_str(":****");
            }
            conn_str.push('@');
        }

        conn_str.push_str(&format!(
            "{}:{}/{}",
            config.host, config.port, config.database
        ));

        conn_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_and_schema() {
        let driver = MySqlDriver::new();
        let config = ConnectionConfig::new(Dialect::MySql, "localhost", "shop", "root");

        assert_eq!(driver.default_port(), 3306);
        assert_eq!(config.schema, "shop");
        assert_eq!(
            driver.build_connection_string(&config),
            "mysql://root@localhost:3306/shop"
        );
    }
}
