//! Database driver trait definition

use crate::{Connection, Dialect, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A database driver
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres", "mysql")
    fn id(&self) -> &'static str {
        self.dialect().id()
    }

    /// Human-readable name (e.g., "PostgreSQL", "MySQL")
    fn name(&self) -> &'static str;

    /// The dialect whose catalog queries this driver runs
    fn dialect(&self) -> Dialect;

    /// Default connection port
    fn default_port(&self) -> u16 {
        self.dialect().default_port()
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Test connection without keeping it open
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        let conn = self.connect(config).await?;
        conn.query("SELECT 1", &[]).await?;
        conn.close().await
    }

    /// Build a connection string from configuration
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// TLS negotiation mode for server connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    #[default]
    Disable,
    Prefer,
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = crate::SchemaDocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(crate::SchemaDocError::Configuration(format!(
                "invalid ssl mode '{}', expected disable, prefer or require",
                other
            ))),
        }
    }
}

/// Connection configuration for the live database
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Schema (namespace) whose tables are documented
    pub schema: String,
    pub ssl_mode: SslMode,
}

impl ConnectionConfig {
    /// Create a configuration with the dialect's default port and schema
    pub fn new(dialect: Dialect, host: &str, database: &str, username: &str) -> Self {
        Self {
            dialect,
            host: host.to_string(),
            port: dialect.default_port(),
            database: database.to_string(),
            username: username.to_string(),
            password: String::new(),
            schema: match dialect {
                Dialect::Postgres => "public".to_string(),
                Dialect::MySql => database.to_string(),
            },
            ssl_mode: SslMode::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    pub fn with_ssl_mode(mut self, ssl_mode: SslMode) -> Self {
        self.ssl_mode = ssl_mode;
        self
    }
}
