//! Command-line and environment configuration

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use schemadoc_core::{ConnectionConfig, Dialect, Result, SchemaDocError, SslMode};

/// Metadata store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    Json,
    Mongo,
}

/// Living data dictionary for PostgreSQL and MySQL schemas
#[derive(Parser, Debug, Clone)]
#[command(name = "schemadoc", version, about)]
pub struct Config {
    /// Port the HTTP service listens on
    #[arg(long, env = "SCHEMADOC_SERVER_PORT", default_value_t = 8080)]
    pub server_port: u16,

    #[arg(long, env = "SCHEMADOC_DB_USER", default_value = "")]
    pub db_user: String,

    #[arg(long, env = "SCHEMADOC_DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    #[arg(long, env = "SCHEMADOC_DB_HOST", default_value = "")]
    pub db_host: String,

    /// Defaults to the driver's standard port
    #[arg(long, env = "SCHEMADOC_DB_PORT")]
    pub db_port: Option<u16>,

    #[arg(long, env = "SCHEMADOC_DB_NAME", default_value = "")]
    pub db_name: String,

    /// `postgres` or `mysql`
    #[arg(long, env = "SCHEMADOC_DB_DRIVER", default_value = "")]
    pub db_driver: String,

    /// Schema to document. For MySQL this is the database name.
    #[arg(long, env = "SCHEMADOC_DB_SCHEMA", default_value = "public")]
    pub db_schema: String,

    /// `disable`, `prefer` or `require`
    #[arg(long, env = "SCHEMADOC_DB_SSL_MODE", default_value = "disable")]
    pub db_ssl_mode: String,

    /// Wipe the stored dictionary and capture the live schema again
    #[arg(long, env = "SCHEMADOC_FORCE_DELETE")]
    pub force_delete: bool,

    /// Keep descriptions of columns replaced by a sync
    #[arg(long, env = "SCHEMADOC_PRESERVE_DESCRIPTIONS")]
    pub preserve_descriptions: bool,

    #[arg(long, env = "SCHEMADOC_STORAGE", value_enum, default_value_t = StorageKind::Json)]
    pub storage: StorageKind,

    /// Directory of the JSON store
    #[arg(long, env = "SCHEMADOC_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    #[arg(long, env = "SCHEMADOC_MONGO_DB", default_value = "schemadoc")]
    pub mongo_db: String,

    #[arg(long, env = "SCHEMADOC_MONGO_URI", default_value = "", hide_env_values = true)]
    pub mongo_uri: String,

    /// Directory for rotated log files
    #[arg(long, env = "SCHEMADOC_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Also write JSON log files
    #[arg(long, env = "SCHEMADOC_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Check that every required setting is present and parseable
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("--db-user", &self.db_user),
            ("--db-password", &self.db_password),
            ("--db-host", &self.db_host),
            ("--db-name", &self.db_name),
            ("--db-driver", &self.db_driver),
            ("--db-schema", &self.db_schema),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(flag, _)| *flag)
            .collect();
        if !missing.is_empty() {
            return Err(SchemaDocError::Configuration(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.db_port == Some(0) {
            return Err(SchemaDocError::Configuration(
                "--db-port must be greater than 0".to_string(),
            ));
        }

        self.db_driver.parse::<Dialect>()?;
        self.db_ssl_mode.parse::<SslMode>()?;

        if self.storage == StorageKind::Mongo {
            if self.mongo_uri.trim().is_empty() || self.mongo_db.trim().is_empty() {
                return Err(SchemaDocError::Configuration(
                    "mongo storage requires --mongo-uri and --mongo-db".to_string(),
                ));
            }
            if !cfg!(feature = "mongodb") {
                return Err(SchemaDocError::Configuration(
                    "mongo storage requires a build with the `mongodb` feature".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Connection settings for the documented database
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let dialect: Dialect = self.db_driver.parse()?;
        let mut config = ConnectionConfig::new(dialect, &self.db_host, &self.db_name, &self.db_user)
            .with_password(&self.db_password)
            .with_schema(&self.db_schema)
            .with_ssl_mode(self.db_ssl_mode.parse()?);
        if let Some(port) = self.db_port {
            config = config.with_port(port);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["schemadoc"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    fn complete(driver: &str) -> Vec<&str> {
        vec![
            "--db-user",
            "admin",
            "--db-password",
            "secret",
            "--db-host",
            "localhost",
            "--db-name",
            "shop",
            "--db-driver",
            driver,
        ]
    }

    #[test]
    fn test_defaults() {
        let config = parse(&complete("postgres"));
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.db_schema, "public");
        assert_eq!(config.storage, StorageKind::Json);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert!(!config.force_delete);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_settings_are_listed() {
        let config = parse(&["--db-user", "admin"]);
        match config.validate() {
            Err(SchemaDocError::Configuration(message)) => {
                assert!(message.contains("--db-password"));
                assert!(message.contains("--db-driver"));
                assert!(!message.contains("--db-user"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_driver_rejected() {
        assert!(parse(&complete("sqlite")).validate().is_err());
    }

    #[test]
    fn test_connection_config_uses_driver_default_port() {
        let mut args = complete("mysql");
        args.extend_from_slice(&["--db-schema", "shop"]);
        let connection = parse(&args).connection_config().unwrap();

        assert_eq!(connection.dialect, Dialect::MySql);
        assert_eq!(connection.port, 3306);
        assert_eq!(connection.schema, "shop");
        assert_eq!(connection.password, "secret");
    }

    #[test]
    fn test_mongo_storage_requires_uri() {
        let mut args = complete("postgres");
        args.extend_from_slice(&["--storage", "mongo"]);
        assert!(parse(&args).validate().is_err());
    }
}
