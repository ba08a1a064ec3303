//! Supported SQL dialects

use crate::SchemaDocError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The relational engine a process is configured against.
///
/// Exactly one dialect is active per process; it is chosen once at startup
/// and selects the driver whose catalog queries are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
}

impl Dialect {
    /// Driver id as used by the driver registry
    pub fn id(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::Postgres => 5432,
            Dialect::MySql => 3306,
        }
    }

    pub fn all() -> [Dialect; 2] {
        [Dialect::Postgres, Dialect::MySql]
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dialect {
    type Err = SchemaDocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            other => Err(SchemaDocError::Configuration(format!(
                "unsupported driver '{}', expected 'postgres' or 'mysql'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_driver_names() {
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!(" mysql ".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_serde_uses_driver_ids() {
        assert_eq!(serde_json::to_string(&Dialect::MySql).unwrap(), "\"mysql\"");
        let parsed: Dialect = serde_json::from_str("\"postgres\"").unwrap();
        assert_eq!(parsed, Dialect::Postgres);
    }
}
