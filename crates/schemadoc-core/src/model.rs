//! Data dictionary model persisted by the metadata stores

use crate::{ConnectionConfig, Dialect, RawColumn};
use serde::{Deserialize, Serialize};

/// Parameters identifying which physical database a store snapshot belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub driver: Dialect,
    pub schema: String,
}

impl From<&ConnectionConfig> for ConnectionIdentity {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            user: config.username.clone(),
            password: config.password.clone(),
            host: config.host.clone(),
            port: config.port,
            name: config.database.clone(),
            driver: config.dialect,
            schema: config.schema.clone(),
        }
    }
}

/// One base table of the documented schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Stable identifier, equal to the table name
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
        }
    }
}

/// Portable classification of a native column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericType {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Date,
    Time,
    Timestamp,
    Json,
    Uuid,
    Enum,
    #[default]
    Other,
}

impl GenericType {
    /// Classify a native type name as reported by either dialect's catalog.
    ///
    /// PostgreSQL reports `udt_name` values (`INT4`, `TIMESTAMPTZ`, ...);
    /// MySQL reports `data_type` values (`INT`, `DATETIME`, ...). Enum
    /// columns are classified from their enum flag, not from the name.
    pub fn from_native(native: &str) -> Self {
        match native.to_ascii_uppercase().as_str() {
            "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" | "TINYINT"
            | "MEDIUMINT" | "SERIAL" | "BIGSERIAL" | "YEAR" => GenericType::Integer,
            "FLOAT4" | "FLOAT8" | "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" => {
                GenericType::Float
            }
            "NUMERIC" | "DECIMAL" | "MONEY" => GenericType::Decimal,
            "BOOL" | "BOOLEAN" | "BIT" => GenericType::Boolean,
            "VARCHAR" | "BPCHAR" | "CHAR" | "TEXT" | "NAME" | "CITEXT" | "TINYTEXT"
            | "MEDIUMTEXT" | "LONGTEXT" | "CHARACTER VARYING" | "CHARACTER" => GenericType::Text,
            "BYTEA" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY"
            | "VARBINARY" => GenericType::Binary,
            "DATE" => GenericType::Date,
            "TIME" | "TIMETZ" => GenericType::Time,
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => GenericType::Timestamp,
            "JSON" | "JSONB" => GenericType::Json,
            "UUID" => GenericType::Uuid,
            "ENUM" => GenericType::Enum,
            _ => GenericType::Other,
        }
    }
}

/// Normalized, dialect-independent record of one column plus its description
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDescriptor {
    /// Stable identifier assigned by the metadata store
    pub id: String,
    pub name: String,
    pub table_name: String,
    /// Native type name
    pub db_type: String,
    pub generic_type: GenericType,
    pub nullable: bool,
    /// Declared length, 0 if not applicable
    pub length: i64,
    pub description: String,

    pub is_primary_key: bool,

    pub is_foreign_key: bool,
    pub target_table_fk: String,
    pub delete_rule: String,
    pub update_rule: String,

    pub has_enum: bool,
    pub enum_name: String,
    pub enum_values: Vec<String>,

    pub is_unique: bool,
    pub unique_index_definition: String,
}

impl ColumnDescriptor {
    /// Start a descriptor from a raw catalog column. Key, enum and unique
    /// attributes stay at their zero value until enriched.
    pub fn from_raw(table: &str, raw: &RawColumn) -> Self {
        Self {
            name: raw.name.clone(),
            table_name: table.to_string(),
            db_type: raw.data_type.clone(),
            generic_type: GenericType::from_native(&raw.data_type),
            nullable: raw.nullable,
            length: raw.length,
            ..Default::default()
        }
    }

    /// Whether two descriptors address the same (table, column) pair
    pub fn same_column(&self, other: &ColumnDescriptor) -> bool {
        self.name == other.name && self.table_name == other.table_name
    }
}

/// Named grouping of tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Link between a table and the domain it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTableLink {
    pub id: String,
    pub table_id: String,
    pub domain_name: String,
}

impl DomainTableLink {
    pub fn new(table_id: &str, domain_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            table_id: table_id.to_string(),
            domain_name: domain_name.to_string(),
        }
    }
}
