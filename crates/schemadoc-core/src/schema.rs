//! Schema introspection trait and the raw catalog entries it returns

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Dialect capability interface
///
/// Every supported engine implements this once, with its own catalog SQL.
/// The four "wide" lookups (`primary_keys`, `foreign_keys`, `enum_columns`,
/// `unique_columns`) cover the whole schema so a synchronization pass runs
/// each of them exactly once.
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List base-table names in a schema, in catalog order
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// List the columns of a table, in ordinal order
    async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<RawColumn>>;

    /// Every primary-key column of the schema
    async fn primary_keys(&self, schema: &str) -> Result<Vec<ColumnKey>>;

    /// Every foreign-key column of the schema with its target and rules
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyEntry>>;

    /// Every enum-typed column of the schema with its allowed values
    async fn enum_columns(&self, schema: &str) -> Result<Vec<EnumEntry>>;

    /// Every column covered by a unique index or constraint
    async fn unique_columns(&self, schema: &str) -> Result<Vec<UniqueEntry>>;
}

/// (table, column) pair addressing one column of a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub table: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// A column as listed by the catalog, before key/enum/unique enrichment
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    /// Native type name, upper-cased (e.g. `VARCHAR`, `INT4`, `ENUM`)
    pub data_type: String,
    pub nullable: bool,
    /// Declared length, 0 when the type has none
    pub length: i64,
}

impl RawColumn {
    pub fn new(name: &str, data_type: &str, nullable: bool, length: i64) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyEntry {
    pub key: ColumnKey,
    pub target_table: String,
    pub delete_rule: String,
    pub update_rule: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub key: ColumnKey,
    pub enum_name: String,
    /// Allowed values in declaration order
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueEntry {
    pub key: ColumnKey,
    /// Index definition text, empty when the engine does not report one
    pub index_definition: String,
}

/// Split a comma separated enum value list as returned by the catalog
/// queries. Values are trimmed and stripped of surrounding single quotes.
pub fn parse_enum_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim().trim_matches('\'').to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_enum_values_trims_aggregated_labels() {
        assert_eq!(parse_enum_values("unit, decimal"), vec!["unit", "decimal"]);
        assert_eq!(parse_enum_values("unit,decimal"), vec!["unit", "decimal"]);
        assert_eq!(parse_enum_values("'a','b'"), vec!["a", "b"]);
        assert!(parse_enum_values("").is_empty());
    }

    #[test]
    fn test_column_key_display() {
        assert_eq!(ColumnKey::new("product", "name").to_string(), "product.name");
    }
}
