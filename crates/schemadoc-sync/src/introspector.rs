//! Live schema snapshots built from a dialect's catalog queries

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use schemadoc_core::{
    ColumnDescriptor, ColumnKey, Connection, EnumEntry, ForeignKeyEntry, GenericType, RawColumn,
    SchemaDocError, SchemaIntrospection, UniqueEntry,
};

use crate::SyncResult;

/// The four schema-wide lookups, keyed by (table, column).
///
/// Fetched once per pass and shared by every descriptor built in it.
#[derive(Debug, Clone, Default)]
pub struct KeyLookups {
    pub primary_keys: HashSet<ColumnKey>,
    pub foreign_keys: HashMap<ColumnKey, ForeignKeyEntry>,
    pub enums: HashMap<ColumnKey, EnumEntry>,
    pub uniques: HashMap<ColumnKey, UniqueEntry>,
}

impl KeyLookups {
    pub fn from_entries(
        primary_keys: Vec<ColumnKey>,
        foreign_keys: Vec<ForeignKeyEntry>,
        enums: Vec<EnumEntry>,
        uniques: Vec<UniqueEntry>,
    ) -> Self {
        Self {
            primary_keys: primary_keys.into_iter().collect(),
            foreign_keys: foreign_keys
                .into_iter()
                .map(|fk| (fk.key.clone(), fk))
                .collect(),
            enums: enums.into_iter().map(|e| (e.key.clone(), e)).collect(),
            uniques: uniques.into_iter().map(|u| (u.key.clone(), u)).collect(),
        }
    }
}

/// Build the descriptor of one raw column.
///
/// A column missing from a lookup keeps the matching flag false and the
/// dependent fields empty.
pub fn build_descriptor(table: &str, raw: &RawColumn, lookups: &KeyLookups) -> ColumnDescriptor {
    let mut descriptor = ColumnDescriptor::from_raw(table, raw);
    let key = ColumnKey::new(table, raw.name.as_str());

    descriptor.is_primary_key = lookups.primary_keys.contains(&key);

    if let Some(fk) = lookups.foreign_keys.get(&key) {
        descriptor.is_foreign_key = true;
        descriptor.target_table_fk = fk.target_table.clone();
        descriptor.delete_rule = fk.delete_rule.clone();
        descriptor.update_rule = fk.update_rule.clone();
    }

    if let Some(entry) = lookups.enums.get(&key) {
        descriptor.has_enum = true;
        descriptor.generic_type = GenericType::Enum;
        descriptor.enum_name = entry.enum_name.clone();
        descriptor.enum_values = entry
            .values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
    }

    if let Some(unique) = lookups.uniques.get(&key) {
        descriptor.is_unique = true;
        descriptor.unique_index_definition = unique.index_definition.clone();
    }

    descriptor
}

/// One live table with its built descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTable {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// Full live snapshot of the configured schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSchema {
    pub tables: Vec<LiveTable>,
}

impl LiveSchema {
    pub fn table(&self, name: &str) -> Option<&LiveTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}

/// Runs catalog queries against the live connection for one schema
pub struct SchemaIntrospector {
    connection: Arc<dyn Connection>,
    schema: String,
}

impl SchemaIntrospector {
    /// Wrap a connection whose driver supports catalog introspection
    pub fn new(connection: Arc<dyn Connection>, schema: impl Into<String>) -> SyncResult<Self> {
        if connection.as_schema_introspection().is_none() {
            return Err(SchemaDocError::NotSupported(format!(
                "driver '{}' does not support schema introspection",
                connection.driver_name()
            ))
            .into());
        }
        Ok(Self {
            connection,
            schema: schema.into(),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    fn catalog(&self) -> SyncResult<&dyn SchemaIntrospection> {
        self.connection.as_schema_introspection().ok_or_else(|| {
            SchemaDocError::NotSupported(format!(
                "driver '{}' does not support schema introspection",
                self.connection.driver_name()
            ))
            .into()
        })
    }

    /// Base-table names in catalog order
    pub async fn table_names(&self) -> SyncResult<Vec<String>> {
        Ok(self.catalog()?.list_tables(&self.schema).await?)
    }

    /// Raw columns of one table in ordinal order
    pub async fn table_columns(&self, table: &str) -> SyncResult<Vec<RawColumn>> {
        Ok(self.catalog()?.list_columns(&self.schema, table).await?)
    }

    /// A single raw column, failing if the table no longer has it
    pub async fn column(&self, table: &str, name: &str) -> SyncResult<RawColumn> {
        self.table_columns(table)
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                SchemaDocError::NotFound(format!("column {}.{} in live schema", table, name)).into()
            })
    }

    /// Fetch the four schema-wide lookups concurrently
    #[tracing::instrument(skip(self), fields(schema = %self.schema))]
    pub async fn key_lookups(&self) -> SyncResult<KeyLookups> {
        let catalog = self.catalog()?;
        let (primary_keys, foreign_keys, enums, uniques) = futures::try_join!(
            catalog.primary_keys(&self.schema),
            catalog.foreign_keys(&self.schema),
            catalog.enum_columns(&self.schema),
            catalog.unique_columns(&self.schema),
        )?;

        tracing::debug!(
            primary_keys = primary_keys.len(),
            foreign_keys = foreign_keys.len(),
            enums = enums.len(),
            uniques = uniques.len(),
            "key lookups fetched"
        );
        Ok(KeyLookups::from_entries(primary_keys, foreign_keys, enums, uniques))
    }

    /// Descriptors of every column of one table
    pub async fn table_descriptors(
        &self,
        table: &str,
        lookups: &KeyLookups,
    ) -> SyncResult<Vec<ColumnDescriptor>> {
        Ok(self
            .table_columns(table)
            .await?
            .iter()
            .map(|raw| build_descriptor(table, raw, lookups))
            .collect())
    }

    /// Snapshot every table of the schema; any failing query aborts it
    #[tracing::instrument(skip(self), fields(schema = %self.schema))]
    pub async fn live_schema(&self) -> SyncResult<LiveSchema> {
        let lookups = self.key_lookups().await?;
        let mut tables = Vec::new();
        for name in self.table_names().await? {
            let columns = self.table_descriptors(&name, &lookups).await?;
            tables.push(LiveTable { name, columns });
        }

        let schema = LiveSchema { tables };
        tracing::info!(
            tables = schema.tables.len(),
            columns = schema.column_count(),
            "live schema introspected"
        );
        Ok(schema)
    }
}
