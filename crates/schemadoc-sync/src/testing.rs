//! In-memory catalog for exercising sync passes without a database

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use schemadoc_core::{
    ColumnKey, Connection, EnumEntry, ForeignKeyEntry, QueryResult, RawColumn, Result,
    SchemaDocError, SchemaIntrospection, StatementResult, UniqueEntry, Value,
};

#[derive(Debug, Clone, Default)]
struct CatalogState {
    tables: Vec<(String, Vec<RawColumn>)>,
    primary_keys: Vec<ColumnKey>,
    foreign_keys: Vec<ForeignKeyEntry>,
    enums: Vec<EnumEntry>,
    uniques: Vec<UniqueEntry>,
}

/// Mock connection serving a mutable, in-memory catalog.
///
/// Tests alter the catalog between passes to simulate schema changes.
#[derive(Default)]
pub struct MockCatalog {
    state: RwLock<CatalogState>,
    failing: AtomicBool,
    lookup_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `order(id PK)`, `product(id PK, name UNIQUE, counting_option ENUM)`
    /// and `order_line(id PK, order_id FK, product_id FK)`
    pub fn shop() -> Self {
        let catalog = Self::new();
        catalog.add_table(
            "order",
            vec![RawColumn::new("id", "INT4", false, 0)],
        );
        catalog.add_table(
            "product",
            vec![
                RawColumn::new("id", "INT4", false, 0),
                RawColumn::new("name", "VARCHAR", false, 200),
                RawColumn::new("counting_option", "COUNTING_OPTION", false, 0),
            ],
        );
        catalog.add_table(
            "order_line",
            vec![
                RawColumn::new("id", "INT4", false, 0),
                RawColumn::new("order_id", "INT4", false, 0),
                RawColumn::new("product_id", "INT4", false, 0),
            ],
        );

        {
            let mut state = catalog.state.write();
            for table in ["order", "product", "order_line"] {
                state.primary_keys.push(ColumnKey::new(table, "id"));
            }
            for (column, target) in [("order_id", "order"), ("product_id", "product")] {
                state.foreign_keys.push(ForeignKeyEntry {
                    key: ColumnKey::new("order_line", column),
                    target_table: target.to_string(),
                    delete_rule: "RESTRICT".to_string(),
                    update_rule: "NO ACTION".to_string(),
                });
            }
            state.enums.push(EnumEntry {
                key: ColumnKey::new("product", "counting_option"),
                enum_name: "counting_option".to_string(),
                values: vec!["unit".to_string(), "decimal".to_string()],
            });
            state.uniques.push(UniqueEntry {
                key: ColumnKey::new("product", "name"),
                index_definition: "CREATE UNIQUE INDEX product_name_key ON public.product USING btree (name)"
                    .to_string(),
            });
        }
        catalog
    }

    pub fn add_table(&self, name: &str, columns: Vec<RawColumn>) {
        self.state.write().tables.push((name.to_string(), columns));
    }

    /// Drop a table and every key entry referring to it
    pub fn drop_table(&self, name: &str) {
        let mut state = self.state.write();
        state.tables.retain(|(table, _)| table != name);
        state.primary_keys.retain(|k| k.table != name);
        state.foreign_keys.retain(|fk| fk.key.table != name);
        state.enums.retain(|e| e.key.table != name);
        state.uniques.retain(|u| u.key.table != name);
    }

    pub fn add_column(&self, table: &str, column: RawColumn) {
        let mut state = self.state.write();
        if let Some((_, columns)) = state.tables.iter_mut().find(|(t, _)| t == table) {
            columns.push(column);
        }
    }

    pub fn drop_column(&self, table: &str, column: &str) {
        let mut state = self.state.write();
        if let Some((_, columns)) = state.tables.iter_mut().find(|(t, _)| t == table) {
            columns.retain(|c| c.name != column);
        }
    }

    pub fn alter_column(&self, table: &str, column: &str, alter: impl FnOnce(&mut RawColumn)) {
        let mut state = self.state.write();
        if let Some(raw) = state
            .tables
            .iter_mut()
            .find(|(t, _)| t == table)
            .and_then(|(_, columns)| columns.iter_mut().find(|c| c.name == column))
        {
            alter(raw);
        }
    }

    pub fn set_enum_values(&self, table: &str, column: &str, values: &[&str]) {
        let key = ColumnKey::new(table, column);
        let mut state = self.state.write();
        if let Some(entry) = state.enums.iter_mut().find(|e| e.key == key) {
            entry.values = values.iter().map(|v| v.to_string()).collect();
        }
    }

    pub fn add_unique(&self, table: &str, column: &str) {
        self.state.write().uniques.push(UniqueEntry {
            key: ColumnKey::new(table, column),
            index_definition: String::new(),
        });
    }

    /// Make every catalog query fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of schema-wide lookups answered so far
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SchemaDocError::Query("catalog query failed".into()))
        } else {
            Ok(())
        }
    }

    fn lookup(&self) -> Result<()> {
        self.check()?;
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Connection for MockCatalog {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.check()?;
        Ok(StatementResult { affected_rows: 0 })
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.check()?;
        Ok(QueryResult::empty())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for MockCatalog {
    async fn list_tables(&self, _schema: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .tables
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn list_columns(&self, _schema: &str, table: &str) -> Result<Vec<RawColumn>> {
        self.check()?;
        Ok(self
            .state
            .read()
            .tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }

    async fn primary_keys(&self, _schema: &str) -> Result<Vec<ColumnKey>> {
        self.lookup()?;
        Ok(self.state.read().primary_keys.clone())
    }

    async fn foreign_keys(&self, _schema: &str) -> Result<Vec<ForeignKeyEntry>> {
        self.lookup()?;
        Ok(self.state.read().foreign_keys.clone())
    }

    async fn enum_columns(&self, _schema: &str) -> Result<Vec<EnumEntry>> {
        self.lookup()?;
        Ok(self.state.read().enums.clone())
    }

    async fn unique_columns(&self, _schema: &str) -> Result<Vec<UniqueEntry>> {
        self.lookup()?;
        Ok(self.state.read().uniques.clone())
    }
}
