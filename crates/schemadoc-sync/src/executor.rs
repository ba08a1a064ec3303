//! Applies a diff to the metadata store

use std::sync::Arc;

use schemadoc_core::Table;
use schemadoc_store::MetadataStore;
use serde::{Deserialize, Serialize};

use crate::{DiffResult, KeyLookups, SchemaIntrospector, SyncResult, build_descriptor};

/// Options controlling how a diff is applied
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Carry the stored description over to a replaced column
    pub preserve_descriptions: bool,
}

/// Counts of the store mutations performed by a sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub tables_removed: usize,
    pub tables_added: usize,
    pub columns_added: usize,
    pub columns_replaced: usize,
    pub columns_removed: usize,
}

/// Mutates the store until it mirrors the live schema
pub struct SyncExecutor {
    introspector: Arc<SchemaIntrospector>,
    store: Arc<dyn MetadataStore>,
    options: SyncOptions,
}

impl SyncExecutor {
    pub fn new(
        introspector: Arc<SchemaIntrospector>,
        store: Arc<dyn MetadataStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            introspector,
            store,
            options,
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Create a table record and every one of its columns with blank
    /// descriptions. Returns the number of columns created.
    async fn add_table_with_columns(&self, name: &str, lookups: &KeyLookups) -> SyncResult<usize> {
        self.store.add_table(&Table::new(name)).await?;
        let columns = self.introspector.table_descriptors(name, lookups).await?;
        let count = columns.len();
        for column in columns {
            self.store.add_column(column).await?;
        }
        Ok(count)
    }

    /// Store every live table and column. Used on first population.
    #[tracing::instrument(skip(self))]
    pub async fn populate(&self) -> SyncResult<SyncReport> {
        let lookups = self.introspector.key_lookups().await?;
        let mut report = SyncReport::default();

        for name in self.introspector.table_names().await? {
            report.columns_added += self.add_table_with_columns(&name, &lookups).await?;
            report.tables_added += 1;
        }

        tracing::info!(
            tables = report.tables_added,
            columns = report.columns_added,
            "metadata store populated"
        );
        Ok(report)
    }

    /// Apply a diff. The first failing step aborts; completed steps stay
    /// applied and a later diff picks up the remainder.
    #[tracing::instrument(skip(self, diff), fields(changes = diff.change_count()))]
    pub async fn apply(&self, diff: &DiffResult) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();
        if diff.is_empty() {
            return Ok(report);
        }

        let lookups = self.introspector.key_lookups().await?;

        for table in &diff.deleted_tables {
            self.store.remove_table(table).await?;
            report.tables_removed += 1;
        }

        for table in &diff.new_tables {
            report.columns_added += self.add_table_with_columns(table, &lookups).await?;
            report.tables_added += 1;
        }

        for change in &diff.column_changes {
            let raw = self
                .introspector
                .column(&change.table_name, &change.name)
                .await?;
            let mut rebuilt = build_descriptor(&change.table_name, &raw, &lookups);

            if self.options.preserve_descriptions
                && let Some(stored) = self.store.get_column(&change.id).await?
            {
                rebuilt.description = stored.description;
            }

            let added = self.store.replace_column(&change.id, rebuilt).await?;
            tracing::debug!(old_id = %change.id, new_id = %added.id, "column replaced");
            report.columns_replaced += 1;
        }

        for column in &diff.new_columns {
            let raw = self
                .introspector
                .column(&column.table_name, &column.name)
                .await?;
            self.store
                .add_column(build_descriptor(&column.table_name, &raw, &lookups))
                .await?;
            report.columns_added += 1;
        }

        for column in &diff.deleted_columns {
            self.store.remove_column(&column.id).await?;
            report.columns_removed += 1;
        }

        tracing::info!(?report, "sync applied");
        Ok(report)
    }
}
