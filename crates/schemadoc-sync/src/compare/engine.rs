//! Five-way diff of a live snapshot against the stored dictionary

use std::collections::HashSet;

use schemadoc_core::{ColumnDescriptor, Table};

use super::comparator::{CompareResult, compare_descriptors};
use super::diff::{ColumnChange, DeletedColumn, DiffResult, NewColumn};
use crate::LiveSchema;

/// Computes [`DiffResult`]s
#[derive(Debug, Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Classify every difference between `live` and the stored records.
    ///
    /// New tables keep live order, deleted tables keep stored order. Column
    /// level sets only cover tables known to both sides.
    #[tracing::instrument(skip_all)]
    pub fn compute(
        &self,
        live: &LiveSchema,
        stored_tables: &[Table],
        stored_columns: &[ColumnDescriptor],
    ) -> CompareResult<DiffResult> {
        let stored_ids: HashSet<&str> = stored_tables.iter().map(|t| t.id.as_str()).collect();
        let live_names: HashSet<&str> = live.table_names().collect();

        let mut diff = DiffResult::new();

        diff.new_tables = live
            .table_names()
            .filter(|name| !stored_ids.contains(name))
            .map(str::to_string)
            .collect();

        diff.deleted_tables = stored_tables
            .iter()
            .filter(|t| !live_names.contains(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect();

        for table in live.tables.iter().filter(|t| stored_ids.contains(t.name.as_str())) {
            let stored_for_table: Vec<&ColumnDescriptor> = stored_columns
                .iter()
                .filter(|c| c.table_name == table.name)
                .collect();

            for live_column in &table.columns {
                match stored_for_table.iter().find(|c| c.same_column(live_column)) {
                    None => diff.new_columns.push(NewColumn {
                        table_name: table.name.clone(),
                        name: live_column.name.clone(),
                    }),
                    Some(stored) => {
                        let comparison = compare_descriptors(stored, live_column)?;
                        if !comparison.is_equal() {
                            diff.column_changes.push(ColumnChange {
                                id: stored.id.clone(),
                                name: stored.name.clone(),
                                table_name: stored.table_name.clone(),
                                message: comparison.message(),
                            });
                        }
                    }
                }
            }

            for stored in &stored_for_table {
                if !table.columns.iter().any(|c| c.same_column(stored)) {
                    diff.deleted_columns.push(DeletedColumn {
                        id: stored.id.clone(),
                        table_name: stored.table_name.clone(),
                        name: stored.name.clone(),
                    });
                }
            }
        }

        tracing::debug!(changes = diff.change_count(), "diff computed");
        Ok(diff)
    }
}
