//! Diff data structures
//!
//! A [`DiffResult`] is computed per request and never persisted. It
//! serializes to JSON for operator review before a sync is applied.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// A stored column whose live counterpart differs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// Identifier of the stored record that sync replaces
    pub id: String,
    pub name: String,
    pub table_name: String,
    /// Newline-joined description of every differing attribute
    pub message: String,
}

/// A live column on an already known table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewColumn {
    pub table_name: String,
    pub name: String,
}

/// A stored column whose table still exists but no longer has it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedColumn {
    pub id: String,
    pub table_name: String,
    pub name: String,
}

/// The five-way classification of live versus stored differences.
///
/// Columns of new or deleted tables never appear in the column-level sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub new_tables: Vec<String>,
    pub deleted_tables: Vec<String>,
    pub column_changes: Vec<ColumnChange>,
    pub new_columns: Vec<NewColumn>,
    pub deleted_columns: Vec<DeletedColumn>,
}

impl DiffResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if live and stored agree
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty()
            && self.deleted_tables.is_empty()
            && self.column_changes.is_empty()
            && self.new_columns.is_empty()
            && self.deleted_columns.is_empty()
    }

    /// Returns the total number of changes
    pub fn change_count(&self) -> usize {
        self.new_tables.len()
            + self.deleted_tables.len()
            + self.column_changes.len()
            + self.new_columns.len()
            + self.deleted_columns.len()
    }

    /// Human-readable change summary for review before applying a sync
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no changes".to_string();
        }

        let mut out = String::new();
        if !self.new_tables.is_empty() {
            let _ = writeln!(out, "new tables: {}", self.new_tables.join(", "));
        }
        if !self.deleted_tables.is_empty() {
            let _ = writeln!(out, "deleted tables: {}", self.deleted_tables.join(", "));
        }
        if !self.column_changes.is_empty() {
            let _ = writeln!(out, "changed columns:");
            for change in &self.column_changes {
                let _ = writeln!(out, "  {}.{}:", change.table_name, change.name);
                for line in change.message.lines() {
                    let _ = writeln!(out, "    {}", line);
                }
            }
        }
        if !self.new_columns.is_empty() {
            let names: Vec<String> = self
                .new_columns
                .iter()
                .map(|c| format!("{}.{}", c.table_name, c.name))
                .collect();
            let _ = writeln!(out, "new columns: {}", names.join(", "));
        }
        if !self.deleted_columns.is_empty() {
            let names: Vec<String> = self
                .deleted_columns
                .iter()
                .map(|c| format!("{}.{}", c.table_name, c.name))
                .collect();
            let _ = writeln!(out, "deleted columns: {}", names.join(", "));
        }
        out.trim_end().to_string()
    }
}
