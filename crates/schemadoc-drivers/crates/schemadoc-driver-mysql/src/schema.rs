//! MySQL catalog queries

use async_trait::async_trait;
use schemadoc_core::{
    ColumnKey, Connection, EnumEntry, ForeignKeyEntry, RawColumn, Result, Row, SchemaIntrospection,
    UniqueEntry, Value,
};

use crate::MySqlConnection;

pub(crate) const LIST_TABLES: &str = "
    SELECT table_name
    FROM   information_schema.tables
    WHERE  table_type = 'BASE TABLE'
           AND table_schema = ?
    ORDER  BY table_name";

pub(crate) const LIST_COLUMNS: &str = "
    SELECT column_name,
           upper(data_type),
           is_nullable,
           coalesce(character_maximum_length, 0)
    FROM   information_schema.columns
    WHERE  table_schema = ?
           AND table_name = ?
    ORDER  BY ordinal_position";

pub(crate) const PRIMARY_KEYS: &str = "
    SELECT kcu.table_name,
           kcu.column_name
    FROM   information_schema.key_column_usage AS kcu
    WHERE  kcu.constraint_name = 'PRIMARY'
           AND kcu.table_schema = ?";

pub(crate) const FOREIGN_KEYS: &str = "
    SELECT rf.table_name            AS origin_table_name,
           rf.referenced_table_name AS target_table_name,
           kcu.column_name,
           rf.delete_rule,
           rf.update_rule
    FROM   information_schema.referential_constraints AS rf
           JOIN information_schema.key_column_usage AS kcu
             ON kcu.constraint_name = rf.constraint_name
                AND kcu.constraint_schema = rf.constraint_schema
                AND kcu.table_name = rf.table_name
    WHERE  rf.constraint_schema = ?";

pub(crate) const ENUM_COLUMNS: &str = "
    SELECT col.table_name,
           col.column_name,
           col.data_type,
           col.column_type
    FROM   information_schema.columns AS col
    WHERE  col.data_type = 'enum'
           AND col.table_schema = ?";

pub(crate) const UNIQUE_COLUMNS: &str = "
    SELECT DISTINCT kcu.table_name,
                    kcu.column_name,
                    ''
    FROM   information_schema.key_column_usage AS kcu
           JOIN information_schema.table_constraints AS tc
             ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
    WHERE  tc.constraint_type = 'UNIQUE'
           AND kcu.table_schema = ?";

fn cell(row: &Row, idx: usize) -> String {
    row.get_string(idx)
}

/// Extract the allowed values from a column type such as
/// `enum('unit','decimal')`. Quotes may be escaped by doubling them.
pub(crate) fn parse_enum_column_type(column_type: &str) -> Vec<String> {
    let trimmed = column_type.trim();
    let body = trimmed
        .strip_prefix("enum(")
        .or_else(|| trimmed.strip_prefix("ENUM("))
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if in_quotes && chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            '\'' => in_quotes = !in_quotes,
            ',' if !in_quotes => values.push(std::mem::take(&mut current)),
            _ if in_quotes => current.push(ch),
            _ => {}
        }
    }
    if !current.is_empty() || !values.is_empty() {
        values.push(current);
    }
    values
}

pub(crate) fn parse_column_row(row: &Row) -> RawColumn {
    RawColumn {
        name: cell(row, 0),
        data_type: cell(row, 1),
        nullable: row.get(2).and_then(|v| v.as_bool()).unwrap_or(false),
        length: row.get(3).and_then(|v| v.as_i64()).unwrap_or(0),
    }
}

pub(crate) fn parse_foreign_key_row(row: &Row) -> ForeignKeyEntry {
    ForeignKeyEntry {
        key: ColumnKey::new(cell(row, 0), cell(row, 2)),
        target_table: cell(row, 1),
        delete_rule: cell(row, 3),
        update_rule: cell(row, 4),
    }
}

pub(crate) fn parse_enum_row(row: &Row) -> EnumEntry {
    EnumEntry {
        key: ColumnKey::new(cell(row, 0), cell(row, 1)),
        enum_name: cell(row, 2),
        values: parse_enum_column_type(&cell(row, 3)),
    }
}

#[async_trait]
impl SchemaIntrospection for MySqlConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let result = self
            .query(LIST_TABLES, &[Value::String(schema.to_string())])
            .await?;
        Ok(result.rows.iter().map(|row| cell(row, 0)).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
        let result = self
            .query(
                LIST_COLUMNS,
                &[
                    Value::String(schema.to_string()),
                    Value::String(table.to_string()),
                ],
            )
            .await?;
        Ok(result.rows.iter().map(parse_column_row).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn primary_keys(&self, schema: &str) -> Result<Vec<ColumnKey>> {
        let result = self
            .query(PRIMARY_KEYS, &[Value::String(schema.to_string())])
            .await?;
        Ok(result
            .rows
            .iter()
            .map(|row| ColumnKey::new(cell(row, 0), cell(row, 1)))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyEntry>> {
        let result = self
            .query(FOREIGN_KEYS, &[Value::String(schema.to_string())])
            .await?;
        Ok(result.rows.iter().map(parse_foreign_key_row).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn enum_columns(&self, schema: &str) -> Result<Vec<EnumEntry>> {
        let result = self
            .query(ENUM_COLUMNS, &[Value::String(schema.to_string())])
            .await?;
        Ok(result.rows.iter().map(parse_enum_row).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn unique_columns(&self, schema: &str) -> Result<Vec<UniqueEntry>> {
        let result = self
            .query(UNIQUE_COLUMNS, &[Value::String(schema.to_string())])
            .await?;
        Ok(result
            .rows
            .iter()
            .map(|row| UniqueEntry {
                key: ColumnKey::new(cell(row, 0), cell(row, 1)),
                index_definition: String::new(),
            })
            .collect())
    }
}
