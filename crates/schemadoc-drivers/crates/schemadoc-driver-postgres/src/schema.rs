//! PostgreSQL catalog queries

use async_trait::async_trait;
use schemadoc_core::{
    ColumnKey, Connection, EnumEntry, ForeignKeyEntry, RawColumn, Result, Row, SchemaIntrospection,
    UniqueEntry, Value, parse_enum_values,
};

use crate::PostgresConnection;

pub(crate) const LIST_TABLES: &str = "
    SELECT table_name::text
    FROM   information_schema.tables
    WHERE  table_type = 'BASE TABLE'
           AND table_schema = $1
    ORDER  BY table_name";

pub(crate) const LIST_COLUMNS: &str = "
    SELECT column_name::text,
           upper(udt_name::text),
           is_nullable::text,
           coalesce(character_maximum_length, 0)::bigint
    FROM   information_schema.columns
    WHERE  table_schema = $1
           AND table_name = $2
    ORDER  BY ordinal_position";

pub(crate) const PRIMARY_KEYS: &str = "
    SELECT cu.table_name::text,
           cu.column_name::text
    FROM   information_schema.key_column_usage AS cu
           JOIN information_schema.table_constraints AS tc
             ON tc.constraint_name = cu.constraint_name
                AND tc.constraint_schema = cu.constraint_schema
    WHERE  tc.constraint_type = 'PRIMARY KEY'
           AND tc.table_schema = $1";

pub(crate) const FOREIGN_KEYS: &str = "
    SELECT cu.table_name::text  AS origin_table_name,
           icu.table_name::text AS target_table_name,
           cu.column_name::text,
           rc.delete_rule::text,
           rc.update_rule::text
    FROM   information_schema.key_column_usage AS cu
           JOIN information_schema.table_constraints AS tc
             ON tc.constraint_name = cu.constraint_name
                AND tc.constraint_schema = cu.constraint_schema
           JOIN information_schema.referential_constraints AS rc
             ON tc.constraint_name = rc.constraint_name
                AND tc.constraint_schema = rc.constraint_schema
           JOIN information_schema.constraint_column_usage AS icu
             ON icu.constraint_name = rc.constraint_name
                AND icu.constraint_schema = rc.constraint_schema
    WHERE  tc.constraint_type = 'FOREIGN KEY'
           AND tc.table_schema = $1";

pub(crate) const ENUM_COLUMNS: &str = "
    SELECT isc.table_name::text,
           isc.column_name::text,
           t.typname::text AS enum_name,
           string_agg(e.enumlabel::text, ',' ORDER BY e.enumsortorder) AS enum_values
    FROM   pg_type AS t
           JOIN pg_enum AS e
             ON t.oid = e.enumtypid
           JOIN pg_catalog.pg_namespace AS n
             ON n.oid = t.typnamespace
           JOIN information_schema.columns AS isc
             ON isc.udt_name = t.typname
                AND isc.udt_schema = n.nspname
    WHERE  isc.table_schema = $1
    GROUP  BY t.typname,
              isc.column_name,
              isc.table_name";

pub(crate) const UNIQUE_COLUMNS: &str = "
    SELECT tbl.relname::text                     AS table_name,
           pga.attname::text                     AS column_name,
           pg_get_indexdef(pgi.indexrelid)::text AS definition
    FROM   pg_index AS pgi
           JOIN pg_class AS pgc
             ON pgc.oid = pgi.indexrelid
           JOIN pg_namespace AS pgn
             ON pgn.oid = pgc.relnamespace
           JOIN pg_class AS tbl
             ON tbl.oid = pgi.indrelid
           JOIN pg_attribute AS pga
             ON pga.attrelid = pgc.oid
    WHERE  pgi.indisunique = true
           AND NOT pgi.indisprimary
           AND pgn.nspname = $1";

fn cell(row: &Row, idx: usize) -> String {
    row.get(idx)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
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
        values: parse_enum_values(&cell(row, 3)),
    }
}

#[async_trait]
impl SchemaIntrospection for PostgresConnection {
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
                index_definition: cell(row, 2),
            })
            .collect())
    }
}
