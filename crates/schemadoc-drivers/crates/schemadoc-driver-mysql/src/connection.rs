//! MySQL connection implementation

use async_trait::async_trait;
use mysql_async::{
    Conn, Opts, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts, Row as MySqlRow, SslOpts,
    consts::ColumnType, prelude::*,
};
use schemadoc_core::{
    ColumnMeta, Connection, ConnectionConfig, QueryResult, Result, Row, SchemaDocError,
    SchemaIntrospection, SslMode, StatementResult, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Catalog lookups of one pass may run concurrently, so the pool keeps a
/// few connections around.
const MAX_POOL_CONNECTIONS: usize = 4;

/// MySQL connection wrapper
pub struct MySqlConnection {
    pool: Pool,
    database_name: String,
    closed: AtomicBool,
}

impl MySqlConnection {
    /// Connect to a MySQL database
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        tracing::info!(host = %config.host, port = %config.port, database = %config.database, "connecting to MySQL database");

        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .db_name(Some(config.database.clone()))
            .user(Some(config.username.clone()));

        if !config.password.is_empty() {
            opts_builder = opts_builder.pass(Some(config.password.clone()));
        }

        if config.ssl_mode != SslMode::Disable {
            opts_builder = opts_builder.ssl_opts(Some(
                SslOpts::default().with_danger_accept_invalid_certs(config.ssl_mode == SslMode::Require),
            ));
        }

        let constraints = PoolConstraints::new(1, MAX_POOL_CONNECTIONS).ok_or_else(|| {
            SchemaDocError::Connection(format!(
                "Failed to configure MySQL pool constraints (min=1, max={})",
                MAX_POOL_CONNECTIONS
            ))
        })?;

        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);
        opts_builder = opts_builder.pool_opts(pool_opts);

        let pool = Pool::new(Opts::from(opts_builder));

        // Verify connectivity by acquiring and releasing a connection
        let conn = pool
            .get_conn()
            .await
            .map_err(|e| SchemaDocError::Connection(format!("Failed to connect to MySQL: {}", e)))?;
        drop(conn);

        tracing::info!(host = %config.host, port = %config.port, database = %config.database, "MySQL connection established");
        Ok(Self {
            pool,
            database_name: config.database.clone(),
            closed: AtomicBool::new(false),
        })
    }

    async fn get_conn(&self) -> Result<Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| SchemaDocError::Connection(format!("Failed to get MySQL connection: {}", e)))
    }

    /// In MySQL "schema" and "database" are synonymous
    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

fn value_to_mysql_param(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(v) => mysql_async::Value::Int(*v as i64),
        Value::Int16(v) => mysql_async::Value::Int(*v as i64),
        Value::Int32(v) => mysql_async::Value::Int(*v as i64),
        Value::Int64(v) => mysql_async::Value::Int(*v),
        Value::Float64(v) => mysql_async::Value::Double(*v),
        Value::String(v) => mysql_async::Value::Bytes(v.as_bytes().to_vec()),
        Value::Bytes(v) => mysql_async::Value::Bytes(v.clone()),
    }
}

fn to_params(params: &[Value]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(value_to_mysql_param).collect())
    }
}

/// Convert a mysql_async value, using column type metadata to interpret
/// byte strings
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Int64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DOUBLE
                | ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => {
            if u <= i64::MAX as u64 {
                Value::Int64(u as i64)
            } else {
                Value::String(u.to_string())
            }
        }
        mysql_async::Value::Float(f) => Value::Float64(f as f64),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, _) => Value::String(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, min, sec
        )),
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + hours as u32;
            let sign = if negative { "-" } else { "" };
            Value::String(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let mut conn = self.get_conn().await?;

        conn.exec_drop(sql, to_params(params))
            .await
            .map_err(|e| SchemaDocError::Query(format!("Failed to execute statement: {}", e)))?;
        let affected_rows = conn.affected_rows();

        tracing::debug!(affected_rows, "statement executed");
        Ok(StatementResult { affected_rows })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();
        let mut conn = self.get_conn().await?;

        let mysql_rows: Vec<MySqlRow> = conn
            .exec(sql, to_params(params))
            .await
            .map_err(|e| SchemaDocError::Query(format!("Failed to execute query: {}", e)))?;

        let mut columns = Vec::new();
        let mut column_types = Vec::new();
        if let Some(first_row) = mysql_rows.first() {
            for (ordinal, col) in first_row.columns_ref().iter().enumerate() {
                column_types.push(col.column_type());
                columns.push(ColumnMeta {
                    name: col.name_str().to_string(),
                    data_type: format!("{:?}", col.column_type()),
                    ordinal,
                });
            }
        }
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let mut rows = Vec::with_capacity(mysql_rows.len());
        for mysql_row in mysql_rows {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let mysql_val: mysql_async::Value =
                    mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
                let col_type = column_types
                    .get(idx)
                    .copied()
                    .unwrap_or(ColumnType::MYSQL_TYPE_STRING);
                values.push(mysql_value_to_value(mysql_val, col_type));
            }
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            id: uuid::Uuid::new_v4(),
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing MySQL connection pool");
        self.closed.store(true, Ordering::SeqCst);
        self.pool.clone().disconnect().await.map_err(|e| {
            SchemaDocError::Connection(format!("Failed to close MySQL connection: {}", e))
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}
