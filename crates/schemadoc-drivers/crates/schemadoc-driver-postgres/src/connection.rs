//! PostgreSQL connection implementation

use async_trait::async_trait;
use bytes::BytesMut;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use schemadoc_core::{
    ColumnMeta, Connection, ConnectionConfig, QueryResult, Result, Row, SchemaDocError,
    SchemaIntrospection, SslMode, StatementResult, Value,
};
use tokio_postgres::{Client, NoTls, Row as PgRow, types::ToSql};

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {})", hint));
        }
    }

    match db_error.code().code() {
        "42P01" => format!("undefined table: {}", message),
        "3D000" => format!("invalid catalog name: {}", message),
        "28P01" => format!("password authentication failed: {}", message),
        code => format!("{} (code: {})", message, code),
    }
}

/// PostgreSQL connection wrapper
///
/// `tokio_postgres::Client` pipelines concurrent requests itself, so the
/// catalog lookups of one pass can run in parallel over a single client.
pub struct PostgresConnection {
    client: Client,
    schema: String,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database and pin `search_path` to the
    /// configured schema
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        tracing::info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            schema = %config.schema,
            "connecting to PostgreSQL database"
        );

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.username)
            .options(format!("-c search_path={}", config.schema).as_str());
        if !config.password.is_empty() {
            pg_config.password(&config.password);
        }

        let client = match config.ssl_mode {
            SslMode::Disable => {
                pg_config.ssl_mode(tokio_postgres::config::SslMode::Disable);
                let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
                    SchemaDocError::Connection(format!(
                        "Failed to connect to PostgreSQL: {}",
                        format_postgres_error(&e)
                    ))
                })?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                    }
                });
                client
            }
            mode => {
                pg_config.ssl_mode(match mode {
                    SslMode::Require => tokio_postgres::config::SslMode::Require,
                    _ => tokio_postgres::config::SslMode::Prefer,
                });
                let tls_connector = TlsConnector::builder()
                    .danger_accept_invalid_certs(mode == SslMode::Require)
                    .build()
                    .map_err(|e| {
                        SchemaDocError::Connection(format!(
                            "Failed to build TLS connector: {}",
                            e
                        ))
                    })?;
                let (client, connection) = pg_config
                    .connect(MakeTlsConnector::new(tls_connector))
                    .await
                    .map_err(|e| {
                        SchemaDocError::Connection(format!(
                            "Failed to connect to PostgreSQL: {}",
                            format_postgres_error(&e)
                        ))
                    })?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!(error = %e, "PostgreSQL connection error");
                    }
                });
                client
            }
        };

        tracing::info!(
            host = %config.host,
            database = %config.database,
            "PostgreSQL connection established"
        );
        Ok(Self {
            client,
            schema: config.schema.clone(),
        })
    }

    /// Schema this connection's `search_path` points at
    pub fn schema(&self) -> &str {
        &self.schema
    }
}

/// Owned parameter values bound to prepared statements
#[derive(Debug)]
enum PgValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl PgValue {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int16(v) => PgValue::Int32(*v as i32),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &tokio_postgres::types::Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &tokio_postgres::types::Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgres"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let pg_params: Vec<PgValue> = params.iter().map(PgValue::from_value).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let affected_rows = self.client.execute(sql, &param_refs).await.map_err(|e| {
            let message = format_postgres_error(&e);
            SchemaDocError::Query(format!("Failed to execute statement: {}", message))
        })?;

        tracing::debug!(affected_rows, "statement executed");
        Ok(StatementResult { affected_rows })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();

        let statement = self.client.prepare(sql).await.map_err(|e| {
            let message = format_postgres_error(&e);
            SchemaDocError::Query(format!("Failed to prepare query: {}", message))
        })?;

        let pg_params: Vec<PgValue> = params.iter().map(PgValue::from_value).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let pg_rows = self
            .client
            .query(&statement, &param_refs)
            .await
            .map_err(|e| {
                let message = format_postgres_error(&e);
                SchemaDocError::Query(format!("Failed to execute query: {}", message))
            })?;

        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .enumerate()
            .map(|(ordinal, col)| ColumnMeta {
                name: col.name().to_string(),
                data_type: col.type_().name().to_string(),
                ordinal,
            })
            .collect();
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let rows = pg_rows
            .iter()
            .map(|pg_row| {
                let values = (0..columns.len())
                    .map(|idx| postgres_to_value(pg_row, idx))
                    .collect();
                Row::new(column_names.clone(), values)
            })
            .collect::<Vec<_>>();

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(rows = rows.len(), execution_time_ms, "query completed");

        Ok(QueryResult {
            id: uuid::Uuid::new_v4(),
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        tracing::info!("closing PostgreSQL connection");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[derive(Debug)]
struct PgFallbackString(String);

impl<'a> tokio_postgres::types::FromSql<'a> for PgFallbackString {
    fn from_sql(
        _: &tokio_postgres::types::Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &tokio_postgres::types::Type) -> bool {
        true
    }
}

fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(Value::Int16)
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(Value::Int32)
            .unwrap_or(Value::Null),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        // text, varchar, name and catalog domains such as sql_identifier
        _ => row
            .try_get::<_, Option<PgFallbackString>>(idx)
            .ok()
            .flatten()
            .map(|value| Value::String(value.0))
            .unwrap_or(Value::Null),
    }
}
