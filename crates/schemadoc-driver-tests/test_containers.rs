//! Docker container management for integration tests.
//!
//! Every test gets its own container so schema changes made by one test
//! never leak into another. The container is stopped when the returned
//! handle is dropped.

use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::{mongo::Mongo, mysql::Mysql, postgres::Postgres};

/// Connection details of a running test container
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Host address (typically 127.0.0.1)
    pub host: String,
    /// Port number (randomly assigned by testcontainers)
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl ContainerInfo {
    /// Connection string for a MongoDB container, bypassing replica set discovery
    pub fn mongo_uri(&self) -> String {
        format!("mongodb://{}:{}/?directConnection=true", self.host, self.port)
    }
}

/// Keeps a container alive for as long as it is held
pub enum RunningContainer {
    Postgres(ContainerAsync<Postgres>),
    Mysql(ContainerAsync<Mysql>),
    Mongo(ContainerAsync<Mongo>),
}

/// Start a PostgreSQL container
pub async fn postgres_container() -> anyhow::Result<(RunningContainer, ContainerInfo)> {
    tracing::info!("starting PostgreSQL test container");

    let container = Postgres::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start postgres container: {}", e))?;

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get postgres port: {}", e))?;

    // testcontainers-modules Postgres defaults: postgres user/password with "postgres" database
    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port,
        database: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
    };
    tracing::info!(port, "PostgreSQL test container started");

    Ok((RunningContainer::Postgres(container), info))
}

/// Start a MySQL container
pub async fn mysql_container() -> anyhow::Result<(RunningContainer, ContainerInfo)> {
    tracing::info!("starting MySQL test container");

    let container = Mysql::default()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mysql container: {}", e))?;

    let port = container
        .get_host_port_ipv4(3306)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get mysql port: {}", e))?;

    // testcontainers-modules MySQL defaults: passwordless root with "test" database
    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port,
        database: "test".to_string(),
        username: "root".to_string(),
        password: String::new(),
    };
    tracing::info!(port, "MySQL test container started");

    Ok((RunningContainer::Mysql(container), info))
}

/// Start a single-node MongoDB replica set.
///
/// Multi-document transactions are refused by a standalone server.
pub async fn mongo_container() -> anyhow::Result<(RunningContainer, ContainerInfo)> {
    tracing::info!("starting MongoDB test container");

    let container = Mongo::repl_set()
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mongo container: {}", e))?;

    let port = container
        .get_host_port_ipv4(27017)
        .await
        .map_err(|e| anyhow::anyhow!("failed to get mongo port: {}", e))?;

    // No authentication; each test gets a fresh server so the database name is fixed
    let info = ContainerInfo {
        host: "127.0.0.1".to_string(),
        port,
        database: "schemadoc".to_string(),
        username: String::new(),
        password: String::new(),
    };
    tracing::info!(port, "MongoDB test container started");

    Ok((RunningContainer::Mongo(container), info))
}
