//! Shared fixtures: a freshly created `shop` schema per dialect.
//!
//! The schema has three tables:
//!
//! - `order (id)`
//! - `product (id, name VARCHAR(200) UNIQUE, counting_option ENUM('unit', 'decimal'))`
//! - `order_line (id, order_id -> order, product_id -> product)`
//!
//! Both foreign keys use `ON DELETE RESTRICT`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use schemadoc_core::{Connection, ConnectionConfig, DatabaseDriver, Dialect};
use schemadoc_drivers::{mysql::MySqlDriver, postgres::PostgresDriver};

use crate::test_containers::{ContainerInfo, RunningContainer, mysql_container, postgres_container};

/// Test driver identifier for parameterized testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestDriver {
    Postgres,
    Mysql,
}

impl TestDriver {
    pub fn dialect(&self) -> Dialect {
        match self {
            TestDriver::Postgres => Dialect::Postgres,
            TestDriver::Mysql => Dialect::MySql,
        }
    }

    fn driver(&self) -> Box<dyn DatabaseDriver> {
        match self {
            TestDriver::Postgres => Box::new(PostgresDriver::new()),
            TestDriver::Mysql => Box::new(MySqlDriver::new()),
        }
    }

    fn shop_ddl(&self) -> &'static [&'static str] {
        match self {
            TestDriver::Postgres => POSTGRES_SHOP,
            TestDriver::Mysql => MYSQL_SHOP,
        }
    }
}

const POSTGRES_SHOP: &[&str] = &[
    r#"CREATE TABLE "order" (id SERIAL NOT NULL CONSTRAINT order_pk PRIMARY KEY)"#,
    "CREATE TYPE counting_option AS ENUM ('unit', 'decimal')",
    "CREATE TABLE product (
         id              SERIAL NOT NULL CONSTRAINT product_pk PRIMARY KEY,
         name            VARCHAR(200) NOT NULL,
         counting_option counting_option NOT NULL
     )",
    "CREATE UNIQUE INDEX product_name_uindex ON product (name)",
    r#"CREATE TABLE order_line (
         id         SERIAL NOT NULL CONSTRAINT order_line_pk PRIMARY KEY,
         order_id   INTEGER NOT NULL CONSTRAINT order_line_order_id_fk
                        REFERENCES "order" ON DELETE RESTRICT,
         product_id INTEGER NOT NULL CONSTRAINT order_line_product_id_fk
                        REFERENCES product ON DELETE RESTRICT
     )"#,
];

const MYSQL_SHOP: &[&str] = &[
    "CREATE TABLE `order` (id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY)",
    "CREATE TABLE product (
         id              BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
         name            VARCHAR(200) NOT NULL,
         counting_option ENUM('unit', 'decimal') NOT NULL,
         CONSTRAINT product_name_uindex UNIQUE (name)
     )",
    "CREATE TABLE order_line (
         id         BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
         order_id   BIGINT UNSIGNED,
         product_id BIGINT UNSIGNED,
         CONSTRAINT order_line_order_id_fk
             FOREIGN KEY (order_id) REFERENCES `order` (id) ON DELETE RESTRICT,
         CONSTRAINT order_line_product_id_fk
             FOREIGN KEY (product_id) REFERENCES product (id) ON DELETE RESTRICT
     )",
];

/// A running server holding the `shop` schema
pub struct ShopDatabase {
    _container: RunningContainer,
    pub config: ConnectionConfig,
    pub connection: Arc<dyn Connection>,
}

impl ShopDatabase {
    /// Start a container for `driver` and create the shop schema in it
    pub async fn start(driver: TestDriver) -> anyhow::Result<Self> {
        let (container, info) = match driver {
            TestDriver::Postgres => postgres_container().await?,
            TestDriver::Mysql => mysql_container().await?,
        };
        let config = connection_config(driver, &info);
        let connection = connect_with_retry(driver, &config).await?;

        for statement in driver.shop_ddl() {
            connection
                .execute(statement, &[])
                .await
                .with_context(|| format!("failed to create shop schema: {}", statement))?;
        }
        tracing::info!(driver = ?driver, "shop schema created");

        Ok(Self {
            _container: container,
            config,
            connection,
        })
    }

    pub fn schema(&self) -> &str {
        &self.config.schema
    }

    pub async fn execute(&self, sql: &str) -> anyhow::Result<()> {
        self.connection
            .execute(sql, &[])
            .await
            .with_context(|| format!("failed to execute: {}", sql))?;
        Ok(())
    }
}

fn connection_config(driver: TestDriver, info: &ContainerInfo) -> ConnectionConfig {
    let config = ConnectionConfig::new(driver.dialect(), &info.host, &info.database, &info.username)
        .with_port(info.port)
        .with_password(&info.password);
    match driver {
        TestDriver::Postgres => config.with_schema("public"),
        TestDriver::Mysql => config.with_schema(&info.database),
    }
}

/// The server may accept TCP before it accepts logins
async fn connect_with_retry(
    driver: TestDriver,
    config: &ConnectionConfig,
) -> anyhow::Result<Arc<dyn Connection>> {
    let database_driver = driver.driver();
    let max_retries = 10;
    let mut attempt = 1;

    loop {
        match database_driver.connect(config).await {
            Ok(connection) => return Ok(connection),
            Err(e) if attempt < max_retries => {
                let delay = Duration::from_secs(2u64.pow(attempt.min(4)));
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs(),
                    "connection failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to connect after {} attempts: {}",
                    max_retries,
                    e
                ));
            }
        }
    }
}
