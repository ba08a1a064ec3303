//! schemadoc service entry point

mod config;
mod error;
mod logging;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use schemadoc_core::ConnectionIdentity;
use schemadoc_drivers::DriverRegistry;
use schemadoc_store::{JsonFileStore, MetadataStore};
use schemadoc_sync::{BootstrapOutcome, SchemaIntrospector, SyncEngine, SyncOptions};

use crate::config::{Config, StorageKind};
use crate::logging::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    let _log_guard = logging::init(LoggingConfig::from_config(&config))?;

    config.validate()?;
    let connection_config = config.connection_config()?;

    let registry = DriverRegistry::with_defaults();
    let connection = registry
        .connect(&connection_config)
        .await
        .with_context(|| {
            format!(
                "failed to connect to {} database '{}' on {}:{}",
                connection_config.dialect,
                connection_config.database,
                connection_config.host,
                connection_config.port
            )
        })?;
    tracing::info!(
        driver = %connection_config.dialect,
        host = %connection_config.host,
        database = %connection_config.database,
        "connected to documented database"
    );

    let store = open_store(&config).await?;
    tracing::info!(backend = store.backend(), "metadata store ready");

    let introspector = Arc::new(SchemaIntrospector::new(
        connection.clone(),
        &connection_config.schema,
    )?);
    let engine = Arc::new(SyncEngine::new(
        introspector,
        store,
        SyncOptions {
            preserve_descriptions: config.preserve_descriptions,
        },
    ));

    let identity = ConnectionIdentity::from(&connection_config);
    match engine.bootstrap(&identity, config.force_delete).await? {
        BootstrapOutcome::Populated(report) => tracing::info!(
            tables = report.tables_added,
            columns = report.columns_added,
            "data dictionary populated"
        ),
        BootstrapOutcome::Unchanged => tracing::info!("data dictionary loaded"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, routes::router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = connection.close().await {
        tracing::warn!(error = %e, "failed to close database connection");
    }
    tracing::info!("shut down");
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match config.storage {
        StorageKind::Json => {
            let store = JsonFileStore::open(&config.data_dir)
                .await
                .with_context(|| format!("failed to open {}", config.data_dir.display()))?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "mongodb")]
        StorageKind::Mongo => {
            let store = schemadoc_store::MongoStore::connect(&config.mongo_uri, &config.mongo_db)
                .await
                .context("failed to connect to MongoDB")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb"))]
        StorageKind::Mongo => Err(schemadoc_core::SchemaDocError::NotSupported(
            "mongo storage is not compiled into this build".to_string(),
        )
        .into()),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
