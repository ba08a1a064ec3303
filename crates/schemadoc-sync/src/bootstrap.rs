//! Startup population and the connection identity guard

use std::fmt;
use std::sync::Arc;

use schemadoc_core::ConnectionIdentity;
use schemadoc_store::MetadataStore;

use crate::{SyncError, SyncExecutor, SyncReport, SyncResult};

/// What the store holds relative to this process start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// No connection identity recorded
    Uninitialized,
    /// An identity is recorded and must match the configuration
    Populated(ConnectionIdentity),
    /// The operator asked for an unconditional wipe
    ForceReset,
}

/// Field-by-field mismatches between the stored identity and the
/// configuration. The password is never echoed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub mismatches: Vec<String>,
}

impl ConsistencyReport {
    /// Compare two identities; `None` if they are equal
    pub fn compare(stored: &ConnectionIdentity, current: &ConnectionIdentity) -> Option<Self> {
        let mut mismatches = Vec::new();

        if stored.user != current.user {
            mismatches.push(format!("stored user {} != {}", stored.user, current.user));
        }
        if stored.password != current.password {
            mismatches.push("stored db password does not match the configured one".to_string());
        }
        if stored.host != current.host {
            mismatches.push(format!("stored db host {} != {}", stored.host, current.host));
        }
        if stored.port != current.port {
            mismatches.push(format!("stored db port {} != {}", stored.port, current.port));
        }
        if stored.name != current.name {
            mismatches.push(format!("stored db name {} != {}", stored.name, current.name));
        }
        if stored.driver != current.driver {
            mismatches.push(format!(
                "stored db driver {} != {}",
                stored.driver, current.driver
            ));
        }
        if stored.schema != current.schema {
            mismatches.push(format!(
                "stored db schema {} != {}",
                stored.schema, current.schema
            ));
        }

        if mismatches.is_empty() {
            None
        } else {
            Some(Self { mismatches })
        }
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The connection settings do not match the ones stored with the data dictionary."
        )?;
        writeln!(
            f,
            "To remove the stored dictionary and start fresh, run again with --force-delete."
        )?;
        write!(f, "Differences found:")?;
        for mismatch in &self.mismatches {
            write!(f, "\n  {}", mismatch)?;
        }
        Ok(())
    }
}

/// What a bootstrap run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The store was (re)populated from the live schema
    Populated(SyncReport),
    /// The stored identity matched; nothing was touched
    Unchanged,
}

/// Decides, once per process start, between population, no-op and refusal
pub struct BootstrapController {
    store: Arc<dyn MetadataStore>,
    executor: Arc<SyncExecutor>,
}

impl BootstrapController {
    pub fn new(store: Arc<dyn MetadataStore>, executor: Arc<SyncExecutor>) -> Self {
        Self { store, executor }
    }

    pub async fn state(&self, force_reset: bool) -> SyncResult<StoreState> {
        if force_reset {
            return Ok(StoreState::ForceReset);
        }
        Ok(match self.store.get_identity().await? {
            Some(identity) => StoreState::Populated(identity),
            None => StoreState::Uninitialized,
        })
    }

    #[tracing::instrument(skip(self, current), fields(database = %current.name, driver = %current.driver))]
    pub async fn run(
        &self,
        current: &ConnectionIdentity,
        force_reset: bool,
    ) -> SyncResult<BootstrapOutcome> {
        match self.state(force_reset).await? {
            StoreState::ForceReset => {
                tracing::warn!("force reset requested, wiping metadata store");
                self.populate(current).await
            }
            StoreState::Uninitialized => {
                tracing::info!("metadata store is empty, populating from live schema");
                self.populate(current).await
            }
            StoreState::Populated(stored) => match ConsistencyReport::compare(&stored, current) {
                None => {
                    tracing::info!("stored connection identity matches configuration");
                    Ok(BootstrapOutcome::Unchanged)
                }
                Some(report) => {
                    tracing::error!(mismatches = report.mismatches.len(), "connection identity mismatch");
                    Err(SyncError::Consistency(report))
                }
            },
        }
    }

    /// Wipe, store every table and column, then record the identity. An
    /// interrupted population leaves no identity behind, so the next start
    /// retries it.
    async fn populate(&self, current: &ConnectionIdentity) -> SyncResult<BootstrapOutcome> {
        self.store.remove_everything().await?;
        let report = self.executor.populate().await?;
        self.store.put_identity(current).await?;
        Ok(BootstrapOutcome::Populated(report))
    }
}
