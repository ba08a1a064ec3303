//! Sync engine facade used by the HTTP layer

use std::collections::HashMap;
use std::sync::Arc;

use schemadoc_core::{
    ColumnDescriptor, ConnectionIdentity, Dialect, Domain, DomainTableLink, Table,
};
use schemadoc_store::{MetadataStore, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    BootstrapController, BootstrapOutcome, DiffEngine, DiffResult, SchemaIntrospector,
    SyncExecutor, SyncOptions, SyncReport, SyncResult,
};

/// Connection identity as shown to dictionary readers, without the password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub driver: Dialect,
    pub schema: String,
}

impl From<ConnectionIdentity> for IdentitySummary {
    fn from(identity: ConnectionIdentity) -> Self {
        Self {
            user: identity.user,
            host: identity.host,
            port: identity.port,
            name: identity.name,
            driver: identity.driver,
            schema: identity.schema,
        }
    }
}

/// One documented table with its columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    #[serde(flatten)]
    pub table: Table,
    pub domain: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
}

/// Everything the dictionary index shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub database: Option<IdentitySummary>,
    pub domains: Vec<Domain>,
    pub tables: Vec<TableEntry>,
}

/// New description of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAnnotation {
    pub col_id: String,
    pub description: String,
}

/// Diff and the mutations it caused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub diff: DiffResult,
    pub report: SyncReport,
}

/// Introspector, store and executor wired together.
///
/// Passes that read or mutate the dictionary are serialized, so a sync
/// never interleaves with another sync, an annotation or a domain change.
pub struct SyncEngine {
    introspector: Arc<SchemaIntrospector>,
    store: Arc<dyn MetadataStore>,
    executor: Arc<SyncExecutor>,
    diff_engine: DiffEngine,
    pass_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        introspector: Arc<SchemaIntrospector>,
        store: Arc<dyn MetadataStore>,
        options: SyncOptions,
    ) -> Self {
        let executor = Arc::new(SyncExecutor::new(
            introspector.clone(),
            store.clone(),
            options,
        ));
        Self {
            introspector,
            store,
            executor,
            diff_engine: DiffEngine::new(),
            pass_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Run the startup population / identity check
    pub async fn bootstrap(
        &self,
        current: &ConnectionIdentity,
        force_reset: bool,
    ) -> SyncResult<BootstrapOutcome> {
        let _pass = self.pass_lock.lock().await;
        BootstrapController::new(self.store.clone(), self.executor.clone())
            .run(current, force_reset)
            .await
    }

    async fn diff(&self) -> SyncResult<DiffResult> {
        let live = self.introspector.live_schema().await?;
        let tables = self.store.list_tables().await?;
        let columns = self.store.list_columns().await?;
        Ok(self.diff_engine.compute(&live, &tables, &columns)?)
    }

    /// Diff the live schema against the store without applying anything
    #[tracing::instrument(skip(self))]
    pub async fn check_changes(&self) -> SyncResult<DiffResult> {
        let _pass = self.pass_lock.lock().await;
        let diff = self.diff().await?;
        tracing::info!(changes = diff.change_count(), "schema changes checked");
        Ok(diff)
    }

    /// Diff and apply in one pass
    #[tracing::instrument(skip(self))]
    pub async fn apply_sync(&self) -> SyncResult<SyncOutcome> {
        let _pass = self.pass_lock.lock().await;
        let diff = self.diff().await?;
        let report = self.executor.apply(&diff).await?;
        Ok(SyncOutcome { diff, report })
    }

    /// Set a table description and any number of its column descriptions.
    ///
    /// Every column must belong to `table_id`. Nothing is written unless
    /// the table and all columns exist.
    #[tracing::instrument(skip(self, table_description, columns), fields(columns = columns.len()))]
    pub async fn annotate(
        &self,
        table_id: &str,
        table_description: &str,
        columns: &[ColumnAnnotation],
    ) -> SyncResult<()> {
        let _pass = self.pass_lock.lock().await;

        if self.store.get_table(table_id).await?.is_none() {
            return Err(StoreError::NotFound(format!("table '{}'", table_id)).into());
        }
        for column in columns {
            match self.store.get_column(&column.col_id).await? {
                Some(stored) if stored.table_name == table_id => {}
                _ => {
                    return Err(StoreError::NotFound(format!(
                        "column '{}' in table '{}'",
                        column.col_id, table_id
                    ))
                    .into());
                }
            }
        }

        self.store
            .update_table_description(table_id, table_description)
            .await?;
        for column in columns {
            self.store
                .update_column_description(&column.col_id, &column.description)
                .await?;
        }
        Ok(())
    }

    /// Create a domain, overwriting one with the same name
    pub async fn create_domain(&self, domain: &Domain) -> SyncResult<()> {
        let _pass = self.pass_lock.lock().await;
        self.store.create_domain(domain).await?;
        tracing::debug!(domain = %domain.name, "domain created");
        Ok(())
    }

    pub async fn domains(&self) -> SyncResult<Vec<Domain>> {
        let _pass = self.pass_lock.lock().await;
        Ok(self.store.list_domains().await?)
    }

    /// Link a table with a domain
    pub async fn link_table_with_domain(
        &self,
        table_id: &str,
        domain_name: &str,
    ) -> SyncResult<DomainTableLink> {
        let _pass = self.pass_lock.lock().await;
        Ok(self.store.link_table_with_domain(table_id, domain_name).await?)
    }

    /// Stored identity, domains and tables with their columns
    pub async fn dictionary(&self) -> SyncResult<Dictionary> {
        let _pass = self.pass_lock.lock().await;

        let database = self.store.get_identity().await?.map(IdentitySummary::from);
        let domains = self.store.list_domains().await?;
        let links: HashMap<String, String> = self
            .store
            .list_domain_links()
            .await?
            .into_iter()
            .map(|link| (link.table_id, link.domain_name))
            .collect();

        let mut columns_by_table: HashMap<String, Vec<ColumnDescriptor>> = HashMap::new();
        for column in self.store.list_columns().await? {
            columns_by_table
                .entry(column.table_name.clone())
                .or_default()
                .push(column);
        }

        let tables = self
            .store
            .list_tables()
            .await?
            .into_iter()
            .map(|table| TableEntry {
                domain: links.get(&table.id).cloned(),
                columns: columns_by_table.remove(&table.id).unwrap_or_default(),
                table,
            })
            .collect();

        Ok(Dictionary {
            database,
            domains,
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncError;
    use crate::testing::MockCatalog;
    use pretty_assertions::assert_eq;
    use schemadoc_store::JsonFileStore;

    fn identity() -> ConnectionIdentity {
        ConnectionIdentity {
            user: "admin".into(),
            password: "secret".into(),
            host: "localhost".into(),
            port: 5432,
            name: "shop".into(),
            driver: Dialect::Postgres,
            schema: "public".into(),
        }
    }

    async fn engine() -> (tempfile::TempDir, Arc<MockCatalog>, SyncEngine) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(MockCatalog::shop());
        let introspector = Arc::new(SchemaIntrospector::new(catalog.clone(), "public").unwrap());
        let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
        let engine = SyncEngine::new(introspector, store, SyncOptions::default());
        engine.bootstrap(&identity(), false).await.unwrap();
        (dir, catalog, engine)
    }

    #[tokio::test]
    async fn test_check_changes_is_idempotent() {
        let (_dir, catalog, engine) = engine().await;

        assert!(engine.check_changes().await.unwrap().is_empty());

        catalog.drop_table("order_line");
        let outcome = engine.apply_sync().await.unwrap();
        assert_eq!(outcome.diff.deleted_tables, vec!["order_line"]);

        assert!(engine.check_changes().await.unwrap().is_empty());
        assert!(engine.check_changes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_descriptions_survive_noop_sync() {
        let (_dir, _catalog, engine) = engine().await;
        let dictionary = engine.dictionary().await.unwrap();
        let product = dictionary
            .tables
            .iter()
            .find(|t| t.table.id == "product")
            .unwrap();
        let name = product.columns.iter().find(|c| c.name == "name").unwrap();

        engine
            .annotate(
                "product",
                "Sellable items",
                &[ColumnAnnotation {
                    col_id: name.id.clone(),
                    description: "Display name".into(),
                }],
            )
            .await
            .unwrap();

        let outcome = engine.apply_sync().await.unwrap();
        assert_eq!(outcome.report, SyncReport::default());

        let column = engine.store().get_column(&name.id).await.unwrap().unwrap();
        assert_eq!(column.description, "Display name");
        let table = engine.store().get_table("product").await.unwrap().unwrap();
        assert_eq!(table.description, "Sellable items");
    }

    #[tokio::test]
    async fn test_dictionary_hides_password_and_groups_columns() {
        let (_dir, _catalog, engine) = engine().await;
        engine
            .create_domain(&Domain {
                name: "catalog".into(),
                description: "Catalog tables".into(),
            })
            .await
            .unwrap();
        engine
            .link_table_with_domain("product", "catalog")
            .await
            .unwrap();

        let dictionary = engine.dictionary().await.unwrap();

        let database = dictionary.database.clone().unwrap();
        assert_eq!(database.name, "shop");
        let json = serde_json::to_string(&dictionary).unwrap();
        assert!(!json.contains("secret"));

        assert_eq!(dictionary.tables.len(), 3);
        let product = dictionary
            .tables
            .iter()
            .find(|t| t.table.id == "product")
            .unwrap();
        assert_eq!(product.domain.as_deref(), Some("catalog"));
        assert_eq!(product.columns.len(), 3);
        assert_eq!(dictionary.domains.len(), 1);
    }

    #[tokio::test]
    async fn test_annotate_unknown_column_fails() {
        let (_dir, _catalog, engine) = engine().await;
        let result = engine
            .annotate(
                "product",
                "",
                &[ColumnAnnotation {
                    col_id: "missing_1".into(),
                    description: "x".into(),
                }],
            )
            .await;
        assert!(result.is_err());
    }

    fn product_column(dictionary: &Dictionary, name: &str) -> ColumnDescriptor {
        dictionary
            .tables
            .iter()
            .find(|t| t.table.id == "product")
            .and_then(|t| t.columns.iter().find(|c| c.name == name))
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_annotate_bad_column_writes_nothing() {
        let (_dir, _catalog, engine) = engine().await;
        let name = product_column(&engine.dictionary().await.unwrap(), "name");

        let result = engine
            .annotate(
                "product",
                "Sellable items",
                &[
                    ColumnAnnotation {
                        col_id: name.id.clone(),
                        description: "Display name".into(),
                    },
                    ColumnAnnotation {
                        col_id: "missing_1".into(),
                        description: "x".into(),
                    },
                ],
            )
            .await;
        assert!(matches!(
            result,
            Err(SyncError::Store(StoreError::NotFound(_)))
        ));

        let column = engine.store().get_column(&name.id).await.unwrap().unwrap();
        assert_eq!(column.description, "");
        let table = engine.store().get_table("product").await.unwrap().unwrap();
        assert_eq!(table.description, "");
    }

    #[tokio::test]
    async fn test_annotate_rejects_column_of_other_table() {
        let (_dir, _catalog, engine) = engine().await;
        let order_id = engine
            .store()
            .list_columns()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.table_name == "order" && c.name == "id")
            .unwrap();

        let result = engine
            .annotate(
                "product",
                "Sellable items",
                &[ColumnAnnotation {
                    col_id: order_id.id.clone(),
                    description: "Order key".into(),
                }],
            )
            .await;
        assert!(matches!(
            result,
            Err(SyncError::Store(StoreError::NotFound(_)))
        ));

        let stored = engine.store().get_column(&order_id.id).await.unwrap().unwrap();
        assert_eq!(stored.description, "");
    }

    #[tokio::test]
    async fn test_annotate_unknown_table_is_not_found() {
        let (_dir, _catalog, engine) = engine().await;
        let result = engine.annotate("missing", "x", &[]).await;
        assert!(matches!(
            result,
            Err(SyncError::Store(StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_domain_operations_wait_for_running_pass() {
        let (_dir, _catalog, engine) = engine().await;
        let domain = Domain {
            name: "catalog".into(),
            description: "Catalog tables".into(),
        };

        let pass = engine.pass_lock.lock().await;
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            engine.create_domain(&domain),
        )
        .await;
        assert!(blocked.is_err());
        drop(pass);

        engine.create_domain(&domain).await.unwrap();
        assert_eq!(engine.domains().await.unwrap(), vec![domain]);
        let link = engine
            .link_table_with_domain("product", "catalog")
            .await
            .unwrap();
        assert_eq!(link.table_id, "product");
        assert!(matches!(
            engine.link_table_with_domain("missing", "catalog").await,
            Err(SyncError::Store(StoreError::NotFound(_)))
        ));
    }
}
