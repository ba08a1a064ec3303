//! MongoDB metadata store

use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, ClientSession, Collection, Database,
    options::{ClientOptions, ReadConcern, ReadPreference, SelectionCriteria},
};
use schemadoc_core::{ColumnDescriptor, ConnectionIdentity, Domain, DomainTableLink, Table};

use crate::{MetadataStore, StoreError, StoreResult, allocate_column_id, resolve_link};

const IDENTITY: &str = "db";
const TABLES: &str = "tables";
const COLUMNS: &str = "columns";
const DOMAINS: &str = "domains";
const DOMAIN_TABLES: &str = "domain_tables";

/// Metadata store keeping one document per record in a MongoDB database.
///
/// Table removal runs in a multi-document transaction, which requires the
/// server to be part of a replica set.
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect to `uri` and use database `database`
    #[tracing::instrument(skip(uri))]
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        tracing::debug!("connecting to MongoDB metadata store");

        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Fail at startup rather than on the first request
        client.database(database).run_command(doc! { "ping": 1 }).await?;

        tracing::info!(database = %database, "MongoDB metadata store connected");
        Ok(Self {
            database: client.database(database),
            client,
        })
    }

    fn identities(&self) -> Collection<ConnectionIdentity> {
        self.database.collection(IDENTITY)
    }

    fn tables(&self) -> Collection<Table> {
        self.database.collection(TABLES)
    }

    fn columns(&self) -> Collection<ColumnDescriptor> {
        self.database.collection(COLUMNS)
    }

    fn domains(&self) -> Collection<Domain> {
        self.database.collection(DOMAINS)
    }

    fn domain_tables(&self) -> Collection<DomainTableLink> {
        self.database.collection(DOMAIN_TABLES)
    }

    async fn start_transaction(&self) -> StoreResult<ClientSession> {
        let mut session = self.client.start_session().await?;
        session
            .start_transaction()
            .read_concern(ReadConcern::majority())
            .selection_criteria(SelectionCriteria::ReadPreference(
                ReadPreference::PrimaryPreferred {
                    options: Default::default(),
                },
            ))
            .await?;
        Ok(session)
    }

    /// Commit on success, abort on failure
    async fn finish_transaction<T>(
        session: &mut ClientSession,
        outcome: StoreResult<T>,
    ) -> StoreResult<T> {
        match outcome {
            Ok(value) => {
                session.commit_transaction().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "failed to abort transaction");
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl MetadataStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn get_identity(&self) -> StoreResult<Option<ConnectionIdentity>> {
        Ok(self.identities().find_one(doc! {}).await?)
    }

    async fn put_identity(&self, identity: &ConnectionIdentity) -> StoreResult<()> {
        self.identities().delete_many(doc! {}).await?;
        self.identities().insert_one(identity).await?;
        Ok(())
    }

    async fn add_table(&self, table: &Table) -> StoreResult<()> {
        self.tables()
            .replace_one(doc! { "id": &table.id }, table)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_table(&self, id: &str) -> StoreResult<Option<Table>> {
        Ok(self.tables().find_one(doc! { "id": id }).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_table(&self, id: &str) -> StoreResult<()> {
        let mut session = self.start_transaction().await?;

        let outcome: StoreResult<u64> = async {
            let columns = self
                .columns()
                .delete_many(doc! { "table_name": id })
                .session(&mut session)
                .await?;
            self.domain_tables()
                .delete_many(doc! { "table_id": id })
                .session(&mut session)
                .await?;
            let table = self
                .tables()
                .delete_one(doc! { "id": id })
                .session(&mut session)
                .await?;
            if table.deleted_count == 0 {
                return Err(StoreError::NotFound(format!("table '{}'", id)));
            }
            Ok(columns.deleted_count)
        }
        .await;

        let removed = Self::finish_transaction(&mut session, outcome).await?;
        tracing::debug!(table = %id, columns = removed, "table removed");
        Ok(())
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        let cursor = self.tables().find(doc! {}).sort(doc! { "id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add_column(&self, mut column: ColumnDescriptor) -> StoreResult<ColumnDescriptor> {
        let duplicate = self
            .columns()
            .find_one(doc! { "table_name": &column.table_name, "name": &column.name })
            .await?;
        if duplicate.is_some() {
            return Err(StoreError::DuplicateColumn {
                table: column.table_name,
                column: column.name,
            });
        }

        let stored: Vec<ColumnDescriptor> = self.columns().find(doc! {}).await?.try_collect().await?;
        column.id = allocate_column_id(&column.table_name, &column.name, stored.len(), |candidate| {
            stored.iter().any(|c| c.id == candidate)
        });

        self.columns().insert_one(&column).await?;
        Ok(column)
    }

    async fn get_column(&self, id: &str) -> StoreResult<Option<ColumnDescriptor>> {
        Ok(self.columns().find_one(doc! { "id": id }).await?)
    }

    #[tracing::instrument(skip(self, column))]
    async fn replace_column(
        &self,
        old_id: &str,
        mut column: ColumnDescriptor,
    ) -> StoreResult<ColumnDescriptor> {
        let mut session = self.start_transaction().await?;

        let outcome: StoreResult<ColumnDescriptor> = async {
            let mut cursor = self.columns().find(doc! {}).session(&mut session).await?;
            let stored: Vec<ColumnDescriptor> = cursor.stream(&mut session).try_collect().await?;
            if !stored.iter().any(|c| c.id == old_id) {
                return Err(StoreError::NotFound(format!("column '{}'", old_id)));
            }
            if stored
                .iter()
                .any(|c| c.id != old_id && c.same_column(&column))
            {
                return Err(StoreError::DuplicateColumn {
                    table: column.table_name.clone(),
                    column: column.name.clone(),
                });
            }

            column.id =
                allocate_column_id(&column.table_name, &column.name, stored.len(), |candidate| {
                    stored.iter().any(|c| c.id == candidate)
                });
            self.columns()
                .insert_one(&column)
                .session(&mut session)
                .await?;
            self.columns()
                .delete_one(doc! { "id": old_id })
                .session(&mut session)
                .await?;
            Ok(column)
        }
        .await;

        Self::finish_transaction(&mut session, outcome).await
    }

    async fn remove_column(&self, id: &str) -> StoreResult<()> {
        let result = self.columns().delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(format!("column '{}'", id)));
        }
        Ok(())
    }

    async fn list_columns(&self) -> StoreResult<Vec<ColumnDescriptor>> {
        let cursor = self.columns().find(doc! {}).sort(doc! { "id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_everything(&self) -> StoreResult<()> {
        for name in [IDENTITY, TABLES, COLUMNS, DOMAINS, DOMAIN_TABLES] {
            self.database.collection::<Document>(name).drop().await?;
        }
        tracing::info!(database = %self.database.name(), "metadata store cleared");
        Ok(())
    }

    async fn update_table_description(&self, id: &str, description: &str) -> StoreResult<()> {
        let result = self
            .tables()
            .update_one(doc! { "id": id }, doc! { "$set": { "description": description } })
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(format!("table '{}'", id)));
        }
        Ok(())
    }

    async fn update_column_description(&self, id: &str, description: &str) -> StoreResult<()> {
        let result = self
            .columns()
            .update_one(doc! { "id": id }, doc! { "$set": { "description": description } })
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound(format!("column '{}'", id)));
        }
        Ok(())
    }

    async fn create_domain(&self, domain: &Domain) -> StoreResult<()> {
        self.domains()
            .replace_one(doc! { "name": &domain.name }, domain)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn list_domains(&self) -> StoreResult<Vec<Domain>> {
        let cursor = self.domains().find(doc! {}).sort(doc! { "name": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_domain_links(&self) -> StoreResult<Vec<DomainTableLink>> {
        let cursor = self.domain_tables().find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn link_table_with_domain(
        &self,
        table_id: &str,
        domain_name: &str,
    ) -> StoreResult<DomainTableLink> {
        if self.get_table(table_id).await?.is_none() {
            return Err(StoreError::NotFound(format!("table '{}'", table_id)));
        }
        if self
            .domains()
            .find_one(doc! { "name": domain_name })
            .await?
            .is_none()
        {
            return Err(StoreError::NotFound(format!("domain '{}'", domain_name)));
        }

        let existing = self
            .domain_tables()
            .find_one(doc! { "table_id": table_id })
            .await?;
        if let Some(link) = resolve_link(existing, table_id, domain_name)? {
            return Ok(link);
        }

        let link = DomainTableLink::new(table_id, domain_name);
        self.domain_tables().insert_one(&link).await?;
        tracing::debug!(table = %table_id, domain = %domain_name, "table linked with domain");
        Ok(link)
    }
}
