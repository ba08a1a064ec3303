//! Flat-file metadata store.
//!
//! Layout under the data directory, one pretty-printed JSON file per record:
//!
//! ```text
//! <dir>/db/1.json                    connection identity
//! <dir>/tables/<table>.json
//! <dir>/columns/<column id>.json
//! <dir>/domains/<domain name>.json
//! <dir>/domain_tables/<link id>.json
//! ```
//!
//! File names are percent-encoded: `Order` is stored as `%4Frder.json`.
//!
//! Records are written to a temporary file and renamed into place, so a
//! reader never observes a partially written record. Mutations are
//! serialized behind an async mutex.

use async_trait::async_trait;
use schemadoc_core::{ColumnDescriptor, ConnectionIdentity, Domain, DomainTableLink, Table};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::{MetadataStore, StoreError, StoreResult, allocate_column_id, resolve_link};

const IDENTITY: &str = "db";
const IDENTITY_RESOURCE: &str = "1";
const TABLES: &str = "tables";
const COLUMNS: &str = "columns";
const DOMAINS: &str = "domains";
const DOMAIN_TABLES: &str = "domain_tables";

const COLLECTIONS: [&str; 5] = [IDENTITY, TABLES, COLUMNS, DOMAINS, DOMAIN_TABLES];

/// Percent-encode every byte outside `[a-z0-9_-]`.
///
/// The mapping is reversible and never yields two names differing only in
/// case, so distinct catalog identifiers always get distinct files, even on
/// case-insensitive filesystems.
fn encode_file_name(resource: &str) -> String {
    let mut encoded = String::with_capacity(resource.len());
    for b in resource.bytes() {
        match b {
            b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' => encoded.push(b as char),
            _ => encoded.push_str(&format!("%{:02X}", b)),
        }
    }
    encoded
}

/// Metadata store backed by JSON files in a directory
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!(path = ?root, "JSON metadata store opened");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn resource_path(&self, collection: &str, resource: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", encode_file_name(resource)))
    }

    async fn write<T: Serialize>(&self, collection: &str, resource: &str, value: &T) -> StoreResult<()> {
        tokio::fs::create_dir_all(self.collection_dir(collection)).await?;

        let path = self.resource_path(collection, resource);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(value)?;

        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::trace!(collection, resource, "record written");
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, collection: &str, resource: &str) -> StoreResult<Option<T>> {
        let path = self.resource_path(collection, resource);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every record of a collection, ordered by file name
    async fn read_all<T: DeserializeOwned>(&self, collection: &str) -> StoreResult<Vec<T>> {
        let dir = self.collection_dir(collection);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let content = tokio::fs::read_to_string(&path).await?;
            records.push(serde_json::from_str(&content)?);
        }
        Ok(records)
    }

    async fn delete(&self, collection: &str, resource: &str) -> StoreResult<()> {
        let path = self.resource_path(collection, resource);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(
                format!("{} record '{}'", collection, resource),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_collection(&self, collection: &str) -> StoreResult<()> {
        match tokio::fs::remove_dir_all(self.collection_dir(collection)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn table_link(&self, table_id: &str) -> StoreResult<Option<DomainTableLink>> {
        let links: Vec<DomainTableLink> = self.read_all(DOMAIN_TABLES).await?;
        Ok(links.into_iter().find(|link| link.table_id == table_id))
    }
}

#[async_trait]
impl MetadataStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    async fn get_identity(&self) -> StoreResult<Option<ConnectionIdentity>> {
        self.read(IDENTITY, IDENTITY_RESOURCE).await
    }

    async fn put_identity(&self, identity: &ConnectionIdentity) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(IDENTITY, IDENTITY_RESOURCE, identity).await
    }

    async fn add_table(&self, table: &Table) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(TABLES, &table.id, table).await
    }

    async fn get_table(&self, id: &str) -> StoreResult<Option<Table>> {
        self.read(TABLES, id).await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_table(&self, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let columns: Vec<ColumnDescriptor> = self.read_all(COLUMNS).await?;
        let mut removed = 0usize;
        for column in columns.iter().filter(|c| c.table_name == id) {
            self.delete(COLUMNS, &column.id).await?;
            removed += 1;
        }

        if let Some(link) = self.table_link(id).await? {
            self.delete(DOMAIN_TABLES, &link.id).await?;
        }

        self.delete(TABLES, id).await?;
        tracing::debug!(table = %id, columns = removed, "table removed");
        Ok(())
    }

    async fn list_tables(&self) -> StoreResult<Vec<Table>> {
        self.read_all(TABLES).await
    }

    async fn add_column(&self, mut column: ColumnDescriptor) -> StoreResult<ColumnDescriptor> {
        let _guard = self.write_lock.lock().await;

        let stored: Vec<ColumnDescriptor> = self.read_all(COLUMNS).await?;
        if stored.iter().any(|c| c.same_column(&column)) {
            return Err(StoreError::DuplicateColumn {
                table: column.table_name,
                column: column.name,
            });
        }

        column.id = allocate_column_id(&column.table_name, &column.name, stored.len(), |candidate| {
            stored.iter().any(|c| c.id == candidate)
        });
        self.write(COLUMNS, &column.id, &column).await?;
        Ok(column)
    }

    async fn get_column(&self, id: &str) -> StoreResult<Option<ColumnDescriptor>> {
        self.read(COLUMNS, id).await
    }

    #[tracing::instrument(skip(self, column))]
    async fn replace_column(
        &self,
        old_id: &str,
        mut column: ColumnDescriptor,
    ) -> StoreResult<ColumnDescriptor> {
        let _guard = self.write_lock.lock().await;

        let stored: Vec<ColumnDescriptor> = self.read_all(COLUMNS).await?;
        if !stored.iter().any(|c| c.id == old_id) {
            return Err(StoreError::NotFound(format!("column '{}'", old_id)));
        }
        if stored
            .iter()
            .any(|c| c.id != old_id && c.same_column(&column))
        {
            return Err(StoreError::DuplicateColumn {
                table: column.table_name,
                column: column.name,
            });
        }

        column.id = allocate_column_id(&column.table_name, &column.name, stored.len(), |candidate| {
            stored.iter().any(|c| c.id == candidate)
        });
        self.write(COLUMNS, &column.id, &column).await?;
        self.delete(COLUMNS, old_id).await?;
        Ok(column)
    }

    async fn remove_column(&self, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.delete(COLUMNS, id).await
    }

    async fn list_columns(&self) -> StoreResult<Vec<ColumnDescriptor>> {
        self.read_all(COLUMNS).await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_everything(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        for collection in COLLECTIONS {
            self.delete_collection(collection).await?;
        }
        tracing::info!(path = ?self.root, "metadata store cleared");
        Ok(())
    }

    async fn update_table_description(&self, id: &str, description: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut table: Table = self
            .read(TABLES, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("table '{}'", id)))?;
        table.description = description.to_string();
        self.write(TABLES, id, &table).await
    }

    async fn update_column_description(&self, id: &str, description: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut column: ColumnDescriptor = self
            .read(COLUMNS, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("column '{}'", id)))?;
        column.description = description.to_string();
        self.write(COLUMNS, id, &column).await
    }

    async fn create_domain(&self, domain: &Domain) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(DOMAINS, &domain.name, domain).await
    }

    async fn list_domains(&self) -> StoreResult<Vec<Domain>> {
        self.read_all(DOMAINS).await
    }

    async fn list_domain_links(&self) -> StoreResult<Vec<DomainTableLink>> {
        self.read_all(DOMAIN_TABLES).await
    }

    #[tracing::instrument(skip(self))]
    async fn link_table_with_domain(
        &self,
        table_id: &str,
        domain_name: &str,
    ) -> StoreResult<DomainTableLink> {
        let _guard = self.write_lock.lock().await;

        if self.read::<Table>(TABLES, table_id).await?.is_none() {
            return Err(StoreError::NotFound(format!("table '{}'", table_id)));
        }
        if self.read::<Domain>(DOMAINS, domain_name).await?.is_none() {
            return Err(StoreError::NotFound(format!("domain '{}'", domain_name)));
        }

        if let Some(link) = resolve_link(self.table_link(table_id).await?, table_id, domain_name)? {
            return Ok(link);
        }

        let link = DomainTableLink::new(table_id, domain_name);
        self.write(DOMAIN_TABLES, &link.id, &link).await?;
        tracing::debug!(table = %table_id, domain = %domain_name, "table linked with domain");
        Ok(link)
    }
}
