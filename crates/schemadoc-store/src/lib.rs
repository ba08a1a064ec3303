//! Metadata stores for the schemadoc data dictionary.
//!
//! A store persists the connection identity the dictionary was captured
//! from, the documented tables and columns with their descriptions, and the
//! table domains. Two backends exist:
//!
//! - [`JsonFileStore`]: one JSON file per record under a data directory
//! - `MongoStore`: one document per record (feature `mongodb`)
//!
//! The sync engine only talks to the [`MetadataStore`] trait.

mod error;
mod json;
#[cfg(feature = "mongodb")]
mod mongo;

pub use error::*;
pub use json::JsonFileStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

use async_trait::async_trait;
use schemadoc_core::{ColumnDescriptor, ConnectionIdentity, Domain, DomainTableLink, Table};

/// Key-addressable persistence for the data dictionary
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Short backend name used in logs
    fn backend(&self) -> &'static str;

    /// The recorded connection identity, if the store was ever populated
    async fn get_identity(&self) -> StoreResult<Option<ConnectionIdentity>>;

    /// Record the connection identity, replacing any previous one
    async fn put_identity(&self, identity: &ConnectionIdentity) -> StoreResult<()>;

    async fn add_table(&self, table: &Table) -> StoreResult<()>;

    async fn get_table(&self, id: &str) -> StoreResult<Option<Table>>;

    /// Remove a table together with every column whose owning table is `id`
    async fn remove_table(&self, id: &str) -> StoreResult<()>;

    async fn list_tables(&self) -> StoreResult<Vec<Table>>;

    /// Insert a column, allocating its identifier.
    ///
    /// Any identifier on the input is ignored. Fails with
    /// [`StoreError::DuplicateColumn`] if the (table, column) pair is
    /// already stored.
    async fn add_column(&self, column: ColumnDescriptor) -> StoreResult<ColumnDescriptor>;

    async fn get_column(&self, id: &str) -> StoreResult<Option<ColumnDescriptor>>;

    /// Replace the column stored under `old_id` with `column`.
    ///
    /// The new identifier is allocated while the old record is still
    /// stored, so it always differs from `old_id`. Fails with
    /// [`StoreError::NotFound`] if `old_id` is unknown.
    async fn replace_column(
        &self,
        old_id: &str,
        column: ColumnDescriptor,
    ) -> StoreResult<ColumnDescriptor>;

    async fn remove_column(&self, id: &str) -> StoreResult<()>;

    async fn list_columns(&self) -> StoreResult<Vec<ColumnDescriptor>>;

    /// Drop identity, tables, columns, domains and links
    async fn remove_everything(&self) -> StoreResult<()>;

    async fn update_table_description(&self, id: &str, description: &str) -> StoreResult<()>;

    async fn update_column_description(&self, id: &str, description: &str) -> StoreResult<()>;

    /// Create a domain, overwriting one with the same name
    async fn create_domain(&self, domain: &Domain) -> StoreResult<()>;

    async fn list_domains(&self) -> StoreResult<Vec<Domain>>;

    async fn list_domain_links(&self) -> StoreResult<Vec<DomainTableLink>>;

    /// Link a table with a domain.
    ///
    /// Relinking with the same domain returns the existing link. A table
    /// already linked with another domain yields
    /// [`StoreError::TableLinkedWithDomain`].
    async fn link_table_with_domain(
        &self,
        table_id: &str,
        domain_name: &str,
    ) -> StoreResult<DomainTableLink>;
}

/// Allocate a column identifier of the form `{table}_{column}_{n}`.
///
/// `n` starts one past the number of stored columns and is advanced until
/// `taken` reports the candidate as free.
pub fn allocate_column_id(
    table: &str,
    column: &str,
    stored_columns: usize,
    taken: impl Fn(&str) -> bool,
) -> String {
    let mut counter = stored_columns + 1;
    loop {
        let candidate = format!("{}_{}_{}", table, column, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Decide the outcome of a link request against the table's current link
pub(crate) fn resolve_link(
    existing: Option<DomainTableLink>,
    table_id: &str,
    domain_name: &str,
) -> StoreResult<Option<DomainTableLink>> {
    match existing {
        Some(link) if link.domain_name == domain_name => Ok(Some(link)),
        Some(link) => Err(StoreError::TableLinkedWithDomain {
            table_id: table_id.to_string(),
            domain_name: link.domain_name,
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocate_column_id_skips_taken() {
        let taken: HashSet<&str> = ["product_sku_4", "product_sku_5"].into_iter().collect();
        let id = allocate_column_id("product", "sku", 3, |candidate| taken.contains(candidate));
        assert_eq!(id, "product_sku_6");
    }

    #[test]
    fn test_allocate_column_id_first_column() {
        assert_eq!(allocate_column_id("unit", "id", 0, |_| false), "unit_id_1");
    }

    #[test]
    fn test_resolve_link_rules() {
        let link = DomainTableLink::new("product", "catalog");

        let same = resolve_link(Some(link.clone()), "product", "catalog").unwrap();
        assert_eq!(same, Some(link.clone()));

        assert!(resolve_link(None, "product", "catalog").unwrap().is_none());

        match resolve_link(Some(link), "product", "sales") {
            Err(StoreError::TableLinkedWithDomain { domain_name, .. }) => {
                assert_eq!(domain_name, "catalog")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
