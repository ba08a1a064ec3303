//! End-to-end bootstrap and sync against a real server

use std::sync::Arc;

use anyhow::Result;
use pretty_assertions::assert_eq;
use rstest::rstest;
use schemadoc_core::ConnectionIdentity;
use schemadoc_store::{JsonFileStore, MetadataStore};
use schemadoc_sync::{
    BootstrapOutcome, NewColumn, SchemaIntrospector, SyncEngine, SyncOptions,
};

use crate::fixtures::{ShopDatabase, TestDriver};

async fn engine(db: &ShopDatabase, dir: &tempfile::TempDir) -> Result<SyncEngine> {
    let introspector = Arc::new(SchemaIntrospector::new(db.connection.clone(), db.schema())?);
    let store = Arc::new(JsonFileStore::open(dir.path()).await?);
    Ok(SyncEngine::new(
        introspector,
        store,
        SyncOptions {
            preserve_descriptions: true,
        },
    ))
}

#[rstest]
#[case::postgres(TestDriver::Postgres)]
#[case::mysql(TestDriver::Mysql)]
#[tokio::test]
#[ignore = "requires docker"]
async fn test_bootstrap_populates_shop(#[case] driver: TestDriver) -> Result<()> {
    let db = ShopDatabase::start(driver).await?;
    let dir = tempfile::tempdir()?;
    let engine = engine(&db, &dir).await?;
    let identity = ConnectionIdentity::from(&db.config);

    match engine.bootstrap(&identity, false).await? {
        BootstrapOutcome::Populated(report) => {
            assert_eq!(report.tables_added, 3);
            assert_eq!(report.columns_added, 7);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        engine.bootstrap(&identity, false).await?,
        BootstrapOutcome::Unchanged
    );

    let product_name = engine
        .store()
        .list_columns()
        .await?
        .into_iter()
        .find(|c| c.table_name == "product" && c.name == "name")
        .expect("product.name is stored");
    assert!(product_name.is_unique);
    assert_eq!(product_name.length, 200);

    assert!(engine.check_changes().await?.is_empty());
    Ok(())
}

#[rstest]
#[case::postgres(
    TestDriver::Postgres,
    "ALTER TABLE product ALTER COLUMN name TYPE VARCHAR(300)"
)]
#[case::mysql(
    TestDriver::Mysql,
    "ALTER TABLE product MODIFY name VARCHAR(300) NOT NULL"
)]
#[tokio::test]
#[ignore = "requires docker"]
async fn test_sync_follows_live_changes(
    #[case] driver: TestDriver,
    #[case] widen_name: &str,
) -> Result<()> {
    let db = ShopDatabase::start(driver).await?;
    let dir = tempfile::tempdir()?;
    let engine = engine(&db, &dir).await?;
    engine
        .bootstrap(&ConnectionIdentity::from(&db.config), false)
        .await?;

    let stored_name = engine
        .store()
        .list_columns()
        .await?
        .into_iter()
        .find(|c| c.table_name == "product" && c.name == "name")
        .expect("product.name is stored");
    engine
        .store()
        .update_column_description(&stored_name.id, "Display name")
        .await?;

    db.execute(widen_name).await?;
    db.execute("ALTER TABLE product ADD COLUMN price INTEGER").await?;
    db.execute("CREATE TABLE supplier (id INTEGER PRIMARY KEY)").await?;

    let diff = engine.check_changes().await?;
    assert_eq!(diff.new_tables, vec!["supplier"]);
    assert_eq!(
        diff.new_columns,
        vec![NewColumn {
            table_name: "product".into(),
            name: "price".into(),
        }]
    );
    assert_eq!(diff.column_changes.len(), 1);
    assert_eq!(diff.column_changes[0].message, "length changed from 200 to 300");

    let outcome = engine.apply_sync().await?;
    assert_eq!(outcome.report.tables_added, 1);
    assert_eq!(outcome.report.columns_replaced, 1);

    let replaced = engine
        .store()
        .list_columns()
        .await?
        .into_iter()
        .find(|c| c.table_name == "product" && c.name == "name")
        .expect("product.name is stored");
    assert_eq!(replaced.length, 300);
    assert_eq!(replaced.description, "Display name");

    assert!(engine.check_changes().await?.is_empty());
    Ok(())
}
