// RDO Storage Integration Test
//
// Run with: DATABASE_URL=postgresql://... cargo test -- --ignored

use rdo_loader::rdo::{
    load_terms, Dataset, DiseaseTerm, OntologyStore, Provenance, RdoStorage, Xref,
};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::env;

/// Test helper to get database connection
async fn get_test_storage() -> RdoStorage {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    let storage = RdoStorage::from_pool(db);
    storage.run_migrations().await.expect("Failed to run migrations");
    storage
}

async fn cleanup(db: &PgPool, doids: &[&str]) {
    for doid in doids {
        sqlx::query("DELETE FROM rdo WHERE doid = $1")
            .bind(doid)
            .execute(db)
            .await
            .unwrap();
    }
}

fn test_dataset() -> Dataset {
    Dataset::for_file(
        "RGD Disease Ontology",
        "ftp://ftp.rgd.mcw.edu/pub/ontology/disease/RDO.obo",
        "test",
        "rdo-loader",
        "1.0.0",
    )
}

#[tokio::test]
#[ignore] // Requires database
async fn test_insert_term_with_xrefs() {
    let storage = get_test_storage().await;
    cleanup(storage.db(), &["DOID:9900001"]).await;

    let term = DiseaseTerm::new("DOID:9900001", "test angiosarcoma")
        .with_definition("A vascular cancer.")
        .with_xref(Xref::new("SNOMEDCT", "33176006"))
        .with_xref(Xref::new("NCI", "C3088"))
        // Repeated xrefs are ignored by the insert
        .with_xref(Xref::new("NCI", "C3088"));

    storage.insert_term(&term).await.unwrap();

    let (name, def): (String, Option<String>) =
        sqlx::query_as("SELECT name, def FROM rdo WHERE doid = $1")
            .bind(&term.doid)
            .fetch_one(storage.db())
            .await
            .unwrap();
    assert_eq!(name, "test angiosarcoma");
    assert_eq!(def.as_deref(), Some("A vascular cancer."));

    let xref_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rdo_xref WHERE doid = $1")
        .bind(&term.doid)
        .fetch_one(storage.db())
        .await
        .unwrap();
    assert_eq!(xref_count, 2);

    // A second insert of the same DOID violates the primary key
    assert!(storage.insert_term(&term).await.is_err());

    cleanup(storage.db(), &["DOID:9900001"]).await;
}

#[tokio::test]
#[ignore] // Requires database
async fn test_dataset_and_provenance() {
    let storage = get_test_storage().await;

    let dataset_id = storage.insert_dataset(&test_dataset()).await.unwrap();
    assert!(dataset_id > 0);

    storage
        .insert_provenance(&Provenance::new(dataset_id, "rdo"))
        .await
        .unwrap();

    let source: String = sqlx::query_scalar("SELECT source FROM dataset WHERE id = $1")
        .bind(dataset_id)
        .fetch_one(storage.db())
        .await
        .unwrap();
    assert_eq!(
        source,
        "File ftp://ftp.rgd.mcw.edu/pub/ontology/disease/RDO.obo, version test"
    );

    sqlx::query("DELETE FROM dataset WHERE id = $1")
        .bind(dataset_id)
        .execute(storage.db())
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Requires database
async fn test_load_terms_against_postgres() {
    let storage = get_test_storage().await;
    let doids = ["DOID:9900002", "DOID:9900003"];
    cleanup(storage.db(), &doids).await;

    // Pre-existing row makes the second term fail
    storage
        .insert_term(&DiseaseTerm::new("DOID:9900003", "already loaded"))
        .await
        .unwrap();

    let terms: BTreeMap<String, DiseaseTerm> = [
        DiseaseTerm::new("DOID:9900002", "first").with_xref(Xref::new("MESH", "D000001")),
        DiseaseTerm::new("DOID:9900003", "second"),
    ]
    .into_iter()
    .map(|t| (t.doid.clone(), t))
    .collect();

    let (dataset_id, summary) = load_terms(&storage, &terms, &test_dataset()).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].doid, "DOID:9900003");

    let provenance_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM provenance WHERE dataset_id = $1")
            .bind(dataset_id)
            .fetch_one(storage.db())
            .await
            .unwrap();
    assert_eq!(provenance_count, 2);

    cleanup(storage.db(), &doids).await;
    sqlx::query("DELETE FROM dataset WHERE id = $1")
        .bind(dataset_id)
        .execute(storage.db())
        .await
        .unwrap();
}
