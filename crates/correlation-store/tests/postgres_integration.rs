//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p correlation-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::CorrelationId;
use correlation_store::{
    CorrelationStore, CorrelationStoreExt, HeaderRecord, PostgresCorrelationStore, StateRecord,
    StoreError, TransactionOps, TransactionScope, TransactionScopeExt,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_saga_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresCorrelationStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE saga_state, saga_headers")
        .execute(&pool)
        .await
        .unwrap();

    PostgresCorrelationStore::new(pool)
}

#[tokio::test]
#[serial]
async fn insert_and_read_state_record() {
    let store = get_test_store().await;
    let id = CorrelationId::new();
    let record = StateRecord::new(id, r#"{"step":"start"}"#);

    let mut tx = store.begin().await.unwrap();
    tx.insert_state(&record).await.unwrap();
    tx.commit().await.unwrap();

    let found = store.state_record(id).await.unwrap();
    assert_eq!(found, Some(record));
}

#[tokio::test]
#[serial]
async fn update_probe_distinguishes_absent_from_present() {
    let store = get_test_store().await;
    let id = CorrelationId::new();

    let mut tx = store.begin().await.unwrap();
    let updated = tx.update_state(&StateRecord::new(id, "first")).await.unwrap();
    assert_eq!(updated, 0);
    tx.insert_state(&StateRecord::new(id, "first")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let updated = tx
        .update_state(&StateRecord::new(id, "second"))
        .await
        .unwrap();
    assert_eq!(updated, 1);
    tx.commit().await.unwrap();

    let found = store.state_record(id).await.unwrap().unwrap();
    assert_eq!(found.blob, "second");
}

#[tokio::test]
#[serial]
async fn duplicate_state_insert_maps_to_typed_error() {
    let store = get_test_store().await;
    let id = CorrelationId::new();

    let mut tx = store.begin().await.unwrap();
    tx.insert_state(&StateRecord::new(id, "a")).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let result = tx.insert_state(&StateRecord::new(id, "b")).await;
    assert!(matches!(
        result,
        Err(StoreError::DuplicateCorrelation(found)) if found == id
    ));
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[serial]
async fn headers_read_back_in_insertion_order() {
    let store = get_test_store().await;
    let id = CorrelationId::new();

    let mut tx = store.begin().await.unwrap();
    tx.insert_header(&HeaderRecord::new(id, "k", "1"))
        .await
        .unwrap();
    tx.insert_header(&HeaderRecord::new(id, "k", "2"))
        .await
        .unwrap();
    tx.insert_header(&HeaderRecord::new(id, "stage", "init"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let headers = store.header_records(id).await.unwrap();
    assert_eq!(headers.len(), 3);
    assert_eq!(headers[0].value, "1");
    assert_eq!(headers[1].value, "2");
    assert_eq!(headers[2].key, "stage");

    let folded = HeaderRecord::fold(headers);
    assert_eq!(folded.get("k").map(String::as_str), Some("2"));
}

#[tokio::test]
#[serial]
async fn delete_headers_removes_only_the_given_correlation_id() {
    let store = get_test_store().await;
    let id = CorrelationId::new();
    let other = CorrelationId::new();

    let mut tx = store.begin().await.unwrap();
    tx.insert_header(&HeaderRecord::new(id, "a", "1"))
        .await
        .unwrap();
    tx.insert_header(&HeaderRecord::new(id, "b", "2"))
        .await
        .unwrap();
    tx.insert_header(&HeaderRecord::new(other, "c", "3"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let deleted = tx.delete_headers(id).await.unwrap();
    assert_eq!(deleted, 2);
    tx.commit().await.unwrap();

    assert!(store.header_records(id).await.unwrap().is_empty());
    assert_eq!(store.header_records(other).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn delete_header_record_matches_exactly() {
    let store = get_test_store().await;
    let id = CorrelationId::new();
    let keep = HeaderRecord::new(id, "k", "1");
    let gone = HeaderRecord::new(id, "k", "2");

    let mut tx = store.begin().await.unwrap();
    tx.insert_header(&keep).await.unwrap();
    tx.insert_header(&gone).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let deleted = TransactionOps::<HeaderRecord>::delete(&mut tx, &gone)
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    tx.commit().await.unwrap();

    let headers = store.header_records(id).await.unwrap();
    assert_eq!(headers, vec![keep]);
}

#[tokio::test]
#[serial]
async fn rollback_discards_all_changes() {
    let store = get_test_store().await;
    let id = CorrelationId::new();

    let mut tx = store.begin().await.unwrap();
    tx.insert_state(&StateRecord::new(id, "{}")).await.unwrap();
    tx.insert_header(&HeaderRecord::new(id, "a", "1"))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(store.state_record(id).await.unwrap().is_none());
    assert!(store.header_records(id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn dropped_scope_rolls_back() {
    let store = get_test_store().await;
    let id = CorrelationId::new();

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_state(&StateRecord::new(id, "{}")).await.unwrap();
    }

    assert!(store.state_record(id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn deleting_missing_records_is_noop() {
    let store = get_test_store().await;
    let id = CorrelationId::new();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.delete_state(id).await.unwrap(), 0);
    assert_eq!(tx.delete_headers(id).await.unwrap(), 0);
    tx.commit().await.unwrap();
}
