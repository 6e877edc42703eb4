//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p inventory-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{Money, OrderId, ProductId, UserId};
use inventory_store::{
    InventoryStore, OrderRecord, OrderStatus, PostgresInventoryStore, ProductRow, StoreError,
    StoreTx,
};
use serial_test::serial;
use sqlx::{PgPool, Row};
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
                "../../../migrations/001_create_catalog_tables.sql"
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
async fn get_test_store() -> PostgresInventoryStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresInventoryStore::new(pool)
}

fn test_order(product_id: &ProductId, quantity: u32, unit_price: Money) -> OrderRecord {
    OrderRecord {
        id: OrderId::new(),
        user_id: UserId::new("user-1"),
        product_id: product_id.clone(),
        quantity,
        total_price: unit_price.multiply(quantity),
        status: OrderStatus::Created,
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[serial]
async fn upsert_and_get_product() {
    let store = get_test_store().await;
    let product_id = ProductId::new("SKU-001");

    store
        .upsert_product(&ProductRow::new(
            product_id.clone(),
            5,
            Money::from_cents(1000),
        ))
        .await
        .unwrap();

    let row = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 5);
    assert_eq!(row.unit_price.cents(), 1000);

    store
        .upsert_product(&ProductRow::new(
            product_id.clone(),
            9,
            Money::from_cents(1500),
        ))
        .await
        .unwrap();

    let row = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 9);
    assert_eq!(row.unit_price.cents(), 1500);
}

#[tokio::test]
#[serial]
async fn full_placement_sequence_commits_atomically() {
    let store = get_test_store().await;
    let product_id = ProductId::new("SKU-001");
    let price = Money::from_cents(1000);

    store
        .upsert_product(&ProductRow::new(product_id.clone(), 5, price))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let row = tx.lock_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 5);

    let order = test_order(&product_id, 3, price);
    tx.insert_order(&order).await.unwrap();

    let affected = tx.decrement_stock(&product_id, 3).await.unwrap();
    assert_eq!(affected, 1);
    tx.commit().await.unwrap();

    let row = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 2);

    let stored = sqlx::query("SELECT user_id, quantity, total_price_cents, status FROM orders")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(stored.get::<String, _>("user_id"), "user-1");
    assert_eq!(stored.get::<i64, _>("quantity"), 3);
    assert_eq!(stored.get::<i64, _>("total_price_cents"), 3000);
    assert_eq!(stored.get::<String, _>("status"), "created");
}

#[tokio::test]
#[serial]
async fn conditional_decrement_rejects_oversell() {
    let store = get_test_store().await;
    let product_id = ProductId::new("SKU-001");

    store
        .upsert_product(&ProductRow::new(
            product_id.clone(),
            2,
            Money::from_cents(1000),
        ))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.lock_product(&product_id).await.unwrap();
    let affected = tx.decrement_stock(&product_id, 5).await.unwrap();
    assert_eq!(affected, 0);
    tx.rollback().await.unwrap();

    let row = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 2);
}

#[tokio::test]
#[serial]
async fn drop_without_commit_rolls_back() {
    let store = get_test_store().await;
    let product_id = ProductId::new("SKU-001");
    let price = Money::from_cents(1000);

    store
        .upsert_product(&ProductRow::new(product_id.clone(), 5, price))
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.lock_product(&product_id).await.unwrap();
        tx.insert_order(&test_order(&product_id, 3, price))
            .await
            .unwrap();
        tx.decrement_stock(&product_id, 3).await.unwrap();
        // Dropped here without commit.
    }

    let row = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 5);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[serial]
async fn lock_product_missing_returns_none() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let row = tx.lock_product(&ProductId::new("SKU-404")).await.unwrap();
    assert!(row.is_none());
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[serial]
async fn row_lock_serializes_writers() {
    let store = get_test_store().await;
    let product_id = ProductId::new("SKU-001");

    store
        .upsert_product(&ProductRow::new(
            product_id.clone(),
            5,
            Money::from_cents(1000),
        ))
        .await
        .unwrap();

    let mut first = store.begin().await.unwrap();
    let row = first.lock_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 5);

    // The second writer blocks on the row lock and must observe the
    // first writer's decrement once it gets through.
    let store2 = store.clone();
    let pid = product_id.clone();
    let second = tokio::spawn(async move {
        let mut tx = store2.begin().await.unwrap();
        let row = tx.lock_product(&pid).await.unwrap().unwrap();
        if row.stock >= 3 {
            assert_eq!(tx.decrement_stock(&pid, 3).await.unwrap(), 1);
            tx.commit().await.unwrap();
            (row.stock, true)
        } else {
            tx.rollback().await.unwrap();
            (row.stock, false)
        }
    });

    // Give the second writer time to start waiting on the lock.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(first.decrement_stock(&product_id, 3).await.unwrap(), 1);
    first.commit().await.unwrap();

    let (observed_stock, won) = second.await.unwrap();
    assert_eq!(observed_stock, 2);
    assert!(!won);

    let row = store.get_product(&product_id).await.unwrap().unwrap();
    assert_eq!(row.stock, 2);
}

#[tokio::test]
#[serial]
async fn lock_wait_is_bounded() {
    let store = get_test_store().await;
    let product_id = ProductId::new("SKU-001");

    store
        .upsert_product(&ProductRow::new(
            product_id.clone(),
            5,
            Money::from_cents(1000),
        ))
        .await
        .unwrap();

    let mut holder = store.begin().await.unwrap();
    holder.lock_product(&product_id).await.unwrap();

    let impatient = store.clone().with_lock_timeout(Duration::from_millis(100));
    let mut waiter = impatient.begin().await.unwrap();
    let err = waiter.lock_product(&product_id).await.unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout { .. }));

    holder.rollback().await.unwrap();
}
