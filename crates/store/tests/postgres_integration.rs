//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use sqlx::PgPool;
use store::{
    Money, NewOrder, NewProduct, OrderStatus, PostgresStore, ProductId, Store, StoreError, UserId,
};
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

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
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
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_products, orders, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn cod_order(user: i64, total_cents: i64) -> NewOrder {
    NewOrder {
        user_id: UserId::new(user),
        order_number: "ORD-12300001".to_string(),
        status: OrderStatus::CashOnDelivery,
        total_price: Money::from_cents(total_cents),
    }
}

#[tokio::test]
async fn insert_and_lock_products() {
    let store = get_test_store().await;
    let a = store
        .insert_product(NewProduct::new("Widget", Money::from_cents(5025), 10))
        .await
        .unwrap();
    let b = store
        .insert_product(NewProduct::new("Gadget", Money::from_cents(1000), 3).with_description("blue"))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let locked = tx
        .lock_products(&[b.id, ProductId::new(999), a.id])
        .await
        .unwrap();
    assert_eq!(locked.len(), 2);
    assert_eq!(locked[0].id, a.id);
    assert_eq!(locked[1].id, b.id);
    assert_eq!(locked[1].description.as_deref(), Some("blue"));
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn order_with_lines_commits_atomically() {
    let store = get_test_store().await;
    let product = store
        .insert_product(NewProduct::new("Widget", Money::from_cents(5025), 10))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.decrement_product_quantity(product.id, 2).await.unwrap(), 8);
    let order = tx.insert_order(cod_order(1, 10050)).await.unwrap();
    tx.insert_order_line(order.id, product.id, 2).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::CashOnDelivery);
    assert_eq!(stored.total_price, Money::from_cents(10050));
    assert_eq!(stored.lines.len(), 1);
    assert_eq!(stored.lines[0].product_name, "Widget");
    assert_eq!(stored.lines[0].quantity, 2);

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 8);
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let product = store
        .insert_product(NewProduct::new("Widget", Money::from_cents(5025), 10))
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.decrement_product_quantity(product.id, 4).await.unwrap();
        tx.insert_order(cod_order(1, 100)).await.unwrap();
    }

    assert!(store.list_orders().await.unwrap().is_empty());
    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 10);
}

#[tokio::test]
async fn decrement_never_goes_negative() {
    let store = get_test_store().await;
    let product = store
        .insert_product(NewProduct::new("Widget", Money::from_cents(100), 1))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .decrement_product_quantity(product.id, 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::StockConflict {
            requested: 2,
            available: 1,
            ..
        }
    ));

    let err = tx
        .decrement_product_quantity(ProductId::new(404), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ProductNotFound(_)));
}

#[tokio::test]
async fn concurrent_decrements_never_oversell() {
    let store = get_test_store().await;
    let product = store
        .insert_product(NewProduct::new("Widget", Money::from_cents(100), 5))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            let locked = tx.lock_products(&[product.id]).await.unwrap();
            if locked[0].quantity < 1 {
                return false;
            }
            tx.decrement_product_quantity(product.id, 1).await.unwrap();
            tx.commit().await.unwrap();
            true
        }));
    }

    let mut reserved = 0;
    for handle in handles {
        if handle.await.unwrap() {
            reserved += 1;
        }
    }

    assert_eq!(reserved, 5);
    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.quantity, 0);
}

#[tokio::test]
async fn latest_order_reference_and_user_queries() {
    let store = get_test_store().await;

    let mut tx = store.begin().await.unwrap();
    let first = tx.insert_order(cod_order(1, 100)).await.unwrap();
    let second = tx.insert_order(cod_order(2, 200)).await.unwrap();
    tx.commit().await.unwrap();

    let latest = store.find_latest_order().await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);

    store.set_payment_reference(first.id, "PM-1").await.unwrap();
    let by_reference = store
        .find_order_by_payment_reference("PM-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_reference.id, first.id);

    let mine = store.list_orders_for_user(UserId::new(2)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, second.id);
}

#[tokio::test]
async fn mark_paid_and_delete_order() {
    let store = get_test_store().await;
    let product = store
        .insert_product(NewProduct::new("Widget", Money::from_cents(100), 5))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let paid = tx.insert_order(cod_order(1, 100)).await.unwrap();
    let doomed = tx.insert_order(cod_order(1, 100)).await.unwrap();
    tx.insert_order_line(doomed.id, product.id, 1).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.mark_order_paid(paid.id, chrono::Utc::now()).await.unwrap();
    tx.delete_order(doomed.id).await.unwrap();
    tx.commit().await.unwrap();

    assert!(store.get_order(paid.id).await.unwrap().unwrap().is_paid());
    assert!(store.get_order(doomed.id).await.unwrap().is_none());

    let mut tx = store.begin().await.unwrap();
    let err = tx.delete_order(doomed.id).await.unwrap_err();
    assert!(matches!(err, StoreError::OrderNotFound(_)));
}
