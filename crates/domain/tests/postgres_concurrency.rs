//! Order assembly against PostgreSQL under concurrent placement.
//!
//! These tests share one PostgreSQL container and truncate the tables per test.
//! Run with:
//!
//! ```bash
//! cargo test -p domain --test postgres_concurrency -- --test-threads=1
//! ```

use std::sync::Arc;

use domain::{
    DomainError, Money, OrderAssembler, OrderError, OrderLineRequest, OrderRequest, OrderService,
    OrderStatus, ProductId, generate_order_number,
};
use sqlx::postgres::PgPoolOptions;
use store::{NewProduct, PostgresStore, Store};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            Arc::new(ContainerInfo {
                container,
                connection_string: format!(
                    "postgres://postgres:postgres@{}:{}/postgres",
                    host, port
                ),
            })
        })
        .await
        .clone()
}

/// Migrated store with cleared tables and the given products.
async fn seeded_store(products: &[(&str, i64, u32)]) -> PostgresStore {
    let info = get_container_info().await;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();
    let store = PostgresStore::new(pool.clone());
    store.run_migrations().await.unwrap();

    sqlx::query("TRUNCATE TABLE order_products, orders, products RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    for &(name, price_cents, quantity) in products {
        store
            .insert_product(NewProduct::new(name, Money::from_cents(price_cents), quantity))
            .await
            .unwrap();
    }
    store
}

fn request(user: i64, lines: &[(i64, u32)]) -> OrderRequest {
    OrderRequest::new(
        user,
        lines
            .iter()
            .map(|&(id, qty)| OrderLineRequest::new(id, qty)),
    )
    .unwrap()
}

async fn quantity(store: &PostgresStore, id: i64) -> u32 {
    store
        .get_product(ProductId::new(id))
        .await
        .unwrap()
        .unwrap()
        .quantity
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_never_oversell() {
    let store = seeded_store(&[("Widget", 100, 7)]).await;

    let mut handles = Vec::new();
    for user in 0..20 {
        let assembler = OrderAssembler::new(store.clone());
        handles.push(tokio::spawn(async move {
            assembler
                .create_order(
                    OrderStatus::CashOnDelivery,
                    &request(user, &[(1, 1)]),
                    generate_order_number(),
                )
                .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(DomainError::Order(OrderError::InsufficientStock { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(placed, 7);
    assert_eq!(quantity(&store, 1).await, 0);
    let orders = OrderService::new(store.clone()).list_orders().await.unwrap();
    assert_eq!(orders.len(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossed_lines_assemble_and_discard_without_deadlock() {
    let store = seeded_store(&[("Widget", 100, 50), ("Gadget", 250, 50)]).await;

    let mut handles = Vec::new();
    for user in 0..20 {
        let assembler = OrderAssembler::new(store.clone());
        let lines = if user % 2 == 0 {
            [(1, 1), (2, 1)]
        } else {
            [(2, 1), (1, 1)]
        };
        handles.push(tokio::spawn(async move {
            let order = assembler
                .create_order(
                    OrderStatus::OnlinePayment,
                    &request(user, &lines),
                    generate_order_number(),
                )
                .await?;
            assembler.discard_order(order.id).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(quantity(&store, 1).await, 50);
    assert_eq!(quantity(&store, 2).await, 50);
    let orders = OrderService::new(store.clone()).list_orders().await.unwrap();
    assert!(orders.is_empty());
}
