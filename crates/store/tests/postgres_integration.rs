//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need a Docker daemon, so
//! they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use common::{OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    NewOrder, NewOrderItem, NewPayment, OrderRepository, PaymentRepository,
    PostgresOrderRepository, PostgresPaymentRepository, StoreError,
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

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Both services' schemas live side by side in the test database
            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresOrderRepository::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/payment/001_create_payments.sql"
            ))
            .execute(&pool)
            .await
            .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_items, orders, payments RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn sample_order(user: i64) -> NewOrder {
    NewOrder {
        user_id: UserId::new(user),
        total_price: 20.0,
        items: vec![
            NewOrderItem {
                product_id: ProductId::new(1),
                product_name: "Widget".into(),
                quantity: 2,
                price: 5.0,
            },
            NewOrderItem {
                product_id: ProductId::new(2),
                product_name: "Gadget".into(),
                quantity: 1,
                price: 10.0,
            },
        ],
    }
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn create_order_persists_items() {
    let repo = PostgresOrderRepository::new(get_test_pool().await);

    let order = repo.create_order(sample_order(7)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.items.len(), 2);

    let loaded = repo.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.user_id, UserId::new(7));
    assert_eq!(loaded.items[0].product_name, "Widget");
    assert_eq!(loaded.items[1].price, 10.0);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn create_order_rolls_back_on_bad_item() {
    let pool = get_test_pool().await;
    let repo = PostgresOrderRepository::new(pool.clone());

    let mut order = sample_order(7);
    // violates the quantity check constraint on the second insert
    order.items[1].quantity = 0;
    let result = repo.create_order(order).await;
    assert!(matches!(result, Err(StoreError::Database(_))));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
    assert_eq!(items, 0);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn list_and_update_orders() {
    let repo = PostgresOrderRepository::new(get_test_pool().await);
    let first = repo.create_order(sample_order(1)).await.unwrap();
    repo.create_order(sample_order(2)).await.unwrap();

    assert_eq!(repo.list_orders().await.unwrap().len(), 2);
    let mine = repo.list_orders_for_user(UserId::new(1)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].items.len(), 2);

    let updated = repo
        .update_status(first.id, OrderStatus::Cancelled)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Cancelled);
    assert!(
        repo.update_status(OrderId::new(9999), OrderStatus::Ready)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn payment_settles() {
    let repo = PostgresPaymentRepository::new(get_test_pool().await);

    let payment = repo
        .create_settled_payment(NewPayment {
            order_id: OrderId::new(3),
            amount: 20.0,
            method: "card".into(),
        })
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.method, "card");

    let loaded = repo.get_payment(payment.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, PaymentStatus::Success);
    assert_eq!(loaded.amount, 20.0);

    assert!(repo.get_payment(PaymentId::new(404)).await.unwrap().is_none());
}
