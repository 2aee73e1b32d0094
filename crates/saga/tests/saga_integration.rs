//! Integration tests for the order and payment sagas.

use auth::Principal;
use chrono::{Duration, Utc};
use common::{OrderId, OrderStatus, PaymentStatus, ProductId, Role, UserId};
use peers::{
    InMemoryCatalogClient, InMemoryOrderClient, OrderSnapshot, OrderSnapshotItem, PeerError,
    Product,
};
use publisher::{InMemoryPublisher, OrderCreatedEvent, PaymentSettledEvent};
use saga::{
    DraftItem, OrderCreationSaga, OrderDraft, PaymentCreationSaga, PaymentDraft, SagaError,
};
use store::{InMemoryOrderRepository, InMemoryPaymentRepository, OrderRepository};

fn principal(role: Role, id: i64) -> Principal {
    Principal {
        subject: format!("{role}-{id}"),
        role,
        user_id: UserId::new(id),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

fn product(id: i64, name: &str, price: f64, seller: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price,
        category: None,
        seller_id: UserId::new(seller),
    }
}

fn item(product_id: i64, quantity: i64) -> DraftItem {
    DraftItem {
        product_id: ProductId::new(product_id),
        quantity,
    }
}

type TestOrderSaga =
    OrderCreationSaga<InMemoryOrderRepository, InMemoryCatalogClient, InMemoryPublisher>;

struct OrderHarness {
    saga: TestOrderSaga,
    orders: InMemoryOrderRepository,
    catalog: InMemoryCatalogClient,
    publisher: InMemoryPublisher,
}

impl OrderHarness {
    async fn new() -> Self {
        let orders = InMemoryOrderRepository::new();
        let catalog = InMemoryCatalogClient::new();
        let publisher = InMemoryPublisher::new();

        catalog.insert(product(1, "Widget", 10.0, 100)).await;
        catalog.insert(product(2, "Gadget", 5.5, 200)).await;
        catalog.insert(product(3, "Gizmo", 9.99, 100)).await;

        let saga = OrderCreationSaga::new(orders.clone(), catalog.clone(), publisher.clone());
        Self {
            saga,
            orders,
            catalog,
            publisher,
        }
    }

    fn draft(user: i64, items: Vec<DraftItem>, total_price: f64) -> OrderDraft {
        OrderDraft {
            user_id: UserId::new(user),
            items,
            total_price,
        }
    }

    async fn assert_nothing_persisted(&self) {
        assert_eq!(self.orders.order_count().await, 0);
        assert_eq!(self.orders.item_count().await, 0);
        assert!(self.publisher.messages().await.is_empty());
    }
}

#[tokio::test]
async fn test_order_happy_path() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(7, vec![item(1, 2), item(2, 1)], 25.5);

    let order = h
        .saga
        .execute(&principal(Role::User, 7), draft)
        .await
        .unwrap();

    assert_eq!(order.user_id, UserId::new(7));
    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.total_price, 25.5);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_name, "Widget");
    assert_eq!(order.items[0].price, 10.0);
    assert_eq!(order.items[1].quantity, 1);

    let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored, order);

    let messages = h.publisher.messages_for("orders_queue").await;
    assert_eq!(messages.len(), 1);
    let event: OrderCreatedEvent = messages[0].decode().unwrap();
    assert_eq!(event.order_id, order.id);
    assert_eq!(event.user_id, UserId::new(7));
    assert_eq!(event.total_price, 25.5);
    assert_eq!(event.status, OrderStatus::Created);
    assert_eq!(event.items.len(), 2);
    assert_eq!(event.items[0].quantity, 2);
    assert_eq!(event.items[0].price, 10.0);
}

#[tokio::test]
async fn test_missing_product_creates_nothing() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(7, vec![item(42, 1)], 10.0);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    match result {
        Err(SagaError::NotFound(msg)) => assert_eq!(msg, "Product 42 not found"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_one_failed_lookup_fails_whole_order() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(7, vec![item(1, 1), item(42, 1), item(2, 1)], 15.5);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    assert!(matches!(result, Err(SagaError::NotFound(_))));
    // lookups are sequential and stop at the first failure
    assert_eq!(h.catalog.call_count(), 2);
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_price_mismatch_is_rejected() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(7, vec![item(3, 1)], 20.00);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    match result {
        Err(SagaError::PriceMismatch { declared, computed }) => {
            assert_eq!(declared, 20.00);
            assert_eq!(computed, 9.99);
        }
        other => panic!("expected PriceMismatch, got {other:?}"),
    }
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_total_within_tolerance_is_accepted() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.00009);

    let order = h
        .saga
        .execute(&principal(Role::User, 7), draft)
        .await
        .unwrap();

    // the server-side total is what gets stored
    assert_eq!(order.total_price, 10.0);
}

#[tokio::test]
async fn test_total_just_outside_tolerance_is_rejected() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.0002);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    assert!(matches!(result, Err(SagaError::PriceMismatch { .. })));
}

#[tokio::test]
async fn test_user_cannot_order_for_someone_else() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(8, vec![item(1, 1)], 10.0);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    assert!(matches!(
        result,
        Err(SagaError::Forbidden("You can only create orders for yourself"))
    ));
    assert_eq!(h.catalog.call_count(), 0);
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_admin_may_order_for_anyone() {
    let h = OrderHarness::new().await;
    let draft = OrderHarness::draft(8, vec![item(1, 1)], 10.0);

    let order = h
        .saga
        .execute(&principal(Role::Admin, 1), draft)
        .await
        .unwrap();

    assert_eq!(order.user_id, UserId::new(8));
}

#[tokio::test]
async fn test_seller_and_service_cannot_order() {
    let h = OrderHarness::new().await;

    for role in [Role::Seller, Role::Service] {
        let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.0);
        let result = h.saga.execute(&principal(role, 7), draft).await;
        assert!(matches!(result, Err(SagaError::Forbidden(_))));
    }
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_catalog_outage_is_service_unavailable() {
    let h = OrderHarness::new().await;
    h.catalog
        .set_failure(Some(PeerError::Unavailable("connect timeout".into())))
        .await;
    let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.0);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    assert!(matches!(
        result,
        Err(SagaError::ServiceUnavailable { peer: "product", .. })
    ));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_malformed_catalog_data_is_upstream_invalid() {
    let h = OrderHarness::new().await;
    h.catalog
        .set_failure(Some(PeerError::InvalidResponse("missing seller_id".into())))
        .await;
    let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.0);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    assert!(matches!(result, Err(SagaError::UpstreamInvalid { .. })));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_store_failure_publishes_nothing() {
    let h = OrderHarness::new().await;
    h.orders.set_fail_writes(true);
    let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.0);

    let result = h.saga.execute(&principal(Role::User, 7), draft).await;

    assert!(matches!(result, Err(SagaError::Persistence(_))));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_publish_failure_keeps_order() {
    let h = OrderHarness::new().await;
    h.publisher.set_fail(true);
    let draft = OrderHarness::draft(7, vec![item(1, 1)], 10.0);

    let order = h
        .saga
        .execute(&principal(Role::User, 7), draft)
        .await
        .unwrap();

    assert!(h.orders.get_order(order.id).await.unwrap().is_some());
    assert!(h.publisher.messages().await.is_empty());
}

#[tokio::test]
async fn test_invalid_drafts_are_rejected_before_lookup() {
    let h = OrderHarness::new().await;
    let user = principal(Role::User, 7);

    let drafts = [
        OrderHarness::draft(7, vec![], 10.0),
        OrderHarness::draft(7, vec![item(1, 0)], 10.0),
        OrderHarness::draft(7, vec![item(1, -2)], 10.0),
        OrderHarness::draft(7, vec![item(1, i64::from(i32::MAX) + 1)], 10.0),
        OrderHarness::draft(7, vec![item(1, 1)], 0.0),
        OrderHarness::draft(7, vec![item(1, 1)], -10.0),
    ];
    for draft in drafts {
        let result = h.saga.execute(&user, draft).await;
        assert!(matches!(result, Err(SagaError::Validation(_))));
    }

    assert_eq!(h.catalog.call_count(), 0);
    h.assert_nothing_persisted().await;
}

type TestPaymentSaga =
    PaymentCreationSaga<InMemoryPaymentRepository, InMemoryOrderClient, InMemoryPublisher>;

struct PaymentHarness {
    saga: TestPaymentSaga,
    payments: InMemoryPaymentRepository,
    orders: InMemoryOrderClient,
    publisher: InMemoryPublisher,
}

impl PaymentHarness {
    fn new() -> Self {
        let payments = InMemoryPaymentRepository::new();
        let orders = InMemoryOrderClient::new();
        let publisher = InMemoryPublisher::new();
        let saga = PaymentCreationSaga::new(payments.clone(), orders.clone(), publisher.clone());
        Self {
            saga,
            payments,
            orders,
            publisher,
        }
    }

    async fn with_order(self, id: i64, owner: i64, total: f64, status: OrderStatus) -> Self {
        self.orders
            .insert(OrderSnapshot {
                order_id: OrderId::new(id),
                user_id: UserId::new(owner),
                total_price: total,
                status,
                items: vec![OrderSnapshotItem {
                    product_id: ProductId::new(1),
                    name: "Widget".into(),
                    quantity: 2,
                    price: total / 2.0,
                }],
            })
            .await;
        self
    }

    fn draft(order: i64, amount: f64) -> PaymentDraft {
        PaymentDraft {
            order_id: OrderId::new(order),
            amount,
            method: "card".into(),
        }
    }

    async fn assert_nothing_persisted(&self) {
        assert_eq!(self.payments.payment_count().await, 0);
        assert!(self.publisher.messages().await.is_empty());
    }
}

#[tokio::test]
async fn test_payment_happy_path() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;

    let payment = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await
        .unwrap();

    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.order_id, OrderId::new(5));
    assert_eq!(payment.amount, 20.0);
    assert_eq!(payment.method, "card");

    let stored = h.payments.all_payments().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, PaymentStatus::Success);

    let messages = h.publisher.messages_for("payments_queue").await;
    assert_eq!(messages.len(), 1);
    let event: PaymentSettledEvent = messages[0].decode().unwrap();
    assert_eq!(event.payment_id, payment.id);
    assert_eq!(event.order_id, OrderId::new(5));
    assert_eq!(event.status, PaymentStatus::Success);
    assert_eq!(event.amount, 20.0);
}

#[tokio::test]
async fn test_cancelled_order_is_not_payable() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Cancelled)
        .await;

    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await;

    assert!(matches!(
        result,
        Err(SagaError::NotPayable {
            status: OrderStatus::Cancelled
        })
    ));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_only_created_and_in_progress_are_payable() {
    let cases = [
        (OrderStatus::Created, true),
        (OrderStatus::InProgress, true),
        (OrderStatus::Ready, false),
        (OrderStatus::Delivered, false),
    ];

    for (status, payable) in cases {
        let h = PaymentHarness::new().with_order(5, 7, 20.0, status).await;
        let result = h
            .saga
            .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
            .await;
        assert_eq!(result.is_ok(), payable, "status {status}");
    }
}

#[tokio::test]
async fn test_amount_mismatch_is_rejected() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;

    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 19.99))
        .await;

    assert!(matches!(result, Err(SagaError::AmountMismatch { .. })));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_user_cannot_pay_for_others() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;

    let result = h
        .saga
        .execute(&principal(Role::User, 8), PaymentHarness::draft(5, 20.0))
        .await;

    assert!(matches!(
        result,
        Err(SagaError::Forbidden(
            "You cannot pay for orders not belonging to you"
        ))
    ));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_admin_may_pay_for_anyone() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::InProgress)
        .await;

    let payment = h
        .saga
        .execute(&principal(Role::Admin, 1), PaymentHarness::draft(5, 20.0))
        .await
        .unwrap();

    assert_eq!(payment.status, PaymentStatus::Success);
}

#[tokio::test]
async fn test_seller_cannot_pay_and_order_is_not_fetched() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;

    let result = h
        .saga
        .execute(&principal(Role::Seller, 7), PaymentHarness::draft(5, 20.0))
        .await;

    assert!(matches!(result, Err(SagaError::Forbidden(_))));
    assert_eq!(h.orders.call_count(), 0);
}

#[tokio::test]
async fn test_order_lookup_failures() {
    let h = PaymentHarness::new();

    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await;
    assert!(matches!(result, Err(SagaError::NotFound(ref m)) if m == "Order not found"));

    h.orders
        .set_failure(Some(PeerError::Unavailable("timeout".into())))
        .await;
    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await;
    assert!(matches!(
        result,
        Err(SagaError::ServiceUnavailable { peer: "order", .. })
    ));

    h.orders
        .set_failure(Some(PeerError::BadRequest { status: 401 }))
        .await;
    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await;
    assert!(matches!(result, Err(SagaError::PeerRejected { .. })));

    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_payment_store_failure_publishes_nothing() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;
    h.payments.set_fail_writes(true);

    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await;

    assert!(matches!(result, Err(SagaError::Persistence(_))));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_payment_failed_settle_leaves_nothing_behind() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;
    h.payments.set_fail_settle(true);

    let result = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await;

    assert!(matches!(result, Err(SagaError::Persistence(_))));
    h.assert_nothing_persisted().await;
}

#[tokio::test]
async fn test_payment_publish_failure_is_swallowed() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;
    h.publisher.set_fail(true);

    let payment = h
        .saga
        .execute(&principal(Role::User, 7), PaymentHarness::draft(5, 20.0))
        .await
        .unwrap();

    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(h.payments.payment_count().await, 1);
}

#[tokio::test]
async fn test_invalid_payment_drafts() {
    let h = PaymentHarness::new()
        .with_order(5, 7, 20.0, OrderStatus::Created)
        .await;
    let user = principal(Role::User, 7);

    let mut blank_method = PaymentHarness::draft(5, 20.0);
    blank_method.method = "  ".into();

    for draft in [PaymentHarness::draft(5, 0.0), blank_method] {
        let result = h.saga.execute(&user, draft).await;
        assert!(matches!(result, Err(SagaError::Validation(_))));
    }
    assert_eq!(h.orders.call_count(), 0);
}
