//! Integration event payloads and the queues they go to.

use common::{OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// Queue that receives order events.
pub const ORDERS_QUEUE: &str = "orders_queue";

/// Queue that receives payment events.
pub const PAYMENTS_QUEUE: &str = "payments_queue";

/// A payload with a fixed destination queue.
pub trait IntegrationEvent: Serialize {
    /// Queue the event is published to.
    const TOPIC: &'static str;
}

/// One line of an [`OrderCreatedEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: f64,
}

/// Emitted once an order and its items have been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub total_price: f64,
    pub status: OrderStatus,
    pub items: Vec<OrderCreatedItem>,
}

impl IntegrationEvent for OrderCreatedEvent {
    const TOPIC: &'static str = ORDERS_QUEUE;
}

/// Emitted once a payment has been settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub status: PaymentStatus,
    pub amount: f64,
}

impl IntegrationEvent for PaymentSettledEvent {
    const TOPIC: &'static str = PAYMENTS_QUEUE;
}
