//! Records persisted by the order and payment services.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A line to insert with a new order.
///
/// `product_name` and `price` are the catalog's values at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
}

/// An order ready to be written. Its status is always `created`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub total_price: f64,
    pub items: Vec<NewOrderItem>,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
}

/// A persisted order with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Returns the distinct products on this order, in line order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id);
            }
        }
        ids
    }
}

/// A payment to insert. It always starts as `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: f64,
    pub method: String,
}

/// A persisted payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
