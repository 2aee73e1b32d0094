use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, OrderStatus, PaymentId, UserId};

use crate::{NewOrder, NewPayment, Order, Payment, Result};

/// Storage for orders owned by the order service.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes an order and all of its items atomically.
    ///
    /// Either the order and every item are stored, or nothing is.
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order with its items.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists every order, oldest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Lists the orders placed by one user, oldest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Sets the status of an order. Returns `None` if the order does not exist.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>>;
}

/// Storage for payments owned by the payment service.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Writes a new payment as `pending` and settles it to `success` in the
    /// same transaction.
    ///
    /// Either the settled payment is stored, or nothing is.
    async fn create_settled_payment(&self, payment: NewPayment) -> Result<Payment>;

    /// Loads a payment.
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
}

#[async_trait]
impl<T: OrderRepository + ?Sized> OrderRepository for Arc<T> {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        (**self).get_order(id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        (**self).list_orders().await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        (**self).list_orders_for_user(user_id).await
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        (**self).update_status(id, status).await
    }
}

#[async_trait]
impl<T: PaymentRepository + ?Sized> PaymentRepository for Arc<T> {
    async fn create_settled_payment(&self, payment: NewPayment) -> Result<Payment> {
        (**self).create_settled_payment(payment).await
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        (**self).get_payment(id).await
    }
}
