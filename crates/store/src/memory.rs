use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, OrderStatus, PaymentId, PaymentStatus, UserId};
use tokio::sync::RwLock;

use crate::{
    NewOrder, NewPayment, Order, OrderItem, Payment, Result, StoreError,
    repository::{OrderRepository, PaymentRepository},
};

#[derive(Default)]
struct OrderTable {
    orders: BTreeMap<OrderId, Order>,
    next_order_id: i64,
    next_item_id: i64,
}

/// In-memory order repository for testing and database-less runs.
///
/// Provides the same interface as the PostgreSQL implementation. Writes can
/// be made to fail to exercise the saga's persistence error path.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    table: Arc<RwLock<OrderTable>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.table.read().await.orders.len()
    }

    /// Returns the number of stored order items across all orders.
    pub async fn item_count(&self) -> usize {
        self.table
            .read()
            .await
            .orders
            .values()
            .map(|o| o.items.len())
            .sum()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order store rejected write".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        self.check_writable()?;

        let mut table = self.table.write().await;
        table.next_order_id += 1;
        let id = OrderId::new(table.next_order_id);

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            table.next_item_id += 1;
            items.push(OrderItem {
                id: table.next_item_id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                price: item.price,
            });
        }

        let now = Utc::now();
        let stored = Order {
            id,
            user_id: order.user_id,
            status: OrderStatus::Created,
            total_price: order.total_price,
            created_at: now,
            updated_at: now,
            items,
        };
        table.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.table.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.table.read().await.orders.values().cloned().collect())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self
            .table
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        self.check_writable()?;

        let mut table = self.table.write().await;
        Ok(table.orders.get_mut(&id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }
}

#[derive(Default)]
struct PaymentTable {
    payments: BTreeMap<PaymentId, Payment>,
    next_id: i64,
}

/// In-memory payment repository for testing and database-less runs.
#[derive(Clone, Default)]
pub struct InMemoryPaymentRepository {
    table: Arc<RwLock<PaymentTable>>,
    fail_writes: Arc<AtomicBool>,
    fail_settle: Arc<AtomicBool>,
}

impl InMemoryPaymentRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes settling fail after the pending payment has been staged.
    pub fn set_fail_settle(&self, fail: bool) {
        self.fail_settle.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored payments.
    pub async fn payment_count(&self) -> usize {
        self.table.read().await.payments.len()
    }

    /// Returns every stored payment, oldest first.
    pub async fn all_payments(&self) -> Vec<Payment> {
        self.table.read().await.payments.values().cloned().collect()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "payment store rejected write".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create_settled_payment(&self, payment: NewPayment) -> Result<Payment> {
        self.check_writable()?;

        let mut table = self.table.write().await;
        // ids are spent even when the write is abandoned, like a sequence
        table.next_id += 1;
        let id = PaymentId::new(table.next_id);
        let mut staged = Payment {
            id,
            order_id: payment.order_id,
            amount: payment.amount,
            method: payment.method,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };

        if self.fail_settle.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "payment store rejected settlement".into(),
            ));
        }
        staged.status = PaymentStatus::Success;
        table.payments.insert(id, staged.clone());
        Ok(staged)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.table.read().await.payments.get(&id).cloned())
    }
}
