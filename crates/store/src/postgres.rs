use std::collections::HashMap;

use async_trait::async_trait;
use common::{OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    NewOrder, NewPayment, Order, OrderItem, Payment, Result, StoreError,
    repository::{OrderRepository, PaymentRepository},
};

const ORDER_COLUMNS: &str = "id, user_id, status, total_price, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price";
const PAYMENT_COLUMNS: &str = "id, order_id, amount, payment_method, status, created_at";

/// PostgreSQL-backed order repository.
#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    /// Creates a new repository on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the order service migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/order")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_order(row: &PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = status.parse::<OrderStatus>().map_err(|e| StoreError::CorruptRow {
            table: "orders",
            reason: e.to_string(),
        })?;

        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            status,
            total_price: row.try_get("total_price")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
        })
    }

    fn row_to_item(row: &PgRow) -> Result<(OrderId, OrderItem)> {
        let quantity: i32 = row.try_get("quantity")?;
        let quantity = u32::try_from(quantity).map_err(|_| StoreError::CorruptRow {
            table: "order_items",
            reason: format!("negative quantity {quantity}"),
        })?;

        let item = OrderItem {
            id: row.try_get("id")?,
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity,
            price: row.try_get("price")?,
        };
        Ok((OrderId::new(row.try_get("order_id")?), item))
    }

    /// Loads the items for `orders` in one query and attaches them.
    async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id ASC"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let (order_id, item) = Self::row_to_item(row)?;
            by_order.entry(order_id).or_default().push(item);
        }

        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (user_id, status, total_price)
            VALUES ($1, $2, $3)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.user_id.as_i64())
        .bind(OrderStatus::Created.as_str())
        .bind(order.total_price)
        .fetch_one(&mut *tx)
        .await?;
        let mut stored = Self::row_to_order(&row)?;

        for item in order.items {
            let quantity = i32::try_from(item.quantity).map_err(|_| StoreError::InvalidValue {
                field: "quantity",
                reason: format!("{} exceeds the column range", item.quantity),
            })?;

            let row = sqlx::query(&format!(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(stored.id.as_i64())
            .bind(item.product_id.as_i64())
            .bind(&item.product_name)
            .bind(quantity)
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await?;
            let (_, item) = Self::row_to_item(&row)?;
            stored.items.push(item);
        }

        // Dropping the transaction on any error above rolls back the order row
        tx.commit().await?;
        tracing::debug!(order_id = %stored.id, items = stored.items.len(), "order committed");
        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let order = Self::row_to_order(&row)?;
                Ok(self.attach_items(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let orders = rows.iter().map(Self::row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id ASC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let orders = rows.iter().map(Self::row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let order = Self::row_to_order(&row)?;
                Ok(self.attach_items(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }
}

/// PostgreSQL-backed payment repository.
#[derive(Clone)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    /// Creates a new repository on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the payment service migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/payment")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PaymentStatus>()
            .map_err(|e| StoreError::CorruptRow {
                table: "payments",
                reason: e.to_string(),
            })?;

        Ok(Payment {
            id: PaymentId::new(row.try_get("id")?),
            order_id: OrderId::new(row.try_get("order_id")?),
            amount: row.try_get("amount")?,
            method: row.try_get("payment_method")?,
            status,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn create_settled_payment(&self, payment: NewPayment) -> Result<Payment> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (order_id, amount, payment_method, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.order_id.as_i64())
        .bind(payment.amount)
        .bind(&payment.method)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let pending = Self::row_to_payment(&row)?;

        // No gateway: every pending payment succeeds.
        let row = sqlx::query(&format!(
            "UPDATE payments SET status = $2 WHERE id = $1 RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(pending.id.as_i64())
        .bind(PaymentStatus::Success.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let settled = Self::row_to_payment(&row)?;

        tx.commit().await?;
        tracing::debug!(payment_id = %settled.id, "payment committed");
        Ok(settled)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_payment).transpose()
    }
}
