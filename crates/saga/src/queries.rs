//! Order and payment reads, and the admin status update.

use std::collections::HashMap;

use auth::Principal;
use common::{OrderId, OrderStatus, PaymentId, ProductId, UserId};
use peers::CatalogClient;
use store::{Order, OrderRepository, Payment, PaymentRepository};

use crate::access::{self, OrderScope};
use crate::error::{Result, SagaError};

/// Read access and status changes for orders owned by the order service.
pub struct OrderService<R, C>
where
    R: OrderRepository,
    C: CatalogClient,
{
    orders: R,
    catalog: C,
}

impl<R, C> OrderService<R, C>
where
    R: OrderRepository,
    C: CatalogClient,
{
    pub fn new(orders: R, catalog: C) -> Self {
        Self { orders, catalog }
    }

    /// Loads one order the caller is allowed to see.
    #[tracing::instrument(skip(self, principal), fields(role = %principal.role))]
    pub async fn get_order(&self, principal: &Principal, id: OrderId) -> Result<Order> {
        let order = self
            .orders
            .get_order(id)
            .await?
            .ok_or_else(|| SagaError::NotFound("Order not found".into()))?;

        let scope = access::read_scope(principal);
        if !self.visible(&order, scope, &mut HashMap::new()).await {
            return Err(SagaError::Forbidden("You cannot view this order"));
        }
        Ok(order)
    }

    /// Lists orders for admins (all) and sellers (containing their products).
    #[tracing::instrument(skip(self, principal), fields(role = %principal.role))]
    pub async fn list_orders(&self, principal: &Principal) -> Result<Vec<Order>> {
        let scope = access::list_scope(principal)
            .ok_or(SagaError::Forbidden("Only admin and seller can view orders"))?;

        let orders = self.orders.list_orders().await?;
        let mut sellers = HashMap::new();
        let mut visible = Vec::with_capacity(orders.len());
        for order in orders {
            if self.visible(&order, scope, &mut sellers).await {
                visible.push(order);
            }
        }
        Ok(visible)
    }

    /// Lists the orders the caller placed.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn list_own_orders(&self, principal: &Principal) -> Result<Vec<Order>> {
        Ok(self.orders.list_orders_for_user(principal.user_id).await?)
    }

    /// Sets an order's status. Admin only.
    #[tracing::instrument(skip(self, principal), fields(role = %principal.role))]
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: OrderId,
        status: &str,
    ) -> Result<Order> {
        access::require_admin(principal, "Only admin can update order status")?;

        if self.orders.get_order(id).await?.is_none() {
            return Err(SagaError::NotFound("Order not found".into()));
        }
        let status: OrderStatus = status
            .parse()
            .map_err(|_| SagaError::InvalidStatus(status.to_string()))?;

        let order = self
            .orders
            .update_status(id, status)
            .await?
            .ok_or_else(|| SagaError::NotFound("Order not found".into()))?;
        tracing::info!(order_id = %id, %status, "order status updated");
        Ok(order)
    }

    /// Whether `order` falls inside `scope`.
    async fn visible(
        &self,
        order: &Order,
        scope: OrderScope,
        sellers: &mut HashMap<ProductId, Option<UserId>>,
    ) -> bool {
        match scope {
            OrderScope::All => true,
            OrderScope::PlacedBy(user) => order.user_id == user,
            OrderScope::SoldBy(seller) => self.sells_any(order, seller, sellers).await,
        }
    }

    /// Whether any product on `order` is sold by `seller`.
    ///
    /// Lookups are memoized in `sellers` for the duration of one request. A
    /// product the catalog cannot describe is logged and skipped.
    async fn sells_any(
        &self,
        order: &Order,
        seller: UserId,
        sellers: &mut HashMap<ProductId, Option<UserId>>,
    ) -> bool {
        for product_id in order.product_ids() {
            let owner = match sellers.get(&product_id) {
                Some(owner) => *owner,
                None => {
                    let owner = match self.catalog.fetch_product(product_id).await {
                        Ok(product) => Some(product.seller_id),
                        Err(e) => {
                            tracing::error!(
                                %product_id,
                                error = %e,
                                "failed to fetch product info"
                            );
                            None
                        }
                    };
                    sellers.insert(product_id, owner);
                    owner
                }
            };
            if owner == Some(seller) {
                return true;
            }
        }
        false
    }
}

/// Read access to payments owned by the payment service.
pub struct PaymentService<R>
where
    R: PaymentRepository,
{
    payments: R,
}

impl<R> PaymentService<R>
where
    R: PaymentRepository,
{
    pub fn new(payments: R) -> Self {
        Self { payments }
    }

    /// Loads one payment. Any authenticated caller may read it.
    #[tracing::instrument(skip(self))]
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get_payment(id)
            .await?
            .ok_or_else(|| SagaError::NotFound("Payment not found".into()))
    }
}
