//! Order service client, used by the payment service.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use auth::ServiceIdentityCache;
use common::{OrderId, OrderStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::http::{PeerConfig, PeerHttp};
use crate::{PeerError, Result};

/// A line of an order as reported by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshotItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// An order as reported by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub total_price: f64,
    pub status: OrderStatus,
    pub items: Vec<OrderSnapshotItem>,
}

/// Looks up orders by id.
#[async_trait]
pub trait OrderClient: Send + Sync {
    /// Fetches one order, or a typed failure.
    async fn fetch_order(&self, id: OrderId) -> Result<OrderSnapshot>;
}

#[async_trait]
impl<T: OrderClient + ?Sized> OrderClient for Arc<T> {
    async fn fetch_order(&self, id: OrderId) -> Result<OrderSnapshot> {
        (**self).fetch_order(id).await
    }
}

/// Order client speaking `GET /orders/{id}`.
#[derive(Debug, Clone)]
pub struct HttpOrderClient {
    http: PeerHttp,
}

impl HttpOrderClient {
    pub fn new(config: PeerConfig, identity: Arc<ServiceIdentityCache>) -> Result<Self> {
        Ok(Self {
            http: PeerHttp::new("order", config, identity)?,
        })
    }
}

#[async_trait]
impl OrderClient for HttpOrderClient {
    #[tracing::instrument(skip(self), fields(order_id = %id))]
    async fn fetch_order(&self, id: OrderId) -> Result<OrderSnapshot> {
        let body = self.http.get_json(&format!("/orders/{id}")).await?;
        parse_order(id, body)
    }
}

fn parse_order(requested: OrderId, body: Value) -> Result<OrderSnapshot> {
    if !body.is_object() {
        return Err(PeerError::InvalidResponse(
            "expected a JSON object for the order".into(),
        ));
    }

    let order: OrderSnapshot = serde_json::from_value(body)
        .map_err(|e| PeerError::InvalidResponse(format!("malformed order: {e}")))?;

    if order.order_id != requested {
        return Err(PeerError::InvalidResponse(format!(
            "asked for order {requested}, order service returned {}",
            order.order_id
        )));
    }
    if !order.total_price.is_finite() {
        return Err(PeerError::InvalidResponse(format!(
            "order {} has a non-finite total",
            order.order_id
        )));
    }

    Ok(order)
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<OrderId, OrderSnapshot>,
    failure: Option<PeerError>,
}

/// In-memory order service for testing.
#[derive(Clone, Default)]
pub struct InMemoryOrderClient {
    state: Arc<RwLock<OrderState>>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryOrderClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an order.
    pub async fn insert(&self, order: OrderSnapshot) {
        self.state.write().await.orders.insert(order.order_id, order);
    }

    /// Makes every lookup fail with `failure` until cleared with `None`.
    pub async fn set_failure(&self, failure: Option<PeerError>) {
        self.state.write().await.failure = failure;
    }

    /// Number of lookups made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderClient for InMemoryOrderClient {
    async fn fetch_order(&self, id: OrderId) -> Result<OrderSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        if let Some(failure) = &state.failure {
            return Err(failure.clone());
        }
        state.orders.get(&id).cloned().ok_or(PeerError::NotFound)
    }
}
