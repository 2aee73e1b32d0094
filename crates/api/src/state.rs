//! Shared handler state for the two services.

use std::sync::Arc;

use auth::TokenAuthority;
use axum::extract::FromRef;
use peers::{CatalogClient, OrderClient};
use publisher::EventPublisher;
use saga::{OrderCreationSaga, OrderService, PaymentCreationSaga, PaymentService};
use store::{OrderRepository, PaymentRepository};

pub type DynOrderRepository = Arc<dyn OrderRepository>;
pub type DynPaymentRepository = Arc<dyn PaymentRepository>;
pub type DynCatalogClient = Arc<dyn CatalogClient>;
pub type DynOrderClient = Arc<dyn OrderClient>;
pub type DynPublisher = Arc<dyn EventPublisher>;

/// State for the order service handlers.
#[derive(Clone)]
pub struct OrderAppState {
    pub authority: Arc<TokenAuthority>,
    pub creation: Arc<OrderCreationSaga<DynOrderRepository, DynCatalogClient, DynPublisher>>,
    pub orders: Arc<OrderService<DynOrderRepository, DynCatalogClient>>,
}

impl OrderAppState {
    pub fn new(
        authority: Arc<TokenAuthority>,
        orders: DynOrderRepository,
        catalog: DynCatalogClient,
        publisher: DynPublisher,
    ) -> Self {
        Self {
            authority,
            creation: Arc::new(OrderCreationSaga::new(
                orders.clone(),
                catalog.clone(),
                publisher,
            )),
            orders: Arc::new(OrderService::new(orders, catalog)),
        }
    }
}

impl FromRef<OrderAppState> for Arc<TokenAuthority> {
    fn from_ref(state: &OrderAppState) -> Self {
        state.authority.clone()
    }
}

/// State for the payment service handlers.
#[derive(Clone)]
pub struct PaymentAppState {
    pub authority: Arc<TokenAuthority>,
    pub creation: Arc<PaymentCreationSaga<DynPaymentRepository, DynOrderClient, DynPublisher>>,
    pub payments: Arc<PaymentService<DynPaymentRepository>>,
}

impl PaymentAppState {
    pub fn new(
        authority: Arc<TokenAuthority>,
        payments: DynPaymentRepository,
        orders: DynOrderClient,
        publisher: DynPublisher,
    ) -> Self {
        Self {
            authority,
            creation: Arc::new(PaymentCreationSaga::new(
                payments.clone(),
                orders,
                publisher,
            )),
            payments: Arc::new(PaymentService::new(payments)),
        }
    }
}

impl FromRef<PaymentAppState> for Arc<TokenAuthority> {
    fn from_ref(state: &PaymentAppState) -> Self {
        state.authority.clone()
    }
}
