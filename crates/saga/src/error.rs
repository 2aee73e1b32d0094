//! Saga error types.

use common::{OrderStatus, ProductId};
use peers::PeerError;
use store::StoreError;
use thiserror::Error;

/// Errors that can end an orchestration or an order/payment operation.
///
/// The display text of every client-facing variant is safe to show to the
/// caller.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The caller's role or identity does not allow the operation.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The referenced order, product or payment does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A field of the request is out of range.
    #[error("{0}")]
    Validation(String),

    /// The declared order total differs from the catalog-priced total.
    #[error("Total price does not match calculated price")]
    PriceMismatch { declared: f64, computed: f64 },

    /// The payment amount differs from the order total.
    #[error("Payment amount does not match order total price")]
    AmountMismatch { amount: f64, total: f64 },

    /// The order is in a status that cannot be paid.
    #[error("Order cannot be paid in its current status")]
    NotPayable { status: OrderStatus },

    /// The requested order status is not one of the known statuses.
    #[error("Invalid order status")]
    InvalidStatus(String),

    /// A peer service could not be reached in time.
    #[error("{peer} service is unavailable")]
    ServiceUnavailable { peer: &'static str, reason: String },

    /// A peer service answered with data of the wrong shape.
    #[error("Invalid response from {peer} service")]
    UpstreamInvalid { peer: &'static str, reason: String },

    /// A peer service refused the lookup.
    #[error("Failed to retrieve {peer} info")]
    PeerRejected { peer: &'static str, status: u16 },

    /// The local store failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Anything else that must not leak to the caller.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SagaError {
    /// Maps a failed product lookup.
    pub fn from_catalog(product_id: ProductId, err: PeerError) -> Self {
        match err {
            PeerError::NotFound => SagaError::NotFound(format!("Product {product_id} not found")),
            other => Self::from_peer("product", other),
        }
    }

    /// Maps a failed order lookup.
    pub fn from_order_lookup(err: PeerError) -> Self {
        match err {
            PeerError::NotFound => SagaError::NotFound("Order not found".into()),
            other => Self::from_peer("order", other),
        }
    }

    fn from_peer(peer: &'static str, err: PeerError) -> Self {
        match err {
            PeerError::NotFound => SagaError::NotFound(format!("{peer} not found")),
            PeerError::Unavailable(reason) => SagaError::ServiceUnavailable { peer, reason },
            PeerError::BadRequest { status } => SagaError::PeerRejected { peer, status },
            PeerError::InvalidResponse(reason) => SagaError::UpstreamInvalid { peer, reason },
            PeerError::Identity(reason) => SagaError::Internal(reason),
        }
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            SagaError::Forbidden(_) => "forbidden",
            SagaError::NotFound(_) => "not_found",
            SagaError::Validation(_) => "validation",
            SagaError::PriceMismatch { .. } => "price_mismatch",
            SagaError::AmountMismatch { .. } => "amount_mismatch",
            SagaError::NotPayable { .. } => "not_payable",
            SagaError::InvalidStatus(_) => "invalid_status",
            SagaError::ServiceUnavailable { .. } => "peer_unavailable",
            SagaError::UpstreamInvalid { .. } => "upstream_invalid",
            SagaError::PeerRejected { .. } => "peer_rejected",
            SagaError::Persistence(_) => "persistence",
            SagaError::Internal(_) => "internal",
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
