//! Payment service endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{PaymentId, PaymentStatus};
use saga::PaymentDraft;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::Authenticated;
use crate::state::PaymentAppState;

#[derive(Debug, Serialize)]
pub struct PaymentCreatedResponse {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// POST /payments: verifies the order with the order service and settles.
pub async fn create(
    State(state): State<PaymentAppState>,
    Authenticated(principal): Authenticated,
    body: Result<Json<PaymentDraft>, JsonRejection>,
) -> Result<Json<PaymentCreatedResponse>, ApiError> {
    let Json(draft) = body?;
    let payment = state.creation.execute(&principal, draft).await?;

    Ok(Json(PaymentCreatedResponse {
        payment_id: payment.id,
        status: payment.status,
        message: "Payment initiated successfully",
    }))
}

/// GET /payments/{id}
pub async fn get(
    State(state): State<PaymentAppState>,
    Authenticated(_principal): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let Path(id) = id?;
    let payment = state.payments.get_payment(PaymentId::new(id)).await?;

    Ok(Json(PaymentResponse {
        payment_id: payment.id,
        status: payment.status,
        amount: payment.amount,
        created_at: payment.created_at,
    }))
}
