//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use saga::SagaError;

/// Body text for every 500 response.
pub const INTERNAL_ERROR_DETAIL: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
///
/// Every response body has the shape `{"detail": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or refused bearer token.
    Unauthorized(&'static str),
    /// Malformed request body or path.
    BadRequest(String),
    /// Saga or query error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    detail(msg),
                )
                    .into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        (status, detail(&message)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::Forbidden(_) => (StatusCode::FORBIDDEN, err.to_string()),
        SagaError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        SagaError::Validation(_)
        | SagaError::PriceMismatch { .. }
        | SagaError::AmountMismatch { .. }
        | SagaError::NotPayable { .. }
        | SagaError::InvalidStatus(_)
        | SagaError::PeerRejected { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        SagaError::ServiceUnavailable { peer, reason } => {
            tracing::warn!(%peer, %reason, "peer service unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        SagaError::UpstreamInvalid { .. } | SagaError::Persistence(_) | SagaError::Internal(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_DETAIL.to_string(),
            )
        }
    }
}

/// Builds a `{"detail": ...}` JSON body.
pub(crate) fn detail(message: &str) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "detail": message }))
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
