//! HTTP front ends for the order and payment services.
//!
//! Both services authenticate every business route with a bearer token,
//! answer errors as `{"detail": ...}`, log with `tracing` and expose
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

use std::any::Any;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::{OrderAppState, PaymentAppState};

/// Creates the order service router.
pub fn create_order_app(state: OrderAppState, metrics_handle: PrometheusHandle) -> Router {
    let router = Router::new()
        .route("/orders", post(routes::orders::create).get(routes::orders::list))
        .route("/orders/me", get(routes::orders::list_mine))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .with_state(state);

    with_common_layers(router, metrics_handle)
}

/// Creates the payment service router.
pub fn create_payment_app(state: PaymentAppState, metrics_handle: PrometheusHandle) -> Router {
    let router = Router::new()
        .route("/payments", post(routes::payments::create))
        .route("/payments/{id}", get(routes::payments::get))
        .with_state(state);

    with_common_layers(router, metrics_handle)
}

fn with_common_layers(router: Router, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    router
        .route("/health", get(routes::health::check))
        .merge(metrics_router)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error::detail(error::INTERNAL_ERROR_DETAIL),
    )
        .into_response()
}
