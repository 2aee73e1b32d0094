//! Process startup shared by the service binaries.

use std::sync::Arc;

use auth::{AuthError, ServiceIdentityCache, TokenAuthority};
use axum::Router;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use peers::{HttpCatalogClient, HttpOrderClient, PeerConfig, PeerError};
use publisher::AmqpPublisher;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use store::{
    InMemoryOrderRepository, InMemoryPaymentRepository, PostgresOrderRepository,
    PostgresPaymentRepository, StoreError,
};
use thiserror::Error;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, ConfigError};
use crate::state::{DynOrderRepository, DynPaymentRepository, OrderAppState, PaymentAppState};

const MAX_DB_CONNECTIONS: u32 = 10;

/// Errors that stop a service before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("token authority: {0}")]
    Auth(#[from] AuthError),

    #[error("peer client: {0}")]
    Peer(#[from] PeerError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("metrics recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Installs the global Prometheus recorder.
pub fn install_metrics() -> Result<PrometheusHandle, StartupError> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Wires the order service from configuration.
pub async fn build_order_state(config: &Config) -> Result<OrderAppState, StartupError> {
    let authority = Arc::new(TokenAuthority::new(&config.jwt_secret, config.jwt_algorithm)?);
    let identity = Arc::new(ServiceIdentityCache::new(authority.clone()));

    let catalog = HttpCatalogClient::new(
        PeerConfig::new(&config.product_service_url).with_timeout(config.peer_timeout),
        identity,
    )?;

    let orders: DynOrderRepository = match &config.database_url {
        Some(url) => {
            let repo = PostgresOrderRepository::new(connect(url).await?);
            repo.run_migrations().await?;
            tracing::info!("using PostgreSQL order store");
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    Ok(OrderAppState::new(
        authority,
        orders,
        Arc::new(catalog),
        Arc::new(amqp_publisher(config)),
    ))
}

/// Wires the payment service from configuration.
pub async fn build_payment_state(config: &Config) -> Result<PaymentAppState, StartupError> {
    let authority = Arc::new(TokenAuthority::new(&config.jwt_secret, config.jwt_algorithm)?);
    let identity = Arc::new(ServiceIdentityCache::new(authority.clone()));

    let orders = HttpOrderClient::new(
        PeerConfig::new(&config.order_service_url).with_timeout(config.peer_timeout),
        identity,
    )?;

    let payments: DynPaymentRepository = match &config.database_url {
        Some(url) => {
            let repo = PostgresPaymentRepository::new(connect(url).await?);
            repo.run_migrations().await?;
            tracing::info!("using PostgreSQL payment store");
            Arc::new(repo)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, payments are kept in memory");
            Arc::new(InMemoryPaymentRepository::new())
        }
    };

    Ok(PaymentAppState::new(
        authority,
        payments,
        Arc::new(orders),
        Arc::new(amqp_publisher(config)),
    ))
}

fn amqp_publisher(config: &Config) -> AmqpPublisher {
    AmqpPublisher::new(&config.rabbitmq_url).with_timeout(config.publish_timeout)
}

async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .connect(url)
        .await
}

/// Binds `addr` and serves `app` until SIGINT or SIGTERM.
pub async fn serve(app: Router, addr: &str) -> Result<(), StartupError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}
