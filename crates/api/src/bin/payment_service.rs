//! Payment service entry point.

use api::server::{self, StartupError};
use api::{Config, create_payment_app};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    server::init_tracing(&config.log_level);
    tracing::info!(?config, "starting payment service");

    let metrics_handle = server::install_metrics()?;
    let state = server::build_payment_state(&config).await?;
    let app = create_payment_app(state, metrics_handle);

    server::serve(app, &config.addr()).await
}
