mod bootstrap;
mod buy_together;
mod health;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use cobuy_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

fn init_logging(config: &AppConfig) {
    use cobuy_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub fn build_router(app: &bootstrap::Application) -> Router {
    let storefront = buy_together::StorefrontState::from_pool(
        app.db_pool.clone(),
        app.config.storefront.clone(),
    );

    buy_together::router(storefront).merge(health::router(app.db_pool.clone()))
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, build_router(&app)).with_graceful_shutdown(async move {
        let _ = stop_rx.changed().await;
    });
    let serving = tokio::spawn(server.into_future());

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        store_id = %app.config.storefront.store_id,
        "cobuy-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = app.config.server.graceful_shutdown_secs,
        "cobuy-server draining in-flight requests"
    );

    let _ = stop_tx.send(true);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, serving).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            "graceful shutdown window elapsed with requests still in flight"
        ),
    }

    app.db_pool.close().await;
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
