//! Dronetrack store - mock order and drone mission backend

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dronetrack_store::config::Config;
use dronetrack_store::StoreState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("dronetrack_store=debug".parse()?))
        .init();

    tracing::info!("Starting order store...");

    let config = Config::from_env();
    let state = match config.seed_path.as_deref() {
        Some(path) => StoreState::load(path)?,
        None => {
            tracing::warn!("STORE_SEED_PATH not set, starting with an empty store");
            StoreState::new()
        }
    };
    let state = Arc::new(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, dronetrack_store::app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
