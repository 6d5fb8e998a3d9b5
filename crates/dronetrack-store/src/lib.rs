//! Mock order/mission store: a json-server style REST API over in-memory
//! state, plus a WebSocket stream of order status changes.

pub mod api;
pub mod config;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::{SeedData, StoreState};

/// Router with state and middleware applied.
pub fn app(state: Arc<StoreState>) -> Router {
    api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the store on an already-bound listener until the future is dropped.
pub async fn serve(listener: TcpListener, state: Arc<StoreState>) -> std::io::Result<()> {
    axum::serve(listener, app(state)).await
}
