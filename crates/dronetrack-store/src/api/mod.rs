//! REST API for the order store.

pub mod missions;
pub mod orders;
pub mod request_id;
mod routes;
pub mod telemetry;
pub mod ws;

use axum::Router;
use std::sync::Arc;

use crate::state::StoreState;

pub fn routes() -> Router<Arc<StoreState>> {
    routes::create_router()
}
