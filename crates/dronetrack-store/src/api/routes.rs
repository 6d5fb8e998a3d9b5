//! Route table.

use axum::{
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::api::{missions, orders, request_id, telemetry, ws};
use crate::state::StoreState;

/// Create the API router.
pub fn create_router() -> Router<Arc<StoreState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/orders", get(orders::list_orders))
        .route(
            "/orders/:id",
            get(orders::get_order).patch(orders::patch_order),
        )
        .route("/droneMissions", get(missions::list_missions))
        .route("/droneMissions/:id", get(missions::get_mission))
        .route(
            "/droneTelemetry",
            get(telemetry::list_telemetry).post(telemetry::record_telemetry),
        )
        .route("/v1/stream", get(ws::ws_handler))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}
