//! Telemetry feed endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::StoreState;
use dronetrack_core::models::TelemetryRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryQuery {
    pub mission_id: Option<String>,
}

/// Telemetry records, oldest first.
pub async fn list_telemetry(
    State(state): State<Arc<StoreState>>,
    Query(query): Query<TelemetryQuery>,
) -> Json<Vec<TelemetryRecord>> {
    Json(state.telemetry_for(query.mission_id.as_deref()))
}

/// Record a position sample from a drone.
pub async fn record_telemetry(
    State(state): State<Arc<StoreState>>,
    Json(record): Json<TelemetryRecord>,
) -> Result<(StatusCode, Json<TelemetryRecord>), StatusCode> {
    if !(record.lat.is_finite() && record.lng.is_finite()) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    tracing::debug!(mission_id = %record.mission_id, "Recorded telemetry");
    state.push_telemetry(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}
