//! Drone mission endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::StoreState;
use dronetrack_core::models::Mission;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionQuery {
    pub order_id: Option<String>,
}

/// List missions, optionally filtered by order.
pub async fn list_missions(
    State(state): State<Arc<StoreState>>,
    Query(query): Query<MissionQuery>,
) -> Json<Vec<Mission>> {
    Json(state.missions_for_order(query.order_id.as_deref()))
}

/// Get a specific mission by ID.
pub async fn get_mission(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
) -> Result<Json<Mission>, StatusCode> {
    state.get_mission(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}
