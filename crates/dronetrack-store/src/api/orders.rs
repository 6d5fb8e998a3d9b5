//! Order endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::StoreState;
use dronetrack_core::models::{Order, OrderStatus};

/// Partial order update. Absent fields are left alone; unknown fields are
/// merged into the stored record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub updated_at: Option<DateTime<Utc>>,
    pub drone_mission_id: Option<String>,
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OrderPatch {
    fn apply(self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if self.drone_mission_id.is_some() {
            order.drone_mission_id = self.drone_mission_id;
        }
        if self.address.is_some() {
            order.address = self.address;
        }
        order.updated_at = Some(self.updated_at.unwrap_or_else(Utc::now));
        order.extra.extend(self.extra);
    }
}

/// List all orders.
pub async fn list_orders(State(state): State<Arc<StoreState>>) -> Json<Vec<Order>> {
    Json(state.list_orders())
}

/// Get a specific order by ID.
pub async fn get_order(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, StatusCode> {
    state.get_order(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Patch an order.
pub async fn patch_order(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, StatusCode> {
    state
        .update_order(&id, |order| patch.apply(order))
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
