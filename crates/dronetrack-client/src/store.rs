//! Seam between the tracker and whatever holds orders and missions.

use async_trait::async_trait;

use dronetrack_core::models::{Mission, Order, OrderStatus, TelemetryPoint};

use crate::StoreError;

/// Read access to orders, missions and the telemetry feed, plus the one
/// write the tracker performs.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn fetch_order(&self, order_id: &str) -> Result<Order, StoreError>;

    async fn fetch_mission(&self, mission_id: &str) -> Result<Mission, StoreError>;

    /// Mission lookup for orders whose `droneMissionId` is missing.
    async fn fetch_mission_for_order(&self, order_id: &str) -> Result<Option<Mission>, StoreError>;

    /// Idempotent partial update of the order status.
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, StoreError>;

    /// Real telemetry for a mission, oldest first.
    async fn fetch_telemetry(&self, mission_id: &str) -> Result<Vec<TelemetryPoint>, StoreError>;

    /// Mission referenced by the order, falling back to lookup by order id.
    async fn resolve_mission(&self, order: &Order) -> Result<Option<Mission>, StoreError> {
        if let Some(mission_id) = order.drone_mission_id.as_deref() {
            match self.fetch_mission(mission_id).await {
                Ok(mission) => return Ok(Some(mission)),
                Err(err) if err.is_not_found() => {
                    tracing::warn!(
                        order_id = %order.id,
                        mission_id,
                        "referenced mission missing, falling back to order lookup"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        self.fetch_mission_for_order(&order.id).await
    }
}
