//! One-shot arrival detection.

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, OrderStatus};
use crate::spatial::haversine_distance_m;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalState {
    /// Watching for the destination
    Armed,
    /// Fired; stays here for the rest of the session
    Triggered,
}

/// Emitted exactly once per session when the drone reaches the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub distance_m: f64,
    pub position: Coordinate,
}

/// Geofence around the destination that completes the order once.
#[derive(Debug, Clone)]
pub struct ArrivalBridge {
    threshold_m: f64,
    state: ArrivalState,
}

impl ArrivalBridge {
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            state: ArrivalState::Armed,
        }
    }

    pub fn state(&self) -> ArrivalState {
        self.state
    }

    pub fn is_triggered(&self) -> bool {
        self.state == ArrivalState::Triggered
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Check the latest position. Only an in-flight order on an armed bridge
    /// can trigger; the state flips before returning so a second call in the
    /// same session never fires again.
    pub fn observe(
        &mut self,
        latest: Coordinate,
        destination: Option<Coordinate>,
        order_status: OrderStatus,
    ) -> Option<Arrival> {
        if self.state == ArrivalState::Triggered || !order_status.is_in_flight() {
            return None;
        }
        let destination = destination?;
        let distance_m = haversine_distance_m(latest, destination);
        if distance_m.is_nan() || distance_m > self.threshold_m {
            return None;
        }
        self.state = ArrivalState::Triggered;
        Some(Arrival {
            distance_m,
            position: latest,
        })
    }
}
