//! Derived delivery metrics.
//!
//! Pure functions of the telemetry sequence and the normalized path; nothing
//! here is stored separately.

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, TelemetryPoint};
use crate::spatial::{haversine_distance_km, polyline_length_km};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    /// Latest point to destination; `None` without a latest point or path
    pub remaining_km: Option<f64>,
    pub eta_minutes: Option<u32>,
    pub total_km: f64,
    pub traveled_km: f64,
    /// `None` until two points with positive elapsed time exist
    pub top_speed_kmh: Option<f64>,
}

impl DeliveryMetrics {
    pub fn compute(telemetry: &[TelemetryPoint], path: &[Coordinate], assumed_speed_kmh: f64) -> Self {
        let remaining_km = remaining_distance_km(telemetry.last(), path.last().copied());
        Self {
            remaining_km,
            eta_minutes: remaining_km.and_then(|km| eta_minutes(km, assumed_speed_kmh)),
            total_km: polyline_length_km(path.iter().copied()),
            traveled_km: polyline_length_km(telemetry.iter().map(TelemetryPoint::coordinate)),
            top_speed_kmh: top_speed_kmh(telemetry),
        }
    }
}

pub fn remaining_distance_km(
    latest: Option<&TelemetryPoint>,
    destination: Option<Coordinate>,
) -> Option<f64> {
    let distance = haversine_distance_km(latest?.coordinate(), destination?);
    distance.is_finite().then_some(distance)
}

/// `ceil(remaining / speed * 60)`.
pub fn eta_minutes(remaining_km: f64, assumed_speed_kmh: f64) -> Option<u32> {
    if !remaining_km.is_finite() || remaining_km < 0.0 || assumed_speed_kmh <= 0.0 {
        return None;
    }
    let minutes = (remaining_km / assumed_speed_kmh * 60.0).ceil();
    (minutes <= u32::MAX as f64).then_some(minutes as u32)
}

/// Fastest leg between consecutive samples with positive elapsed time.
pub fn top_speed_kmh(telemetry: &[TelemetryPoint]) -> Option<f64> {
    telemetry
        .windows(2)
        .filter_map(|pair| {
            let elapsed_ms = (pair[1].timestamp - pair[0].timestamp).num_milliseconds();
            if elapsed_ms <= 0 {
                return None;
            }
            let hours = elapsed_ms as f64 / 3_600_000.0;
            let speed = haversine_distance_km(pair[0].coordinate(), pair[1].coordinate()) / hours;
            speed.is_finite().then_some(speed)
        })
        .fold(None, |top: Option<f64>, speed| Some(top.map_or(speed, |top| top.max(speed))))
}
