//! Tunable parameters for tracking, playback and arrival detection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Coordinate;
use crate::spatial::GeoBounds;

/// Configuration for one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingParams {
    /// Distance to the destination at which the delivery counts as arrived
    pub arrival_threshold_m: f64,
    /// Average cruise speed used for ETA estimates
    pub assumed_speed_kmh: f64,
    /// Interpolated points generated per path segment during playback
    pub steps_per_segment: usize,
    /// Playback cadence
    pub tick_interval_ms: u64,
    /// Real telemetry feed polling cadence
    pub poll_interval_ms: u64,
    /// Region a correctly ordered coordinate falls in
    pub bounds: GeoBounds,
    /// Route flown when a mission has fewer than two usable points
    pub default_route: DefaultRoute,
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self {
            arrival_threshold_m: 30.0,
            assumed_speed_kmh: 35.0,
            steps_per_segment: 20,
            tick_interval_ms: 600,
            poll_interval_ms: 3000,
            bounds: GeoBounds::default(),
            default_route: DefaultRoute::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultRoute {
    pub origin: Coordinate,
    pub destination: Coordinate,
}

impl Default for DefaultRoute {
    fn default() -> Self {
        Self {
            origin: Coordinate::new(10.7769, 106.7008),
            destination: Coordinate::new(10.8010, 106.6532),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("arrival threshold must be positive, got {0}m")]
    ArrivalThreshold(f64),
    #[error("assumed speed must be positive, got {0}km/h")]
    AssumedSpeed(f64),
    #[error("at least 2 steps per segment are required, got {0}")]
    StepsPerSegment(usize),
    #[error("{0} interval must be non-zero")]
    Interval(&'static str),
    #[error("geographic bounds are inverted or out of range")]
    Bounds,
}

impl TrackingParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(self.arrival_threshold_m.is_finite() && self.arrival_threshold_m > 0.0) {
            return Err(ParamsError::ArrivalThreshold(self.arrival_threshold_m));
        }
        if !(self.assumed_speed_kmh.is_finite() && self.assumed_speed_kmh > 0.0) {
            return Err(ParamsError::AssumedSpeed(self.assumed_speed_kmh));
        }
        if self.steps_per_segment < 2 {
            return Err(ParamsError::StepsPerSegment(self.steps_per_segment));
        }
        if self.tick_interval_ms == 0 {
            return Err(ParamsError::Interval("playback"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ParamsError::Interval("poll"));
        }
        if !self.bounds.is_well_formed() {
            return Err(ParamsError::Bounds);
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
