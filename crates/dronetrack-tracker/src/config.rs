//! Tracker configuration from environment.

use std::env;
use std::str::FromStr;

use dronetrack_core::TrackingParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub params: TrackingParams,
}

impl Config {
    /// Read `DRONETRACK_*` variables, falling back to defaults for anything
    /// missing or unparseable.
    pub fn from_env() -> Self {
        let defaults = TrackingParams::default();
        Self {
            store_url: env::var("DRONETRACK_STORE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            params: TrackingParams {
                arrival_threshold_m: parsed("DRONETRACK_ARRIVAL_THRESHOLD_M")
                    .unwrap_or(defaults.arrival_threshold_m),
                assumed_speed_kmh: parsed("DRONETRACK_ASSUMED_SPEED_KMH")
                    .unwrap_or(defaults.assumed_speed_kmh),
                tick_interval_ms: parsed("DRONETRACK_TICK_MS").unwrap_or(defaults.tick_interval_ms),
                steps_per_segment: parsed("DRONETRACK_STEPS_PER_SEGMENT")
                    .unwrap_or(defaults.steps_per_segment),
                poll_interval_ms: parsed("DRONETRACK_POLL_MS").unwrap_or(defaults.poll_interval_ms),
                ..defaults
            },
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}
