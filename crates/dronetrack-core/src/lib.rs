//! Drone delivery tracking engine.
//!
//! Normalizes mission paths, plays a simulated drone along them, keeps the
//! session's telemetry, derives ETA/distance/speed, and completes the order
//! once when the drone reaches the destination. Timers and I/O live in
//! `dronetrack-tracker`; everything here is synchronous.

pub mod arrival;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod params;
pub mod playback;
pub mod session;
pub mod spatial;
pub mod telemetry;

pub use arrival::{Arrival, ArrivalBridge, ArrivalState};
pub use metrics::{eta_minutes, DeliveryMetrics};
pub use models::{
    Coordinate, Mission, MissionPhase, MissionStatus, Order, OrderItem, OrderStage, OrderStatus,
    RawPoint, StatusChange, TelemetryPoint, TelemetryRecord, STATUS_CHANGED_EVENT,
};
pub use normalize::{normalize_path_smart, normalize_point};
pub use params::{DefaultRoute, ParamsError, TrackingParams};
pub use playback::{build_dense_route, PlaybackCursor};
pub use session::{Completion, IngestOutcome, TrackerSnapshot, TrackingSession};
pub use spatial::{haversine_distance_km, haversine_distance_m, is_valid_coordinate_pair, GeoBounds};
pub use telemetry::TelemetryStore;
