//! Core data models for order tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Event name used when an order status change is broadcast to other views.
pub const STATUS_CHANGED_EVENT: &str = "order:statusChanged";

/// A resolved (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are finite numbers.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// The same pair read the other way round.
    pub fn swapped(&self) -> Self {
        Self {
            lat: self.lng,
            lng: self.lat,
        }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lat, coord.lng]
    }
}

/// A path element as it arrives from upstream records.
///
/// Upstream data mixes `[a, b]` arrays with `{lat, lng}` style objects and
/// sometimes stores the array transposed, so nothing here is trusted until it
/// goes through the path normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPoint {
    Pair(Vec<Option<f64>>),
    Named(NamedPoint),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "longitude")]
    pub lng: Option<f64>,
}

impl RawPoint {
    pub fn pair(a: f64, b: f64) -> Self {
        RawPoint::Pair(vec![Some(a), Some(b)])
    }

    /// The two components in the order they were given, if both are finite.
    ///
    /// Named objects are taken at face value (`lat` first); arrays yield their
    /// first two members.
    pub fn components(&self) -> Option<(f64, f64)> {
        let (a, b) = match self {
            RawPoint::Pair(values) => (values.first().copied()??, values.get(1).copied()??),
            RawPoint::Named(point) => (point.lat?, point.lng?),
            RawPoint::Other(_) => return None,
        };
        (a.is_finite() && b.is_finite()).then_some((a, b))
    }
}

impl From<Coordinate> for RawPoint {
    fn from(coord: Coordinate) -> Self {
        RawPoint::pair(coord.lat, coord.lng)
    }
}

// ========== ORDERS ==========

/// Order lifecycle status as stored by the order service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Pending,
    Confirmed,
    Accepted,
    Preparing,
    Ready,
    Delivering,
    Completed,
    Done,
    Delivered,
    #[serde(alias = "canceled")]
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Coarse grouping of [`OrderStatus`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStage {
    Placed,
    Preparing,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn stage(self) -> OrderStage {
        match self {
            OrderStatus::New | OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Unknown => {
                OrderStage::Placed
            }
            OrderStatus::Accepted | OrderStatus::Preparing | OrderStatus::Ready => OrderStage::Preparing,
            OrderStatus::Delivering => OrderStage::Delivering,
            OrderStatus::Completed | OrderStatus::Done | OrderStatus::Delivered => OrderStage::Completed,
            OrderStatus::Cancelled => OrderStage::Cancelled,
        }
    }

    /// Drone is airborne with the order.
    pub fn is_in_flight(self) -> bool {
        self == OrderStatus::Delivering
    }

    pub fn is_completed(self) -> bool {
        self.stage() == OrderStage::Completed
    }

    /// Completed or cancelled; no further transitions.
    pub fn is_final(self) -> bool {
        matches!(self.stage(), OrderStage::Completed | OrderStage::Cancelled)
    }

    /// Position along the happy path; cancellation sits outside it.
    pub fn rank(self) -> u8 {
        match self.stage() {
            OrderStage::Placed => 0,
            OrderStage::Preparing => 1,
            OrderStage::Delivering => 2,
            OrderStage::Completed | OrderStage::Cancelled => 3,
        }
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Same-stage moves are allowed (`accepted` -> `ready`), cancellation is
    /// allowed from any non-final stage, and final states never move.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_final() {
            return false;
        }
        if next == OrderStatus::Cancelled {
            return true;
        }
        next.rank() >= self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Done => "done",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub price: f64,
}

fn default_quantity() -> u32 {
    1
}

/// An order as held by the external order store.
///
/// Only `status` is ever written by the tracker; every other field is carried
/// through untouched, including fields this crate does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub drone_mission_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Order {
    pub fn new(id: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            id: id.into(),
            status,
            drone_mission_id: None,
            address: None,
            items: Vec::new(),
            merchant_id: None,
            updated_at: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_mission(mut self, mission_id: impl Into<String>) -> Self {
        self.drone_mission_id = Some(mission_id.into());
        self
    }
}

// ========== MISSIONS ==========

/// Mission status vocabulary used by the drone mission records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    #[default]
    Queued,
    Preflight,
    Ready,
    Pickup,
    Waiting,
    InProgress,
    Delivering,
    Flight,
    Takeoff,
    Enroute,
    Descending,
    Returning,
    Dropoff,
    Landed,
    Delivered,
    Completed,
    Failed,
    #[serde(alias = "canceled")]
    Cancelled,
    Error,
    #[serde(other)]
    Unknown,
}

/// Coarse grouping of [`MissionStatus`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionPhase {
    Queued,
    InFlight,
    Arrived,
    Failed,
    Unknown,
}

impl MissionStatus {
    pub fn phase(self) -> MissionPhase {
        match self {
            MissionStatus::Queued
            | MissionStatus::Preflight
            | MissionStatus::Ready
            | MissionStatus::Pickup
            | MissionStatus::Waiting => MissionPhase::Queued,
            MissionStatus::InProgress
            | MissionStatus::Delivering
            | MissionStatus::Flight
            | MissionStatus::Takeoff
            | MissionStatus::Enroute
            | MissionStatus::Descending
            | MissionStatus::Returning => MissionPhase::InFlight,
            MissionStatus::Dropoff
            | MissionStatus::Landed
            | MissionStatus::Delivered
            | MissionStatus::Completed => MissionPhase::Arrived,
            MissionStatus::Failed | MissionStatus::Cancelled | MissionStatus::Error => {
                MissionPhase::Failed
            }
            MissionStatus::Unknown => MissionPhase::Unknown,
        }
    }
}

/// A planned drone delivery attached to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: MissionStatus,
    /// Planned route; immutable once the mission is created.
    #[serde(default)]
    pub path: Vec<RawPoint>,
    #[serde(default)]
    pub eta: Option<serde_json::Value>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default)]
    pub dropoff_address: Option<String>,
}

impl Mission {
    pub fn new(id: impl Into<String>, path: Vec<RawPoint>) -> Self {
        Self {
            id: id.into(),
            order_id: None,
            status: MissionStatus::default(),
            path,
            eta: None,
            pickup_address: None,
            dropoff_address: None,
        }
    }
}

// ========== TELEMETRY ==========

/// One timestamped position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryPoint {
    pub fn new(coord: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat: coord.lat,
            lng: coord.lng,
            timestamp,
        }
    }

    pub fn now(coord: Coordinate) -> Self {
        Self::new(coord, Utc::now())
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Telemetry record as stored by the order store's feed collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub mission_id: String,
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&TelemetryRecord> for TelemetryPoint {
    fn from(record: &TelemetryRecord) -> Self {
        Self {
            lat: record.lat,
            lng: record.lng,
            timestamp: record.timestamp,
        }
    }
}

/// Payload of an [`STATUS_CHANGED_EVENT`] notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub status: OrderStatus,
}

// json-server style stores hand out numeric ids for some records.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(serde_json::Number),
}

impl From<IdRepr> for String {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(text) => text,
            IdRepr::Number(number) => number.to_string(),
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer).map(String::from)
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdRepr>::deserialize(deserializer)?
        .map(String::from)
        .filter(|id| !id.is_empty()))
}
