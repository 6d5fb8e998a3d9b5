//! Tracker timers under paused tokio time against an in-memory store.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dronetrack_client::{OrderStore, StoreError};
use dronetrack_core::{
    ArrivalState, Coordinate, Mission, Order, OrderStatus, RawPoint, StatusChange, TelemetryPoint,
    TrackingParams,
};
use dronetrack_tracker::{
    LocalStatusBus, PlaybackStart, StatusNotifier, Tracker, TrackerError, Viewer,
};

const ORIGIN: Coordinate = Coordinate::new(10.7769, 106.7008);
const DESTINATION: Coordinate = Coordinate::new(10.8010, 106.6532);

#[derive(Default)]
struct MemoryStore {
    orders: Mutex<HashMap<String, Order>>,
    missions: Mutex<Vec<Mission>>,
    telemetry: Mutex<Vec<TelemetryPoint>>,
    patches: Mutex<Vec<(String, OrderStatus)>>,
    fail_completion: AtomicBool,
}

impl MemoryStore {
    fn with_order(order: Order, mission: Option<Mission>) -> Arc<Self> {
        let store = Self::default();
        store.orders.lock().unwrap().insert(order.id.clone(), order);
        store.missions.lock().unwrap().extend(mission);
        Arc::new(store)
    }

    fn patches_to(&self, status: OrderStatus) -> usize {
        self.patches
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| *s == status)
            .count()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn fetch_order(&self, order_id: &str) -> Result<Order, StoreError> {
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", order_id))
    }

    async fn fetch_mission(&self, mission_id: &str) -> Result<Mission, StoreError> {
        self.missions
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == mission_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("mission", mission_id))
    }

    async fn fetch_mission_for_order(&self, order_id: &str) -> Result<Option<Mission>, StoreError> {
        Ok(self
            .missions
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        self.patches
            .lock()
            .unwrap()
            .push((order_id.to_string(), status));
        if status == OrderStatus::Completed && self.fail_completion.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                url: format!("memory://orders/{order_id}"),
            });
        }
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        order.status = status;
        order.updated_at = Some(Utc::now());
        Ok(order.clone())
    }

    async fn fetch_telemetry(&self, _mission_id: &str) -> Result<Vec<TelemetryPoint>, StoreError> {
        Ok(self.telemetry.lock().unwrap().clone())
    }
}

fn mission(path: Vec<RawPoint>) -> Mission {
    let mut mission = Mission::new("m-1", path);
    mission.order_id = Some("o-1".into());
    mission
}

fn scenario_mission() -> Mission {
    mission(vec![RawPoint::from(ORIGIN), RawPoint::from(DESTINATION)])
}

async fn open(
    store: Arc<MemoryStore>,
    bus: &Arc<LocalStatusBus>,
    viewer: Viewer,
) -> Result<Tracker, TrackerError> {
    Tracker::open(store, bus.clone(), TrackingParams::default(), "o-1", viewer).await
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StatusChange>) -> Vec<StatusChange> {
    let mut changes = Vec::new();
    while let Ok(change) = rx.try_recv() {
        changes.push(change);
    }
    changes
}

fn assert_near(actual: Coordinate, expected: Coordinate) {
    assert!((actual.lat - expected.lat).abs() < 1e-9, "{actual:?} != {expected:?}");
    assert!((actual.lng - expected.lng).abs() < 1e-9, "{actual:?} != {expected:?}");
}

#[tokio::test(start_paused = true)]
async fn playback_flies_to_destination_and_completes_once() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let mut rx = bus.subscribe();
    let tracker = open(store.clone(), &bus, Viewer::Merchant).await.unwrap();

    assert_eq!(tracker.start_playback().await.unwrap(), PlaybackStart::Started);
    assert!(tracker.is_playing());

    // 20 dense points: one immediately, 19 more at 600ms.
    tokio::time::sleep(Duration::from_millis(19 * 600 + 300)).await;

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.order_status, OrderStatus::Completed);
    assert_eq!(snapshot.arrival, ArrivalState::Triggered);
    assert_near(snapshot.latest.unwrap().coordinate(), DESTINATION);
    assert_eq!(snapshot.metrics.eta_minutes, Some(0));
    assert!(!tracker.is_playing());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.patches_to(OrderStatus::Completed), 1);
    let completions: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|c| c.status == OrderStatus::Completed)
        .collect();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].id, "o-1");
}

#[tokio::test(start_paused = true)]
async fn restarting_playback_keeps_a_single_timer() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store, &bus, Viewer::Admin).await.unwrap();
    let seeded = tracker.snapshot().telemetry_points;
    assert_eq!(seeded, 1);

    tracker.start_playback().await.unwrap();
    tracker.start_playback().await.unwrap();

    tokio::time::sleep(Duration::from_millis(5 * 600 + 300)).await;
    // The first immediate point replaces the seed, then five ticks from one timer.
    assert_eq!(tracker.snapshot().telemetry_points, 2 + 5);
}

#[tokio::test(start_paused = true)]
async fn stop_playback_freezes_the_drone() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store, &bus, Viewer::Merchant).await.unwrap();

    tracker.start_playback().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    tracker.stop_playback();
    assert!(!tracker.is_playing());

    let frozen = tracker.snapshot();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(tracker.snapshot().telemetry_points, frozen.telemetry_points);
    assert_eq!(tracker.order_status(), OrderStatus::Delivering);
}

#[tokio::test(start_paused = true)]
async fn missing_path_falls_back_to_default_route() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(mission(vec![])),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store.clone(), &bus, Viewer::Merchant).await.unwrap();
    assert_eq!(tracker.snapshot().telemetry_points, 0);

    tracker.start_playback().await.unwrap();
    let first = tracker.snapshot().latest.unwrap();
    assert_near(first.coordinate(), ORIGIN);

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.telemetry_points, 20);
    assert_near(snapshot.latest.unwrap().coordinate(), DESTINATION);
    // No destination on the mission, so nothing to arrive at.
    assert_eq!(snapshot.order_status, OrderStatus::Delivering);
    assert_eq!(snapshot.metrics.remaining_km, None);
    assert_eq!(store.patches_to(OrderStatus::Completed), 0);
}

#[tokio::test(start_paused = true)]
async fn closed_orders_do_not_play() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Completed).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store.clone(), &bus, Viewer::Merchant).await.unwrap();

    // Completed orders show the drone at the destination.
    assert_near(tracker.snapshot().latest.unwrap().coordinate(), DESTINATION);

    assert_eq!(tracker.start_playback().await.unwrap(), PlaybackStart::Skipped);
    assert!(!tracker.is_playing());
    assert!(store.patches.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn customers_cannot_start_playback() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store, &bus, Viewer::Customer).await.unwrap();

    let err = tracker.start_playback().await.unwrap_err();
    assert!(matches!(err, TrackerError::NotAuthorized(Viewer::Customer)));
    assert!(!tracker.is_playing());
}

#[tokio::test(start_paused = true)]
async fn playback_moves_ready_orders_to_delivering_first() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Ready),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let mut rx = bus.subscribe();
    let tracker = open(store.clone(), &bus, Viewer::Merchant).await.unwrap();
    assert_eq!(tracker.snapshot().mission_id.as_deref(), Some("m-1"));

    tracker.start_playback().await.unwrap();

    assert_eq!(tracker.order_status(), OrderStatus::Delivering);
    assert_eq!(store.patches_to(OrderStatus::Delivering), 1);
    let changes = drain(&mut rx);
    assert_eq!(changes[0].status, OrderStatus::Delivering);
}

#[tokio::test(start_paused = true)]
async fn failed_completion_update_keeps_local_status() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    store.fail_completion.store(true, Ordering::SeqCst);
    let bus = Arc::new(LocalStatusBus::new());
    let mut rx = bus.subscribe();
    let tracker = open(store.clone(), &bus, Viewer::Merchant).await.unwrap();

    tracker.start_playback().await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(tracker.order_status(), OrderStatus::Completed);
    assert!(!tracker.is_playing());
    assert_eq!(store.patches_to(OrderStatus::Completed), 1);
    assert_eq!(
        store.orders.lock().unwrap()["o-1"].status,
        OrderStatus::Delivering
    );
    assert!(drain(&mut rx)
        .iter()
        .any(|c| c.status == OrderStatus::Completed));
}

#[tokio::test(start_paused = true)]
async fn completion_from_another_view_stops_playback() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store.clone(), &bus, Viewer::Merchant).await.unwrap();
    tracker.start_playback().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1300)).await;

    bus.publish(StatusChange {
        id: "o-1".into(),
        status: OrderStatus::Completed,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(tracker.order_status(), OrderStatus::Completed);
    assert!(!tracker.is_playing());
    assert_eq!(store.patches_to(OrderStatus::Completed), 0);

    // Regressions and other orders are ignored.
    bus.publish(StatusChange {
        id: "o-1".into(),
        status: OrderStatus::Delivering,
    });
    bus.publish(StatusChange {
        id: "o-2".into(),
        status: OrderStatus::Cancelled,
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(tracker.order_status(), OrderStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn polling_ingests_new_feed_points_and_completes() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store.clone(), &bus, Viewer::Customer).await.unwrap();

    let base = Utc::now();
    let takeoff = TelemetryPoint::new(ORIGIN, base - ChronoDuration::minutes(5));
    let midway = TelemetryPoint::new(
        Coordinate::new(10.79, 106.675),
        base + ChronoDuration::seconds(10),
    );
    store.telemetry.lock().unwrap().extend([takeoff, midway]);

    tracker.start_polling().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.telemetry_points, 2);
    assert_eq!(snapshot.latest.unwrap(), midway);
    assert_eq!(snapshot.order_status, OrderStatus::Delivering);

    store
        .telemetry
        .lock()
        .unwrap()
        .push(TelemetryPoint::new(DESTINATION, base + ChronoDuration::seconds(20)));
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(tracker.snapshot().telemetry_points, 3);
    assert_eq!(tracker.order_status(), OrderStatus::Completed);

    tokio::time::sleep(Duration::from_millis(9000)).await;
    assert_eq!(tracker.snapshot().telemetry_points, 3);
    assert_eq!(store.patches_to(OrderStatus::Completed), 1);
}

#[tokio::test(start_paused = true)]
async fn feed_history_from_before_open_replaces_the_seed() {
    let store = MemoryStore::with_order(
        Order::new("o-1", OrderStatus::Delivering).with_mission("m-1"),
        Some(scenario_mission()),
    );
    let midway = Coordinate::new(10.79, 106.675);
    let fix = TelemetryPoint::new(midway, Utc::now() - ChronoDuration::seconds(30));
    store.telemetry.lock().unwrap().push(fix);

    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store.clone(), &bus, Viewer::Customer).await.unwrap();
    assert_near(tracker.snapshot().latest.unwrap().coordinate(), ORIGIN);

    tracker.start_polling().unwrap();
    tokio::time::sleep(Duration::from_millis(6500)).await;

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.telemetry_points, 1);
    assert_eq!(snapshot.latest.unwrap(), fix);
    assert!(snapshot.metrics.remaining_km.unwrap() < 3.5);
    assert_eq!(snapshot.metrics.traveled_km, 0.0);
}

#[tokio::test(start_paused = true)]
async fn polling_requires_a_mission() {
    let store = MemoryStore::with_order(Order::new("o-1", OrderStatus::Delivering), None);
    let bus = Arc::new(LocalStatusBus::new());
    let tracker = open(store, &bus, Viewer::Merchant).await.unwrap();
    assert!(matches!(
        tracker.start_polling(),
        Err(TrackerError::NoMission(id)) if id == "o-1"
    ));
}

#[tokio::test(start_paused = true)]
async fn unknown_order_fails_to_open() {
    let store = MemoryStore::with_order(Order::new("o-2", OrderStatus::Ready), None);
    let bus = Arc::new(LocalStatusBus::new());
    let err = open(store, &bus, Viewer::Merchant).await.err().unwrap();
    assert!(matches!(err, TrackerError::Load { what: "order", .. }));
}

#[tokio::test(start_paused = true)]
async fn invalid_params_are_rejected() {
    let store = MemoryStore::with_order(Order::new("o-1", OrderStatus::Ready), None);
    let params = TrackingParams {
        steps_per_segment: 1,
        ..TrackingParams::default()
    };
    let err = Tracker::open(store, Arc::new(LocalStatusBus::new()), params, "o-1", Viewer::Admin)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TrackerError::Params(_)));
}

#[test]
fn viewer_roles_parse() {
    assert_eq!("Merchant".parse::<Viewer>(), Ok(Viewer::Merchant));
    assert_eq!("admin".parse::<Viewer>(), Ok(Viewer::Admin));
    assert!("courier".parse::<Viewer>().is_err());
    assert!(!Viewer::Customer.can_control_playback());
}
