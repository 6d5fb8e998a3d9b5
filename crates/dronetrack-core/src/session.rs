//! Synchronous state of one tracking session.
//!
//! Every telemetry append goes through [`TrackingSession::ingest`], which
//! recomputes metrics and runs arrival detection against the point it just
//! stored, so neither ever sees a stale latest position.

use chrono::Utc;
use serde::Serialize;

use crate::arrival::{Arrival, ArrivalBridge, ArrivalState};
use crate::metrics::DeliveryMetrics;
use crate::models::{
    Coordinate, Mission, MissionPhase, MissionStatus, Order, OrderStatus, RawPoint, StatusChange,
    TelemetryPoint,
};
use crate::normalize::normalize_path_smart;
use crate::params::TrackingParams;
use crate::telemetry::TelemetryStore;

/// Result of the one arrival a session can produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub arrival: Arrival,
    pub change: StatusChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub metrics: DeliveryMetrics,
    pub completion: Option<Completion>,
}

/// Serializable view state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub order_id: String,
    pub order_status: OrderStatus,
    pub mission_id: Option<String>,
    pub mission_status: Option<MissionStatus>,
    pub mission_phase: Option<MissionPhase>,
    pub path: Vec<Coordinate>,
    pub latest: Option<TelemetryPoint>,
    pub telemetry_points: usize,
    pub metrics: DeliveryMetrics,
    pub arrival: ArrivalState,
}

#[derive(Debug, Clone)]
pub struct TrackingSession {
    order: Order,
    mission: Option<Mission>,
    params: TrackingParams,
    path: Vec<Coordinate>,
    telemetry: TelemetryStore,
    bridge: ArrivalBridge,
    metrics: DeliveryMetrics,
}

impl TrackingSession {
    pub fn new(order: Order, mission: Option<Mission>, params: TrackingParams) -> Self {
        let raw_path = mission.as_ref().map(|m| m.path.as_slice()).unwrap_or_default();
        let path = normalize_path_smart(raw_path, None, &params.bounds);

        let mut telemetry = TelemetryStore::new();
        telemetry.seed_from_path(&path, order.status);

        let bridge = ArrivalBridge::new(params.arrival_threshold_m);
        let metrics = DeliveryMetrics::compute(telemetry.points(), &path, params.assumed_speed_kmh);

        Self {
            order,
            mission,
            params,
            path,
            telemetry,
            bridge,
            metrics,
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn mission(&self) -> Option<&Mission> {
        self.mission.as_ref()
    }

    pub fn params(&self) -> &TrackingParams {
        &self.params
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn destination(&self) -> Option<Coordinate> {
        self.path.last().copied()
    }

    pub fn telemetry(&self) -> &TelemetryStore {
        &self.telemetry
    }

    pub fn metrics(&self) -> &DeliveryMetrics {
        &self.metrics
    }

    pub fn arrival_state(&self) -> ArrivalState {
        self.bridge.state()
    }

    /// Append a point, refresh metrics, and check for arrival.
    pub fn ingest(&mut self, point: TelemetryPoint) -> IngestOutcome {
        self.telemetry.append(point);
        self.recompute();

        let destination = self.destination();
        let completion = self
            .bridge
            .observe(point.coordinate(), destination, self.order.status)
            .map(|arrival| {
                tracing::info!(
                    order_id = %self.order.id,
                    distance_m = arrival.distance_m,
                    "drone within arrival threshold, completing order"
                );
                self.order.status = OrderStatus::Completed;
                self.order.updated_at = Some(Utc::now());
                Completion {
                    arrival,
                    change: StatusChange {
                        id: self.order.id.clone(),
                        status: OrderStatus::Completed,
                    },
                }
            });

        IngestOutcome {
            metrics: self.metrics,
            completion,
        }
    }

    /// Reconcile a status change published by another view.
    ///
    /// Returns `true` when the local copy changed. Changes for other orders
    /// and regressions are ignored.
    pub fn apply_status(&mut self, change: &StatusChange) -> bool {
        if change.id != self.order.id {
            return false;
        }
        self.advance_status(change.status)
    }

    /// Move the local order forward, refusing regressions.
    pub fn advance_status(&mut self, status: OrderStatus) -> bool {
        if self.order.status == status || !self.order.status.can_advance_to(status) {
            return false;
        }
        tracing::debug!(
            order_id = %self.order.id,
            from = %self.order.status,
            to = %status,
            "order status updated"
        );
        self.order.status = status;
        self.order.updated_at = Some(Utc::now());
        true
    }

    /// Replace the mission path and recompute everything derived from it.
    pub fn set_path(&mut self, raw: &[RawPoint]) {
        self.path = normalize_path_smart(raw, None, &self.params.bounds);
        if let Some(mission) = self.mission.as_mut() {
            mission.path = raw.to_vec();
        }
        self.telemetry.seed_from_path(&self.path, self.order.status);
        self.recompute();
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            order_id: self.order.id.clone(),
            order_status: self.order.status,
            mission_id: self.mission.as_ref().map(|m| m.id.clone()),
            mission_status: self.mission.as_ref().map(|m| m.status),
            mission_phase: self.mission.as_ref().map(|m| m.status.phase()),
            path: self.path.clone(),
            latest: self.telemetry.latest().copied(),
            telemetry_points: self.telemetry.len(),
            metrics: self.metrics,
            arrival: self.bridge.state(),
        }
    }

    fn recompute(&mut self) {
        self.metrics = DeliveryMetrics::compute(
            self.telemetry.points(),
            &self.path,
            self.params.assumed_speed_kmh,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackCursor;

    fn delivering_session() -> TrackingSession {
        let mission = Mission::new(
            "m-1",
            vec![RawPoint::pair(10.7769, 106.7008), RawPoint::pair(10.8010, 106.6532)],
        );
        let order = Order::new("o-1", OrderStatus::Delivering).with_mission("m-1");
        TrackingSession::new(order, Some(mission), TrackingParams::default())
    }

    #[test]
    fn new_session_is_seeded_at_origin() {
        let session = delivering_session();
        assert_eq!(session.telemetry().len(), 1);
        assert_eq!(
            session.telemetry().latest().unwrap().coordinate(),
            Coordinate::new(10.7769, 106.7008)
        );
        assert!(session.metrics().remaining_km.unwrap() > 5.0);
        assert!(session.metrics().eta_minutes.is_some());
    }

    #[test]
    fn real_fix_replaces_the_seeded_origin() {
        let mut session = delivering_session();
        assert!(session.telemetry().is_seeded());

        let fix = TelemetryPoint::new(
            Coordinate::new(10.79, 106.675),
            Utc::now() - chrono::Duration::seconds(30),
        );
        session.ingest(fix);

        assert_eq!(session.telemetry().points(), &[fix]);
        assert_eq!(session.metrics().traveled_km, 0.0);
        assert!(session.metrics().remaining_km.unwrap() < 3.5);
    }

    #[test]
    fn playback_to_destination_completes_once() {
        let mut session = delivering_session();
        let params = session.params().clone();
        let mut cursor =
            PlaybackCursor::for_path(session.path(), params.steps_per_segment, &params.default_route);

        let mut completions = 0;
        session.ingest(TelemetryPoint::now(cursor.current().unwrap()));
        while let Some(point) = cursor.advance() {
            if session.ingest(TelemetryPoint::now(point)).completion.is_some() {
                completions += 1;
            }
        }
        // Repeat the destination a few more times.
        for _ in 0..3 {
            let dest = session.destination().unwrap();
            if session.ingest(TelemetryPoint::now(dest)).completion.is_some() {
                completions += 1;
            }
        }

        assert_eq!(completions, 1);
        assert_eq!(session.order().status, OrderStatus::Completed);
        assert_eq!(session.arrival_state(), ArrivalState::Triggered);
        let last = session.telemetry().latest().unwrap().coordinate();
        assert!((last.lat - 10.8010).abs() < 1e-9 && (last.lng - 106.6532).abs() < 1e-9);
        assert_eq!(session.metrics().eta_minutes, Some(0));
    }

    #[test]
    fn apply_status_ignores_other_orders_and_regressions() {
        let mut session = delivering_session();
        assert!(!session.apply_status(&StatusChange {
            id: "other".into(),
            status: OrderStatus::Completed,
        }));
        assert!(!session.apply_status(&StatusChange {
            id: "o-1".into(),
            status: OrderStatus::Ready,
        }));
        assert!(session.apply_status(&StatusChange {
            id: "o-1".into(),
            status: OrderStatus::Completed,
        }));
        assert!(!session.apply_status(&StatusChange {
            id: "o-1".into(),
            status: OrderStatus::Completed,
        }));
    }

    #[test]
    fn completed_orders_never_trigger() {
        let mission = Mission::new(
            "m-1",
            vec![RawPoint::pair(10.7769, 106.7008), RawPoint::pair(10.8010, 106.6532)],
        );
        let order = Order::new("o-1", OrderStatus::Completed);
        let mut session = TrackingSession::new(order, Some(mission), TrackingParams::default());

        // Review mode: seeded at the destination.
        assert_eq!(session.metrics().remaining_km, Some(0.0));
        let outcome = session.ingest(TelemetryPoint::now(Coordinate::new(10.8010, 106.6532)));
        assert!(outcome.completion.is_none());
        assert_eq!(session.arrival_state(), ArrivalState::Armed);
    }

    #[test]
    fn set_path_recomputes_metrics() {
        let order = Order::new("o-1", OrderStatus::Ready);
        let mut session = TrackingSession::new(order, None, TrackingParams::default());
        assert!(session.path().is_empty());
        assert!(session.telemetry().is_empty());
        assert_eq!(session.metrics().total_km, 0.0);

        session.set_path(&[RawPoint::pair(106.7008, 10.7769), RawPoint::pair(10.8010, 106.6532)]);
        assert_eq!(session.path()[0], Coordinate::new(10.7769, 106.7008));
        assert_eq!(session.telemetry().len(), 1);
        assert!(session.metrics().total_km > 5.0);
    }
}
