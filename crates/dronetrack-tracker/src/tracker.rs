//! Live tracking of one order: playback and polling timers around a
//! [`TrackingSession`], with the arrival side effects.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use dronetrack_client::OrderStore;
use dronetrack_core::{
    Completion, OrderStatus, PlaybackCursor, StatusChange, TelemetryPoint, TrackerSnapshot,
    TrackingParams, TrackingSession,
};

use crate::{StatusNotifier, TimerGuard, TrackerError};

/// Who is looking at the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Customer,
    Merchant,
    Admin,
}

impl Viewer {
    /// Only operators may start or stop the simulated flight.
    pub fn can_control_playback(self) -> bool {
        matches!(self, Viewer::Merchant | Viewer::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Viewer::Customer => "customer",
            Viewer::Merchant => "merchant",
            Viewer::Admin => "admin",
        }
    }
}

impl fmt::Display for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Viewer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Viewer::Customer),
            "merchant" => Ok(Viewer::Merchant),
            "admin" => Ok(Viewer::Admin),
            other => Err(format!("unknown viewer role: {other}")),
        }
    }
}

/// Result of [`Tracker::start_playback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStart {
    /// A playback timer is running.
    Started,
    /// The order is already completed or cancelled.
    Skipped,
    /// The very first point was within the arrival threshold.
    Arrived,
}

/// A tracking session plus the timers that feed it.
///
/// Dropping the tracker (or calling [`Tracker::close`]) releases every timer
/// and makes late responses from in-flight requests no-ops.
pub struct Tracker {
    shared: Arc<Shared>,
}

struct Shared {
    session_id: Uuid,
    viewer: Viewer,
    span: tracing::Span,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn StatusNotifier>,
    session: Mutex<TrackingSession>,
    alive: AtomicBool,
    playback: Mutex<Option<TimerGuard>>,
    poller: Mutex<Option<TimerGuard>>,
    listener: Mutex<Option<TimerGuard>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Tracker {
    /// Load the order and its mission and start listening for status
    /// changes from other views.
    pub async fn open(
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn StatusNotifier>,
        params: TrackingParams,
        order_id: &str,
        viewer: Viewer,
    ) -> Result<Self, TrackerError> {
        params.validate()?;

        let order = store
            .fetch_order(order_id)
            .await
            .map_err(|source| TrackerError::Load {
                what: "order",
                source,
            })?;
        let mission = store
            .resolve_mission(&order)
            .await
            .map_err(|source| TrackerError::Load {
                what: "mission",
                source,
            })?;
        if mission.is_none() {
            tracing::warn!(order_id, "order has no drone mission, playback uses the default route");
        }

        let session = TrackingSession::new(order, mission, params);
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("tracker", %session_id, order_id);
        span.in_scope(|| {
            tracing::info!(
                %viewer,
                status = %session.order().status,
                path_points = session.path().len(),
                "tracking session opened"
            );
        });

        let shared = Arc::new(Shared {
            session_id,
            viewer,
            span,
            store,
            notifier,
            session: Mutex::new(session),
            alive: AtomicBool::new(true),
            playback: Mutex::new(None),
            poller: Mutex::new(None),
            listener: Mutex::new(None),
        });

        let rx = shared.notifier.subscribe();
        let listener = TimerGuard::spawn(
            "status-listener",
            listen(shared.clone(), rx).instrument(shared.span.clone()),
        );
        *lock(&shared.listener) = Some(listener);

        Ok(Self { shared })
    }

    pub fn session_id(&self) -> Uuid {
        self.shared.session_id
    }

    pub fn viewer(&self) -> Viewer {
        self.shared.viewer
    }

    pub fn order_status(&self) -> OrderStatus {
        self.shared.order_status()
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        lock(&self.shared.session).snapshot()
    }

    /// Fly the simulated drone along the mission path.
    ///
    /// Restarting while a playback is active resets it to the origin; there
    /// is never more than one playback timer per tracker.
    pub async fn start_playback(&self) -> Result<PlaybackStart, TrackerError> {
        let shared = &self.shared;
        if !shared.viewer.can_control_playback() {
            return Err(TrackerError::NotAuthorized(shared.viewer));
        }

        let (order_id, status) = {
            let session = lock(&shared.session);
            (session.order().id.clone(), session.order().status)
        };
        if status.is_final() {
            tracing::info!(parent: &shared.span, %status, "order closed, playback not started");
            return Ok(PlaybackStart::Skipped);
        }

        if !status.is_in_flight() {
            shared
                .store
                .update_order_status(&order_id, OrderStatus::Delivering)
                .await
                .map_err(TrackerError::StartDelivery)?;
            let change = StatusChange {
                id: order_id,
                status: OrderStatus::Delivering,
            };
            lock(&shared.session).apply_status(&change);
            shared.notifier.publish(change);
        }
        if !shared.order_status().is_in_flight() {
            // Closed by another view while the update was in flight.
            return Ok(PlaybackStart::Skipped);
        }

        shared.stop_playback();

        let (mut cursor, tick) = {
            let session = lock(&shared.session);
            let params = session.params();
            (
                PlaybackCursor::for_path(
                    session.path(),
                    params.steps_per_segment,
                    &params.default_route,
                ),
                params.tick_interval(),
            )
        };
        let Some(first) = cursor.current() else {
            return Ok(PlaybackStart::Skipped);
        };
        tracing::info!(
            parent: &shared.span,
            route_points = cursor.route().len(),
            tick_ms = tick.as_millis() as u64,
            "playback started"
        );

        if let Some(completion) = shared.ingest(TelemetryPoint::now(first)) {
            shared.complete(completion).await;
            return Ok(PlaybackStart::Arrived);
        }

        let guard = TimerGuard::spawn(
            "playback",
            play(shared.clone(), cursor, tick).instrument(shared.span.clone()),
        );
        *lock(&shared.playback) = Some(guard);
        Ok(PlaybackStart::Started)
    }

    /// Stop the simulated flight; the last position stays in the session.
    pub fn stop_playback(&self) {
        self.shared.stop_playback();
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.shared.playback)
            .as_ref()
            .is_some_and(|guard| !guard.is_finished())
    }

    /// Poll the store's telemetry feed for the mission.
    pub fn start_polling(&self) -> Result<(), TrackerError> {
        let (mission_id, period) = {
            let session = lock(&self.shared.session);
            let mission_id = session
                .mission()
                .map(|mission| mission.id.clone())
                .ok_or_else(|| TrackerError::NoMission(session.order().id.clone()))?;
            (mission_id, session.params().poll_interval())
        };

        let guard = TimerGuard::spawn(
            "telemetry-poll",
            poll(self.shared.clone(), mission_id, period).instrument(self.shared.span.clone()),
        );
        *lock(&self.shared.poller) = Some(guard);
        Ok(())
    }

    pub fn stop_polling(&self) {
        if let Some(guard) = lock(&self.shared.poller).take() {
            guard.release();
        }
    }

    /// Feed one externally received position into the session.
    pub async fn record_telemetry(&self, point: TelemetryPoint) {
        if let Some(completion) = self.shared.ingest(point) {
            self.shared.complete(completion).await;
            self.shared.stop_playback();
        }
    }

    /// End the session; same as dropping the tracker.
    pub fn close(self) {}
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl Shared {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn order_status(&self) -> OrderStatus {
        lock(&self.session).order().status
    }

    fn ingest(&self, point: TelemetryPoint) -> Option<Completion> {
        let outcome = lock(&self.session).ingest(point);
        tracing::debug!(
            lat = point.lat,
            lng = point.lng,
            remaining_km = ?outcome.metrics.remaining_km,
            eta_minutes = ?outcome.metrics.eta_minutes,
            "telemetry ingested"
        );
        outcome.completion
    }

    /// Persist and announce an arrival. The local order is already
    /// completed, so a failed update only gets logged.
    async fn complete(&self, completion: Completion) {
        let change = completion.change;
        match self.store.update_order_status(&change.id, change.status).await {
            Ok(_) => tracing::info!(
                distance_m = completion.arrival.distance_m,
                "delivery completed"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                "failed to persist delivery completion, keeping local status"
            ),
        }
        self.notifier.publish(change);
    }

    fn stop_playback(&self) {
        if let Some(guard) = lock(&self.playback).take() {
            if !guard.is_finished() {
                tracing::info!(parent: &self.span, "playback stopped");
            }
            guard.release();
        }
    }

    fn reconcile(&self, change: &StatusChange) {
        let status = {
            let mut session = lock(&self.session);
            if !session.apply_status(change) {
                return;
            }
            session.order().status
        };
        tracing::info!(%status, "status reconciled from another view");
        if !status.is_in_flight() {
            self.stop_playback();
        }
    }

    fn shutdown(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }
        for slot in [&self.playback, &self.poller, &self.listener] {
            if let Some(guard) = lock(slot).take() {
                guard.release();
            }
        }
        tracing::info!(parent: &self.span, "tracking session closed");
    }
}

async fn listen(shared: Arc<Shared>, mut rx: broadcast::Receiver<StatusChange>) {
    loop {
        match rx.recv().await {
            Ok(change) => {
                if !shared.is_alive() {
                    break;
                }
                shared.reconcile(&change);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "status listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn play(shared: Arc<Shared>, mut cursor: PlaybackCursor, tick: Duration) {
    // First point was emitted by start_playback.
    let mut ticker = time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !shared.is_alive() {
            break;
        }
        if !shared.order_status().is_in_flight() {
            tracing::debug!("order no longer delivering, playback ends");
            break;
        }
        let Some(next) = cursor.advance() else {
            tracing::info!("playback reached the end of the route");
            break;
        };
        if let Some(completion) = shared.ingest(TelemetryPoint::now(next)) {
            shared.complete(completion).await;
            break;
        }
    }
}

async fn poll(shared: Arc<Shared>, mission_id: String, period: Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let result = shared.store.fetch_telemetry(&mission_id).await;
        if !shared.is_alive() {
            tracing::debug!("session closed, discarding telemetry response");
            break;
        }
        let points = match result {
            Ok(points) => points,
            Err(err) => {
                tracing::warn!(mission_id, error = %err, "telemetry poll failed");
                continue;
            }
        };

        let completion = {
            let mut session = lock(&shared.session);
            let fresh: Vec<TelemetryPoint> =
                session.telemetry().newer_than_latest(&points).copied().collect();
            if !fresh.is_empty() {
                tracing::debug!(count = fresh.len(), "new telemetry from feed");
            }
            let completion = fresh
                .into_iter()
                .filter_map(|point| session.ingest(point).completion)
                .last();
            completion
        };
        if let Some(completion) = completion {
            shared.complete(completion).await;
            shared.stop_playback();
        }
    }
}
