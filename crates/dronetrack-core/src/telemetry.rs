//! In-memory telemetry sequence for one tracking session.

use chrono::{DateTime, Utc};

use crate::models::{Coordinate, OrderStatus, TelemetryPoint};

/// Append-only, chronologically ordered positions observed in a session.
///
/// The store may hold a single synthetic placeholder (see
/// [`TelemetryStore::seed_from_path`]) until the first observed position
/// arrives and replaces it.
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    points: Vec<TelemetryPoint>,
    seeded: bool,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observed position. No deduplication. Replaces the placeholder
    /// seed, if any.
    pub fn append(&mut self, point: TelemetryPoint) {
        if std::mem::take(&mut self.seeded) {
            self.points.clear();
        }
        self.points.push(point);
    }

    /// Only the synthetic placeholder is held.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn latest(&self) -> Option<&TelemetryPoint> {
        self.points.last()
    }

    pub fn points(&self) -> &[TelemetryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points strictly newer than the latest observed one. Everything passes
    /// while only the placeholder seed is held.
    pub fn newer_than_latest<'a>(
        &self,
        candidates: &'a [TelemetryPoint],
    ) -> impl Iterator<Item = &'a TelemetryPoint> + 'a {
        let cutoff: Option<DateTime<Utc>> = if self.seeded {
            None
        } else {
            self.latest().map(|p| p.timestamp)
        };
        candidates
            .iter()
            .filter(move |p| cutoff.map_or(true, |cutoff| p.timestamp > cutoff))
    }

    /// Seed one renderable placeholder when the session has no positions yet.
    ///
    /// Completed orders show the drone at the destination; everything else
    /// starts it at the origin. Does nothing if the store already holds points
    /// or the path is empty. The first [`append`](Self::append) discards it.
    pub fn seed_from_path(&mut self, path: &[Coordinate], order_status: OrderStatus) -> bool {
        if !self.points.is_empty() {
            return false;
        }
        let seed = if order_status.is_completed() {
            path.last()
        } else {
            path.first()
        };
        match seed {
            Some(coord) => {
                self.points.push(TelemetryPoint::now(*coord));
                self.seeded = true;
                true
            }
            None => false,
        }
    }
}
