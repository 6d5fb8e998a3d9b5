//! Simulated playback along a route.
//!
//! The runtime owns the timer; this module only decides which point comes
//! next.

use crate::models::Coordinate;
use crate::params::DefaultRoute;
use crate::spatial::interpolate;

/// Route to fly: the normalized path, or the default route when the path has
/// fewer than two usable points.
pub fn playback_waypoints(path: &[Coordinate], fallback: &DefaultRoute) -> Vec<Coordinate> {
    let usable: Vec<Coordinate> = path.iter().copied().filter(Coordinate::is_valid).collect();
    if usable.len() >= 2 {
        return usable;
    }
    tracing::info!(
        usable = usable.len(),
        "path too short for playback, using default route"
    );
    vec![fallback.origin, fallback.destination]
}

/// Densify a polyline with `steps_per_segment` points per segment.
///
/// Each segment contributes points at `t = i / (steps - 1)`, so both segment
/// ends are included and the result has `(n - 1) * steps` points starting at
/// the first waypoint and ending at the last.
pub fn build_dense_route(waypoints: &[Coordinate], steps_per_segment: usize) -> Vec<Coordinate> {
    let steps = steps_per_segment.max(2);
    let mut route = Vec::with_capacity(waypoints.len().saturating_sub(1) * steps);
    for leg in waypoints.windows(2) {
        let (from, to) = (leg[0], leg[1]);
        for i in 0..steps {
            let t = i as f64 / (steps - 1) as f64;
            route.push(interpolate(from, to, t));
        }
    }
    route
}

/// Cursor over a dense route.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    route: Vec<Coordinate>,
    position: usize,
}

impl PlaybackCursor {
    pub fn new(route: Vec<Coordinate>) -> Self {
        Self { route, position: 0 }
    }

    /// Build the cursor for a normalized path, applying the short-path
    /// fallback.
    pub fn for_path(path: &[Coordinate], steps_per_segment: usize, fallback: &DefaultRoute) -> Self {
        let waypoints = playback_waypoints(path, fallback);
        Self::new(build_dense_route(&waypoints, steps_per_segment))
    }

    /// Point under the cursor; emitted immediately when playback starts.
    pub fn current(&self) -> Option<Coordinate> {
        self.route.get(self.position).copied()
    }

    /// Move one step forward and return the new point, or `None` at the end.
    pub fn advance(&mut self) -> Option<Coordinate> {
        if self.position + 1 >= self.route.len() {
            self.position = self.route.len();
            return None;
        }
        self.position += 1;
        self.route.get(self.position).copied()
    }

    pub fn is_finished(&self) -> bool {
        self.position + 1 >= self.route.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn route(&self) -> &[Coordinate] {
        &self.route
    }
}
