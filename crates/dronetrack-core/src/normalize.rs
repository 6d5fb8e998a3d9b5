//! Path normalization.
//!
//! Mission paths come from upstream records that store points as arrays or
//! objects and sometimes transpose latitude and longitude. Each raw point has
//! two readings: as given (A) and swapped (B). Resolution order:
//!
//! 1. exactly one reading lies inside the service bounds: take it;
//! 2. otherwise take whichever reading is closer to a reference point (the
//!    previously resolved point, a caller-supplied start, or failing both
//!    the first later point that resolves by rule 1);
//! 3. otherwise take A.
//!
//! Points without two finite components are dropped. Input order is kept.

use crate::models::{Coordinate, RawPoint};
use crate::spatial::{haversine_distance_km, GeoBounds};

/// Resolve a single raw point.
pub fn normalize_point(
    raw: &RawPoint,
    reference: Option<Coordinate>,
    bounds: &GeoBounds,
) -> Option<Coordinate> {
    let (a, b) = raw.components()?;
    let as_given = Coordinate::new(a, b);
    let swapped = as_given.swapped();

    if let Some(unambiguous) = pick_plausible(as_given, swapped, bounds) {
        return Some(unambiguous);
    }

    match reference.filter(Coordinate::is_valid) {
        Some(reference) => {
            let d_given = haversine_distance_km(as_given, reference);
            let d_swapped = haversine_distance_km(swapped, reference);
            if d_swapped < d_given {
                Some(swapped)
            } else {
                Some(as_given)
            }
        }
        None => Some(as_given),
    }
}

/// Resolve a whole path, chaining each resolved point in as the reference for
/// the next.
pub fn normalize_path_smart(
    raw: &[RawPoint],
    start_reference: Option<Coordinate>,
    bounds: &GeoBounds,
) -> Vec<Coordinate> {
    let mut resolved = Vec::with_capacity(raw.len());
    let mut reference = start_reference.filter(Coordinate::is_valid);

    for (index, point) in raw.iter().enumerate() {
        let reference_for_point = match reference {
            Some(reference) => Some(reference),
            None if is_ambiguous(point, bounds) => lookahead_reference(&raw[index + 1..], bounds),
            None => None,
        };

        match normalize_point(point, reference_for_point, bounds) {
            Some(coord) => {
                resolved.push(coord);
                reference = Some(coord);
            }
            None => {
                tracing::debug!(index, "dropping unresolvable path point");
            }
        }
    }

    resolved
}

fn pick_plausible(as_given: Coordinate, swapped: Coordinate, bounds: &GeoBounds) -> Option<Coordinate> {
    match (bounds.contains(as_given), bounds.contains(swapped)) {
        (true, false) => Some(as_given),
        (false, true) => Some(swapped),
        _ => None,
    }
}

fn is_ambiguous(raw: &RawPoint, bounds: &GeoBounds) -> bool {
    match raw.components() {
        Some((a, b)) => {
            let as_given = Coordinate::new(a, b);
            pick_plausible(as_given, as_given.swapped(), bounds).is_none()
        }
        None => false,
    }
}

fn lookahead_reference(rest: &[RawPoint], bounds: &GeoBounds) -> Option<Coordinate> {
    rest.iter().find_map(|point| {
        let (a, b) = point.components()?;
        let as_given = Coordinate::new(a, b);
        pick_plausible(as_given, as_given.swapped(), bounds)
    })
}
