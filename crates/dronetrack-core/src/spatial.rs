//! Spatial math for route and distance calculations.

use serde::{Deserialize, Serialize};

use crate::models::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate great-circle distance between two points in kilometers.
///
/// NaN components propagate into the result; callers that take untrusted
/// input should check [`is_valid_coordinate_pair`] first.
pub fn haversine_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Same as [`haversine_distance_km`], in meters.
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    haversine_distance_km(a, b) * 1000.0
}

pub fn is_valid_coordinate_pair(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite()
}

/// Linear interpolation between two points, `t` in `[0, 1]`.
///
/// Interpolates in degree space; fine for the city-scale legs a delivery
/// drone flies.
pub fn interpolate(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }
    Coordinate {
        lat: a.lat + (b.lat - a.lat) * t,
        lng: a.lng + (b.lng - a.lng) * t,
    }
}

/// Sum of haversine distances along consecutive points, in kilometers.
pub fn polyline_length_km<I>(points: I) -> f64
where
    I: IntoIterator<Item = Coordinate>,
{
    let mut total = 0.0;
    let mut prev: Option<Coordinate> = None;
    for point in points {
        if let Some(prev) = prev {
            total += haversine_distance_km(prev, point);
        }
        prev = Some(point);
    }
    total
}

/// Geographic box a correctly ordered coordinate is expected to fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Default for GeoBounds {
    /// Southeast Asia service region.
    fn default() -> Self {
        Self {
            min_lat: -10.0,
            max_lat: 30.0,
            min_lng: 90.0,
            max_lng: 120.0,
        }
    }
}

impl GeoBounds {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.is_valid()
            && (self.min_lat..=self.max_lat).contains(&coord.lat)
            && (self.min_lng..=self.max_lng).contains(&coord.lng)
    }

    pub fn is_well_formed(&self) -> bool {
        self.min_lat < self.max_lat
            && self.min_lng < self.max_lng
            && (-90.0..=90.0).contains(&self.min_lat)
            && (-90.0..=90.0).contains(&self.max_lat)
            && (-180.0..=180.0).contains(&self.min_lng)
            && (-180.0..=180.0).contains(&self.max_lng)
    }
}
