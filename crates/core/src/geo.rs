// crates/core/src/geo.rs
//! Great-circle math over [`Coordinate`]s.

use std::fmt;

use crate::types::Coordinate;

/// Mean earth radius used for all distance math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers to statute miles.
pub const KM_TO_MILES: f64 = 0.621371;

/// Distances below this many miles display as [`DisplayDistance::Negligible`].
pub const NEGLIGIBLE_MILES: f64 = 0.1;

/// Haversine distance between two coordinates, in kilometers.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Clamp guards asin against h drifting a hair above 1.0 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// True when `point` lies inside the circle of `radius_m` meters around `center`.
pub fn contains(center: Coordinate, radius_m: f64, point: Coordinate) -> bool {
    distance_km(center, point) * 1000.0 <= radius_m
}

pub fn km_to_miles(km: f64) -> f64 {
    km * KM_TO_MILES
}

/// A distance ready for display next to a route stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayDistance {
    /// Under a tenth of a mile; shown as "< 0.1 mi" rather than "0.0 mi".
    Negligible,
    Miles(f64),
}

impl DisplayDistance {
    pub fn from_km(km: f64) -> Self {
        let miles = km_to_miles(km.max(0.0));
        if miles < NEGLIGIBLE_MILES {
            DisplayDistance::Negligible
        } else {
            DisplayDistance::Miles(miles)
        }
    }
}

impl fmt::Display for DisplayDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayDistance::Negligible => write!(f, "< {NEGLIGIBLE_MILES} mi"),
            DisplayDistance::Miles(m) => write!(f, "{m:.1} mi"),
        }
    }
}
