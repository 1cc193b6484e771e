// crates/core/src/error.rs
use thiserror::Error;

/// Errors raised by coordinate construction and geo math
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

/// Errors raised when editing a route plan by hand
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Route index {index} out of range for plan of {len} stops")]
    IndexOutOfRange { index: usize, len: usize },
}
