use fieldops_core::PlanError;
use thiserror::Error;

/// Failures surfaced by the geofence manager.
///
/// Platform call failures are not here: the manager logs them and degrades to
/// zero active regions instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeofenceError {
    #[error("Background location permission denied")]
    PermissionDenied,
}

/// Errors reported by a platform geofencing service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeofencingError {
    #[error("Geofencing service unavailable: {0}")]
    Unavailable(String),

    #[error("Geofencing call failed: {0}")]
    Platform(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteSessionError {
    #[error(transparent)]
    Plan(#[from] PlanError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
