//! Tunables for the automation components.
//!
//! Defaults match production behavior. Hosts may load overrides from a TOML
//! file and/or `FIELDOPS_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_GEOFENCE_RADIUS_M: &str = "FIELDOPS_GEOFENCE_RADIUS_M";
pub const ENV_WARMUP_SECS: &str = "FIELDOPS_WARMUP_SECS";
pub const ENV_PREVIEW_MAX_CHARS: &str = "FIELDOPS_PREVIEW_MAX_CHARS";
pub const ENV_LOCATION_TIMEOUT_SECS: &str = "FIELDOPS_LOCATION_TIMEOUT_SECS";

/// Upper bound for `warmup_secs`.
pub const MAX_WARMUP_SECS: u64 = 3600;
/// Upper bound for `location_timeout_secs`.
pub const MAX_LOCATION_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Radius of each job geofence.
    pub geofence_radius_m: f64,
    /// Quiet period after a change watch starts.
    pub warmup_secs: u64,
    /// Longest message preview shown in a "New Message" alert.
    pub preview_max_chars: usize,
    /// Upper bound on the device location fetch during route planning.
    pub location_timeout_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            geofence_radius_m: 120.0,
            warmup_secs: 3,
            preview_max_chars: 100,
            location_timeout_secs: 10,
        }
    }
}

impl AutomationConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with any `FIELDOPS_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `FIELDOPS_*` overrides. Values that fail to parse, or that
    /// would make the config invalid, are ignored with a warning.
    pub fn with_env_overrides(self) -> Self {
        let candidate = Self {
            geofence_radius_m: env_override(ENV_GEOFENCE_RADIUS_M, self.geofence_radius_m),
            warmup_secs: env_override(ENV_WARMUP_SECS, self.warmup_secs),
            preview_max_chars: env_override(ENV_PREVIEW_MAX_CHARS, self.preview_max_chars),
            location_timeout_secs: env_override(ENV_LOCATION_TIMEOUT_SECS, self.location_timeout_secs),
        };
        match candidate.validate() {
            Ok(()) => candidate,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid FIELDOPS_* overrides");
                self
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.geofence_radius_m.is_finite() || self.geofence_radius_m <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "geofence_radius_m must be positive, got {}",
                self.geofence_radius_m
            )));
        }
        if self.preview_max_chars == 0 {
            return Err(ConfigError::Invalid("preview_max_chars must be at least 1".into()));
        }
        if self.warmup_secs > MAX_WARMUP_SECS {
            return Err(ConfigError::Invalid(format!(
                "warmup_secs must be at most {MAX_WARMUP_SECS}, got {}",
                self.warmup_secs
            )));
        }
        if self.location_timeout_secs > MAX_LOCATION_TIMEOUT_SECS {
            return Err(ConfigError::Invalid(format!(
                "location_timeout_secs must be at most {MAX_LOCATION_TIMEOUT_SECS}, got {}",
                self.location_timeout_secs
            )));
        }
        Ok(())
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }
}

fn env_override<T: FromStr + Copy>(key: &str, current: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Unparsable config override; keeping current value");
                current
            }
        },
        Err(_) => current,
    }
}
