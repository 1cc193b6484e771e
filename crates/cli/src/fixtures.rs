// crates/cli/src/fixtures.rs
//! Loading JSON fixtures and the optional TOML config from disk.

use std::path::Path;

use anyhow::{Context, Result};
use fieldops_automation::AutomationConfig;
use fieldops_core::Coordinate;
use serde::de::DeserializeOwned;

/// Read and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Config from `path` (or defaults), then `FIELDOPS_*` overrides.
pub fn load_config(path: Option<&Path>) -> Result<AutomationConfig> {
    let base = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            AutomationConfig::from_toml_str(&raw).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => AutomationConfig::default(),
    };
    Ok(base.with_env_overrides())
}

/// Parse `LAT,LNG` as given on the command line.
pub fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude {lat:?}"))?;
    let lng: f64 = lng.trim().parse().map_err(|_| format!("bad longitude {lng:?}"))?;
    Coordinate::new(lat, lng).map_err(|e| e.to_string())
}
