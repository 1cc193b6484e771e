// crates/core/src/maps.rs
//! Deep links for handing a route or a single stop to a maps app.

use crate::types::Coordinate;

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/?api=1";
const SEARCH_BASE: &str = "https://www.google.com/maps/search/?api=1";

/// Driving directions through `waypoints` in order, ending at the last one.
///
/// Returns `None` for an empty list. The device's current position is the
/// implicit origin.
pub fn directions_url(waypoints: &[Coordinate]) -> Option<String> {
    let (destination, via) = waypoints.split_last()?;
    let mut url = format!(
        "{DIRECTIONS_BASE}&destination={}&travelmode=driving",
        urlencoding::encode(&destination.to_string())
    );
    if !via.is_empty() {
        let joined = via.iter().map(Coordinate::to_string).collect::<Vec<_>>().join("|");
        url.push_str("&waypoints=");
        url.push_str(&urlencoding::encode(&joined));
    }
    Some(url)
}

/// A pin at `coordinate`, labelled when a non-empty label is given.
pub fn place_url(coordinate: Coordinate, label: &str) -> String {
    let query = if label.trim().is_empty() {
        coordinate.to_string()
    } else {
        format!("{} ({})", coordinate, label.trim())
    };
    format!("{SEARCH_BASE}&query={}", urlencoding::encode(&query))
}
