//! Trip path construction.
//!
//! Builds the time-ordered polyline connecting a manifest's timestamped
//! events. Target places are destinations rather than visits, so they never
//! join the path. The whole window is always drawn: `current_time` is the
//! last timestamp and the trail spans the full window.

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::{AdjustedPoint, MapConfig, MapTheme, MarkerType, VisibilitySettings};

/// Identifier of the single path layer on the drawing overlay.
pub const TRIP_LAYER_ID: &str = "TripsLayer";

/// A path vertex: `[longitude, latitude]` plus absolute epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinates: [f64; 2],
    pub timestamp: i64,
}

/// Presentation constants for the path layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathStyle {
    pub color: [u8; 4],
    pub width_min_pixels: f64,
    pub width_max_pixels: f64,
    pub width_scale: f64,
    pub cap_rounded: bool,
    pub joint_rounded: bool,
    pub fade_trail: bool,
}

impl PathStyle {
    pub fn new(theme: &MapTheme, config: &MapConfig) -> Self {
        Self {
            color: theme.primary_rgba(),
            width_min_pixels: config.path_width_min_pixels,
            width_max_pixels: config.path_width_max_pixels,
            width_scale: 1.0,
            cap_rounded: true,
            joint_rounded: true,
            fade_trail: false,
        }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(&MapTheme::default(), &MapConfig::default())
    }
}

/// Layer descriptor pushed onto the drawing overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPathLayer {
    pub id: String,
    /// Sorted ascending by timestamp
    pub waypoints: Vec<Waypoint>,
    /// Waypoint timestamps relative to `min_time`
    pub relative_timestamps: Vec<i64>,
    pub min_time: i64,
    pub max_time: i64,
    pub current_time: i64,
    pub trail_length: i64,
    pub style: PathStyle,
}

impl TripPathLayer {
    /// Path geometry as a `geo::LineString` (x = longitude, y = latitude).
    pub fn line_string(&self) -> LineString<f64> {
        self.waypoints
            .iter()
            .map(|w| Coord {
                x: w.coordinates[0],
                y: w.coordinates[1],
            })
            .collect()
    }
}

/// Build the trip path from the full adjusted point list.
///
/// Returns `None` when fewer than two timestamped, non-target points exist.
pub fn build_trip_path(points: &[AdjustedPoint], style: &PathStyle) -> Option<TripPathLayer> {
    let mut waypoints: Vec<Waypoint> = points
        .iter()
        .filter(|p| p.marker_type() != MarkerType::TargetPlace)
        .filter_map(|p| {
            let timestamp = p.point.timestamp?.timestamp_millis();
            Some(Waypoint {
                coordinates: [p.adjusted.longitude, p.adjusted.latitude],
                timestamp,
            })
        })
        .collect();

    if waypoints.len() < 2 {
        return None;
    }

    // Stable: equal timestamps keep input order
    waypoints.sort_by_key(|w| w.timestamp);

    let min_time = waypoints.iter().map(|w| w.timestamp).min()?;
    let max_time = waypoints.iter().map(|w| w.timestamp).max()?;
    let relative_timestamps = waypoints.iter().map(|w| w.timestamp - min_time).collect();

    Some(TripPathLayer {
        id: TRIP_LAYER_ID.to_string(),
        waypoints,
        relative_timestamps,
        min_time,
        max_time,
        current_time: max_time,
        trail_length: max_time - min_time,
        style: style.clone(),
    })
}

/// Layers for the drawing overlay: the trip path when enabled and buildable.
pub fn path_layers(
    points: &[AdjustedPoint],
    settings: &VisibilitySettings,
    style: &PathStyle,
) -> Vec<TripPathLayer> {
    if !settings.show_manifest_path {
        return Vec::new();
    }
    build_trip_path(points, style).into_iter().collect()
}
