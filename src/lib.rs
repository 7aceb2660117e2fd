//! # Manifest Map
//!
//! Rendering engine for manifest life-cycle maps: place visits, tracker
//! positions and content add/remove events turned into de-overlapped
//! markers, a time-ordered trip path, category visibility filtering and
//! single-selection marker interaction.
//!
//! This library provides:
//! - Deterministic hexagonal de-overlap of coincident markers
//! - Trip path construction (time-ordered, fully drawn window)
//! - Visibility filtering per marker category
//! - Lifecycle management for the drawing overlay and radius circles
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel overlap resolution with rayon
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use manifest_map::{resolve_overlaps, ManifestMapPoint, MapConfig, MarkerType};
//!
//! let points = vec![
//!     ManifestMapPoint::new(MarkerType::StartPlace, 51.5074, -0.1278),
//!     ManifestMapPoint::new(MarkerType::EndPlace, 51.5074, -0.1278),
//! ];
//!
//! let adjusted = resolve_overlaps(&points, &MapConfig::default());
//! assert_eq!(adjusted[0].adjusted, adjusted[0].raw);
//! assert_ne!(adjusted[1].adjusted, adjusted[1].raw);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Unified error handling
pub mod error;
pub use error::{MapError, OptionExt, Result};

// Geographic utilities (distance, circle bounds, rounding)
pub mod geo_utils;

// Overlap resolution (hexagonal de-overlap of coincident markers)
pub mod overlap;
#[cfg(feature = "parallel")]
pub use overlap::resolve_overlaps_parallel;
pub use overlap::{marker_offset, resolve_overlaps, AdjustedPoint, Offset};

// Visibility filtering per marker category
pub mod visibility;
pub use visibility::{filter_visible, is_marker_visible, MarkerCategory};

// Trip path construction
pub mod trip_path;
pub use trip_path::{build_trip_path, path_layers, PathStyle, TripPathLayer, Waypoint};

// Theme colours
pub mod theme;
pub use theme::{parse_hex_colour, MapTheme, ThemeMode};

// Per-type marker rendering descriptors
pub mod markers;
pub use markers::{describe_marker, InfoPopup, MarkerGlyph, MarkerIcon, PopupRow, RenderedMarker};

// Host map runtime abstraction
pub mod runtime;
pub use runtime::{CircleOptions, DrawingOverlay, MapCircle, MapInstanceId, MapRuntime};

// Recording runtime for headless rendering and lifecycle assertions
pub mod headless;
pub use headless::{HeadlessMap, MapEvent};

// Drawing overlay lifecycle
pub mod overlay;
pub use overlay::{OverlayManager, OverlayStats};

// Radius circle lifecycle
pub mod radius_circle;
pub use radius_circle::{CircleProps, RadiusCircle};

// Marker selection and hover
pub mod interaction;
pub use interaction::{MarkerInteraction, ViewportChange};

// Resize debouncing and remount key
pub mod resize;
pub use resize::ResizeDebouncer;

// Stateful map session
pub mod session;
pub use session::{ManifestMap, MapFrame, MapStatus, SessionStats};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("ManifestMapRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Lat/lng bounding box used for viewport fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Bounds containing a single coordinate.
    pub fn from_point(point: LatLng) -> Self {
        Self {
            min_lat: point.latitude,
            max_lat: point.latitude,
            min_lng: point.longitude,
            max_lng: point.longitude,
        }
    }

    /// Create bounds from coordinates. Returns `None` for an empty slice.
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::from_point(*first);
        for p in rest {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    /// Grow the bounds to include `point`.
    pub fn extend(&mut self, point: LatLng) {
        self.min_lat = self.min_lat.min(point.latitude);
        self.max_lat = self.max_lat.max(point.latitude);
        self.min_lng = self.min_lng.min(point.longitude);
        self.max_lng = self.max_lng.max(point.longitude);
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Semantic role of a map point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerType {
    StartPlace,
    EndPlace,
    TargetPlace,
    LatestLocation,
    ContentsAdded,
    ContentsRemoved,
    TrackerPath,
    /// Any marker type this version does not know about
    #[serde(other)]
    Unknown,
}

/// Stable identifier of a rendered marker, derived from its list position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub String);

impl MarkerId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("point-{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One observed event or place reference on a manifest's timeline.
///
/// Coordinates are authoritative and never mutated; display coordinates
/// live in [`AdjustedPoint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMapPoint {
    pub marker_type: MarkerType,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Required for inclusion in the trip path
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Radius in metres (geofence or location accuracy)
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub place_id: Option<i64>,
    #[serde(default)]
    pub place_name: Option<String>,
    /// Only meaningful for `TARGET_PLACE`
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub contents_added_count: Option<u32>,
    #[serde(default)]
    pub contents_removed_count: Option<u32>,
}

impl ManifestMapPoint {
    /// Create a point with coordinates and no optional fields.
    pub fn new(marker_type: MarkerType, latitude: f64, longitude: f64) -> Self {
        Self {
            marker_type,
            latitude: Some(latitude),
            longitude: Some(longitude),
            timestamp: None,
            radius: None,
            place_id: None,
            place_name: None,
            deadline: None,
            contents_added_count: None,
            contents_removed_count: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Source position, or `None` when either coordinate is missing or invalid.
    pub fn position(&self) -> Option<LatLng> {
        let point = LatLng::new(self.latitude?, self.longitude?);
        point.is_valid().then_some(point)
    }

    /// Like [`position`](Self::position), but distinguishes missing geometry
    /// (`Ok(None)`) from coordinates that are present and out of range.
    pub fn checked_position(&self, index: usize) -> Result<Option<LatLng>> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Ok(None);
        };
        let point = LatLng::new(latitude, longitude);
        if point.is_valid() {
            Ok(Some(point))
        } else {
            Err(MapError::InvalidCoordinates {
                marker_id: MarkerId::from_index(index).to_string(),
                message: format!("({}, {}) is outside WGS84 range", latitude, longitude),
            })
        }
    }

    /// Radius in metres when present and positive.
    pub fn effective_radius(&self) -> Option<f64> {
        self.radius.filter(|r| r.is_finite() && *r > 0.0)
    }
}

/// Manifest map payload as delivered by the data layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMapData {
    #[serde(default)]
    pub points: Vec<ManifestMapPoint>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ManifestMapData {
    pub fn from_points(points: Vec<ManifestMapPoint>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// Parse a payload from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MapError::deserialize("manifest map data", e))
    }
}

/// Four independent visibility toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct VisibilitySettings {
    /// Gates START_PLACE, END_PLACE and TARGET_PLACE markers
    pub show_manifest_places: bool,
    /// Gates CONTENTS_ADDED and CONTENTS_REMOVED markers
    pub show_contents_places: bool,
    /// Gates the LATEST_LOCATION marker
    pub show_latest_location: bool,
    /// Gates the trip path overlay only
    pub show_manifest_path: bool,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            show_manifest_places: true,
            show_contents_places: true,
            show_latest_location: true,
            show_manifest_path: true,
        }
    }
}

/// One of the four visibility flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum VisibilityToggle {
    ManifestPlaces,
    ContentsPlaces,
    LatestLocation,
    ManifestPath,
}

impl VisibilitySettings {
    pub fn get(&self, toggle: VisibilityToggle) -> bool {
        match toggle {
            VisibilityToggle::ManifestPlaces => self.show_manifest_places,
            VisibilityToggle::ContentsPlaces => self.show_contents_places,
            VisibilityToggle::LatestLocation => self.show_latest_location,
            VisibilityToggle::ManifestPath => self.show_manifest_path,
        }
    }

    pub fn set(&mut self, toggle: VisibilityToggle, value: bool) {
        let flag = match toggle {
            VisibilityToggle::ManifestPlaces => &mut self.show_manifest_places,
            VisibilityToggle::ContentsPlaces => &mut self.show_contents_places,
            VisibilityToggle::LatestLocation => &mut self.show_latest_location,
            VisibilityToggle::ManifestPath => &mut self.show_manifest_path,
        };
        *flag = value;
    }

    /// Flip one flag and return its new value.
    pub fn toggle(&mut self, toggle: VisibilityToggle) -> bool {
        let value = !self.get(toggle);
        self.set(toggle, value);
        value
    }
}

/// Tunable constants for the map engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Offset distance for coincident markers, in degrees.
    /// Default: 0.0001 (about 10 meters at the equator)
    pub offset_distance: f64,

    /// Angle table in degrees, indexed by coincident count.
    /// Default: hexagonal pattern [0, 60, 120, 180, 240, 300]
    pub offset_angles: Vec<f64>,

    /// Number of rings used before offsets repeat.
    /// Default: 1 (the seventh coincident marker lands on the first)
    pub overlap_rings: u32,

    /// Padding in pixels for fit-bounds operations. Default: 100
    pub default_padding: u32,

    /// Zoom level used when selecting a marker without a radius. Default: 18
    pub default_zoom: u8,

    /// Maximum aspect-ratio change still treated as a page zoom. Default: 0.05
    pub zoom_ratio_threshold: f64,

    /// Resize debounce window in milliseconds. Default: 100
    pub zoom_debounce_ms: u64,

    /// Trip path width bounds in pixels. Default: 4..20
    pub path_width_min_pixels: f64,
    pub path_width_max_pixels: f64,

    /// Base map style ids per theme mode
    pub map_id_light: String,
    pub map_id_dark: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            offset_distance: 0.0001,
            offset_angles: vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0],
            overlap_rings: 1,
            default_padding: 100,
            default_zoom: 18,
            zoom_ratio_threshold: 0.05,
            zoom_debounce_ms: 100,
            path_width_min_pixels: 4.0,
            path_width_max_pixels: 20.0,
            map_id_light: "manifest-map-light".to_string(),
            map_id_dark: "manifest-map-dark".to_string(),
        }
    }
}

impl MapConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MapError::deserialize("map config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(MapError::ConfigError {
                message: message.to_string(),
            })
        };
        if !self.offset_distance.is_finite() || self.offset_distance <= 0.0 {
            return fail("offset_distance must be a positive number");
        }
        if self.offset_angles.is_empty() {
            return fail("offset_angles must not be empty");
        }
        if self.offset_angles.iter().any(|a| !a.is_finite()) {
            return fail("offset_angles must be finite");
        }
        if self.overlap_rings == 0 {
            return fail("overlap_rings must be at least 1");
        }
        if !self.zoom_ratio_threshold.is_finite() || self.zoom_ratio_threshold < 0.0 {
            return fail("zoom_ratio_threshold must be a non-negative number");
        }
        if self.path_width_min_pixels > self.path_width_max_pixels {
            return fail("path_width_min_pixels exceeds path_width_max_pixels");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lng_validation() {
        assert!(LatLng::new(51.5074, -0.1278).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, 181.0).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_missing_geometry_has_no_position() {
        let mut point = ManifestMapPoint::new(MarkerType::StartPlace, 10.0, 10.0);
        assert!(point.position().is_some());
        point.longitude = None;
        assert!(point.position().is_none());
    }

    #[test]
    fn test_checked_position() {
        let point = ManifestMapPoint::new(MarkerType::EndPlace, 10.0, 20.0);
        assert_eq!(point.checked_position(0), Ok(Some(LatLng::new(10.0, 20.0))));

        let mut missing = point.clone();
        missing.latitude = None;
        assert_eq!(missing.checked_position(1), Ok(None));

        let out_of_range = ManifestMapPoint::new(MarkerType::EndPlace, 10.0, 200.0);
        match out_of_range.checked_position(2) {
            Err(MapError::InvalidCoordinates { marker_id, .. }) => assert_eq!(marker_id, "point-2"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds::from_points(&[
            LatLng::new(1.0, 2.0),
            LatLng::new(-1.0, 4.0),
            LatLng::new(0.5, 3.0),
        ])
        .unwrap();
        assert_eq!(bounds.min_lat, -1.0);
        assert_eq!(bounds.max_lat, 1.0);
        assert_eq!(bounds.min_lng, 2.0);
        assert_eq!(bounds.max_lng, 4.0);
        assert_eq!(bounds.center(), LatLng::new(0.0, 3.0));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_point_deserializes_from_host_json() {
        let json = r#"{
            "points": [
                {"markerType": "START_PLACE", "latitude": 51.5, "longitude": -0.12,
                 "timestamp": "2024-03-01T10:00:00Z", "placeId": 7, "placeName": "Depot"},
                {"markerType": "SOMETHING_NEW", "latitude": 51.6, "longitude": -0.13},
                {"markerType": "CONTENTS_ADDED", "contentsAddedCount": 4}
            ]
        }"#;
        let data = ManifestMapData::from_json(json).unwrap();
        assert_eq!(data.points.len(), 3);
        assert_eq!(data.points[0].marker_type, MarkerType::StartPlace);
        assert_eq!(data.points[0].place_name.as_deref(), Some("Depot"));
        assert!(data.points[0].timestamp.is_some());
        assert_eq!(data.points[1].marker_type, MarkerType::Unknown);
        assert!(data.points[2].position().is_none());
        assert!(!data.loading);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let result = ManifestMapData::from_json("{\"points\": 3}");
        assert!(matches!(result, Err(MapError::Deserialize { .. })));
    }

    #[test]
    fn test_visibility_toggle() {
        let mut settings = VisibilitySettings::default();
        assert!(!settings.toggle(VisibilityToggle::ContentsPlaces));
        assert!(!settings.show_contents_places);
        assert!(settings.show_manifest_places);
        assert!(settings.toggle(VisibilityToggle::ContentsPlaces));
    }

    #[test]
    fn test_config_validation() {
        assert!(MapConfig::default().validate().is_ok());

        let config = MapConfig {
            overlap_rings: 0,
            ..MapConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MapError::ConfigError { .. })
        ));

        let parsed = MapConfig::from_json(r#"{"default_zoom": 15}"#).unwrap();
        assert_eq!(parsed.default_zoom, 15);
        assert_eq!(parsed.default_padding, 100);

        assert!(MapConfig::from_json(r#"{"offset_distance": -1.0}"#).is_err());
    }

    #[test]
    fn test_effective_radius() {
        let point = ManifestMapPoint::new(MarkerType::LatestLocation, 0.0, 0.0);
        assert_eq!(point.effective_radius(), None);
        assert_eq!(point.clone().with_radius(0.0).effective_radius(), None);
        assert_eq!(point.with_radius(25.0).effective_radius(), Some(25.0));
    }
}
