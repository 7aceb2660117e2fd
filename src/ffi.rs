//! FFI bindings for mobile platforms (iOS/Android).
//!
//! Exposes two surfaces through UniFFI:
//! - stateless JSON helpers (`ffi_` prefix) for hosts that only need the
//!   derived point lists;
//! - a process-wide session (`map_` prefix) that drives the host map
//!   through the [`MapHostCallback`] interface.
//!
//! Complex values cross the boundary as JSON, matching how the host
//! already ships manifest map payloads.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::{
    build_trip_path, filter_visible, init_logging, Bounds, CircleOptions, DrawingOverlay,
    LatLng, ManifestMap, ManifestMapPoint, MapCircle, MapConfig, MapError, MapInstanceId,
    MapRuntime, MapTheme, MarkerId, PathStyle, Result, TripPathLayer, VisibilitySettings,
    VisibilityToggle,
};

#[cfg(feature = "parallel")]
use crate::resolve_overlaps_parallel as resolve;

#[cfg(not(feature = "parallel"))]
use crate::resolve_overlaps as resolve;

// ============================================================================
// Host Callback Interface
// ============================================================================

/// Map widget operations implemented in Kotlin/Swift.
///
/// Creation calls return a non-zero handle, or `0` when the host cannot
/// create the drawable.
#[uniffi::export(callback_interface)]
pub trait MapHostCallback: Send + Sync {
    fn fit_bounds(&self, min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64, padding: u32);
    fn pan_to(&self, latitude: f64, longitude: f64);
    fn set_zoom(&self, zoom: u8);
    fn create_overlay(&self, map_instance: u64) -> u64;
    /// `layers_json` is a JSON array of trip path layers
    fn set_overlay_layers(&self, overlay: u64, layers_json: String);
    fn remove_overlay(&self, overlay: u64);
    /// `options_json` carries center, radius, colours and the owning marker id
    fn create_circle(&self, map_instance: u64, options_json: String) -> u64;
    fn remove_circle(&self, circle: u64);
}

// ============================================================================
// Host Runtime
// ============================================================================

/// [`MapRuntime`] backed by a host callback.
#[derive(Clone)]
pub struct HostRuntime {
    id: MapInstanceId,
    host: Arc<dyn MapHostCallback>,
}

impl HostRuntime {
    pub fn new(id: MapInstanceId, host: Arc<dyn MapHostCallback>) -> Self {
        Self { id, host }
    }
}

pub struct HostOverlay {
    handle: u64,
    host: Arc<dyn MapHostCallback>,
    attached: bool,
}

impl DrawingOverlay for HostOverlay {
    fn set_layers(&mut self, layers: &[TripPathLayer]) {
        if !self.attached {
            return;
        }
        match serde_json::to_string(layers) {
            Ok(json) => self.host.set_overlay_layers(self.handle, json),
            Err(e) => warn!("[ManifestMapRust] Could not encode layers: {}", e),
        }
    }

    fn detach(&mut self) {
        if std::mem::take(&mut self.attached) {
            self.host.remove_overlay(self.handle);
        }
    }
}

pub struct HostCircle {
    handle: u64,
    host: Arc<dyn MapHostCallback>,
    attached: bool,
}

impl MapCircle for HostCircle {
    fn detach(&mut self) {
        if std::mem::take(&mut self.attached) {
            self.host.remove_circle(self.handle);
        }
    }
}

impl MapRuntime for HostRuntime {
    type Overlay = HostOverlay;
    type Circle = HostCircle;

    fn instance_id(&self) -> MapInstanceId {
        self.id
    }

    fn fit_bounds(&self, bounds: &Bounds, padding: u32) {
        self.host.fit_bounds(
            bounds.min_lat,
            bounds.max_lat,
            bounds.min_lng,
            bounds.max_lng,
            padding,
        );
    }

    fn pan_to(&self, position: LatLng) {
        self.host.pan_to(position.latitude, position.longitude);
    }

    fn set_zoom(&self, zoom: u8) {
        self.host.set_zoom(zoom);
    }

    fn create_overlay(&self) -> Result<Self::Overlay> {
        match self.host.create_overlay(self.id) {
            0 => Err(MapError::OverlayUnavailable {
                message: format!("host refused overlay on map {}", self.id),
            }),
            handle => Ok(HostOverlay {
                handle,
                host: Arc::clone(&self.host),
                attached: true,
            }),
        }
    }

    fn create_circle(&self, options: &CircleOptions) -> Result<Self::Circle> {
        let json = to_json(options)?;
        match self.host.create_circle(self.id, json) {
            0 => Err(MapError::OverlayUnavailable {
                message: format!("host refused circle for {}", options.owner),
            }),
            handle => Ok(HostCircle {
                handle,
                host: Arc::clone(&self.host),
                attached: true,
            }),
        }
    }
}

// ============================================================================
// JSON Helpers
// ============================================================================

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| MapError::Internal {
        message: format!("JSON encoding failed: {}", e),
    })
}

fn parse_points(points_json: &str) -> Result<Vec<ManifestMapPoint>> {
    serde_json::from_str(points_json).map_err(|e| MapError::deserialize("points", e))
}

fn parse_theme(theme_json: &str) -> Result<MapTheme> {
    serde_json::from_str(theme_json).map_err(|e| MapError::deserialize("theme", e))
}

/// Default engine configuration as JSON.
#[uniffi::export]
pub fn ffi_default_config_json() -> std::result::Result<String, MapError> {
    init_logging();
    to_json(&MapConfig::default())
}

/// Adjusted points for a JSON point array.
#[uniffi::export]
pub fn ffi_resolve_overlaps_json(points_json: String) -> std::result::Result<String, MapError> {
    init_logging();
    let points = parse_points(&points_json)?;
    let adjusted = resolve(&points, &MapConfig::default());
    debug!(
        "[ManifestMapRust] Resolved {} of {} points",
        adjusted.len(),
        points.len()
    );
    to_json(&adjusted)
}

/// Adjusted points visible under `settings`.
#[uniffi::export]
pub fn ffi_visible_points_json(
    points_json: String,
    settings: VisibilitySettings,
) -> std::result::Result<String, MapError> {
    init_logging();
    let points = parse_points(&points_json)?;
    let adjusted = resolve(&points, &MapConfig::default());
    to_json(&filter_visible(&adjusted, &settings))
}

/// Trip path layer for a JSON point array, or `null` when there is no path.
#[uniffi::export]
pub fn ffi_trip_path_json(
    points_json: String,
    theme_json: String,
) -> std::result::Result<String, MapError> {
    init_logging();
    let points = parse_points(&points_json)?;
    let theme = parse_theme(&theme_json)?;
    let config = MapConfig::default();
    let adjusted = resolve(&points, &config);
    to_json(&build_trip_path(&adjusted, &PathStyle::new(&theme, &config)))
}

// ============================================================================
// Session Singleton
// ============================================================================

static SESSION: Lazy<Mutex<ManifestMap<HostRuntime>>> =
    Lazy::new(|| Mutex::new(ManifestMap::with_defaults()));

fn with_session<F, T>(f: F) -> T
where
    F: FnOnce(&mut ManifestMap<HostRuntime>) -> T,
{
    // A panic inside a previous call leaves the session usable
    let mut session = SESSION.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut session)
}

/// Initialize logging and reset the session (call once per screen).
#[uniffi::export]
pub fn map_init() {
    init_logging();
    with_session(|s| {
        s.detach_map();
        *s = ManifestMap::with_defaults();
    });
    info!("[ManifestMapRust] Session initialized");
}

/// Replace the session with one using a custom configuration and theme.
#[uniffi::export]
pub fn map_configure(config_json: String, theme_json: String) -> std::result::Result<(), MapError> {
    init_logging();
    let config = MapConfig::from_json(&config_json)?;
    let theme = parse_theme(&theme_json)?;
    let fresh = ManifestMap::new(config, theme)?;
    with_session(|s| {
        s.detach_map();
        *s = fresh;
    });
    Ok(())
}

#[uniffi::export]
pub fn map_set_data_json(data_json: String) -> std::result::Result<(), MapError> {
    with_session(|s| s.set_data_json(&data_json))
}

#[uniffi::export]
pub fn map_set_loading(loading: bool) {
    with_session(|s| s.set_loading(loading));
}

#[uniffi::export]
pub fn map_set_error(error: Option<String>) {
    with_session(|s| s.set_error(error));
}

#[uniffi::export]
pub fn map_dismiss_error() {
    with_session(|s| s.dismiss_error());
}

#[uniffi::export]
pub fn map_set_theme_json(theme_json: String) -> std::result::Result<(), MapError> {
    let theme = parse_theme(&theme_json)?;
    with_session(|s| s.set_theme(theme));
    Ok(())
}

#[uniffi::export]
pub fn map_get_visibility() -> VisibilitySettings {
    with_session(|s| s.settings())
}

#[uniffi::export]
pub fn map_set_visibility(settings: VisibilitySettings) {
    with_session(|s| s.set_visibility(settings));
}

/// Flip one visibility flag and return its new value.
#[uniffi::export]
pub fn map_toggle_visibility(toggle: VisibilityToggle) -> bool {
    with_session(|s| s.toggle_visibility(toggle))
}

/// Bind a map instance. Pass a new `instance_id` whenever the host
/// recreates its map widget.
#[uniffi::export]
pub fn map_attach(instance_id: u64, host: Box<dyn MapHostCallback>) {
    let runtime = HostRuntime::new(instance_id, Arc::from(host));
    with_session(|s| s.attach_map(runtime));
}

#[uniffi::export]
pub fn map_detach() {
    with_session(|s| {
        s.detach_map();
    });
}

/// Select a marker. Returns `false` for unknown or hidden markers.
#[uniffi::export]
pub fn map_click_marker(marker_id: String) -> bool {
    with_session(|s| s.click_marker(&MarkerId(marker_id)).is_some())
}

#[uniffi::export]
pub fn map_hover_marker(marker_id: String, hovered: bool) {
    with_session(|s| s.hover_marker(&MarkerId(marker_id), hovered));
}

#[uniffi::export]
pub fn map_click_map() {
    with_session(|s| s.click_map());
}

#[uniffi::export]
pub fn map_close_popup(marker_id: String) {
    with_session(|s| s.close_popup(&MarkerId(marker_id)));
}

#[uniffi::export]
pub fn map_click_circle(marker_id: String) -> bool {
    with_session(|s| s.click_circle(&MarkerId(marker_id)))
}

/// Fit all visible points. Returns `false` when no point is visible and
/// fails when no map is attached.
#[uniffi::export]
pub fn map_zoom_to_fit() -> std::result::Result<bool, MapError> {
    with_session(|s| {
        s.require_map("zoom_to_fit")?;
        Ok(s.zoom_to_fit().is_some())
    })
}

/// Seed the viewport size measured when the map widget mounts.
#[uniffi::export]
pub fn map_set_viewport_size(width: f64, height: f64) {
    with_session(|s| s.set_viewport_size(width, height));
}

#[uniffi::export]
pub fn map_handle_resize(width: f64, height: f64) {
    let now = Instant::now();
    with_session(|s| s.handle_resize(width, height, now));
}

/// Returns `true` when the host should remount its map widget.
#[uniffi::export]
pub fn map_poll_resize() -> bool {
    let now = Instant::now();
    with_session(|s| s.poll_resize(now))
}

/// Current frame (map key, markers, path layers, status) as JSON.
#[uniffi::export]
pub fn map_render_json() -> std::result::Result<String, MapError> {
    with_session(|s| to_json(&s.render()))
}

#[uniffi::export]
pub fn map_stats_json() -> std::result::Result<String, MapError> {
    with_session(|s| to_json(&s.stats()))
}
