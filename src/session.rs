//! # Map Session
//!
//! [`ManifestMap`] owns everything a manifest map needs between renders:
//! the data payload and its adjusted points, visibility flags, the theme,
//! the bound map instance with its overlay and radius circles, marker
//! selection and resize debouncing.
//!
//! Every mutating call recomputes derived state synchronously and then
//! reconciles map resources, so the host only has to forward its events
//! and draw [`ManifestMap::render`].

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::{debug, info, warn};
use serde::Serialize;

use crate::markers::circle_colour;
use crate::{
    describe_marker, filter_visible, is_marker_visible, path_layers, resolve_overlaps,
    AdjustedPoint, Bounds, CircleProps, LatLng, ManifestMapData, MapConfig, MapRuntime, MapTheme,
    MarkerId, MarkerInteraction, OptionExt, OverlayManager, OverlayStats, PathStyle, RadiusCircle,
    RenderedMarker, ResizeDebouncer, Result, TripPathLayer, ViewportChange, VisibilitySettings,
    VisibilityToggle,
};

/// Loading and error overlays shown above the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapStatus {
    pub loading: bool,
    /// Error text, absent once dismissed
    pub error: Option<String>,
}

/// Snapshot of what the host should draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    /// Changes whenever the map must be remounted
    pub map_key: String,
    /// Visible markers only
    pub markers: Vec<RenderedMarker>,
    pub path_layers: Vec<TripPathLayer>,
    pub status: MapStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub points: usize,
    pub located_points: usize,
    pub visible_markers: usize,
    pub live_circles: usize,
    pub zoom_key: u64,
    pub map_bound: bool,
    #[serde(skip)]
    pub overlay: OverlayStats,
}

pub struct ManifestMap<R: MapRuntime> {
    config: MapConfig,
    theme: MapTheme,
    style: PathStyle,
    data: ManifestMapData,
    points: Vec<AdjustedPoint>,
    settings: VisibilitySettings,
    map: Option<R>,
    overlay: OverlayManager<R::Overlay>,
    circles: HashMap<MarkerId, RadiusCircle<R::Circle>>,
    interaction: MarkerInteraction,
    resize: ResizeDebouncer,
    error_dismissed: bool,
}

impl<R: MapRuntime> ManifestMap<R> {
    /// Create an empty session. Fails when the config does not validate.
    pub fn new(config: MapConfig, theme: MapTheme) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, theme))
    }

    pub fn with_defaults() -> Self {
        Self::build(MapConfig::default(), MapTheme::default())
    }

    fn build(config: MapConfig, theme: MapTheme) -> Self {
        let style = PathStyle::new(&theme, &config);
        let resize = ResizeDebouncer::new(0.0, 0.0, &config);
        Self {
            config,
            theme,
            style,
            data: ManifestMapData::default(),
            points: Vec::new(),
            settings: VisibilitySettings::default(),
            map: None,
            overlay: OverlayManager::new(),
            circles: HashMap::new(),
            interaction: MarkerInteraction::new(),
            resize,
            error_dismissed: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn theme(&self) -> &MapTheme {
        &self.theme
    }

    pub fn settings(&self) -> VisibilitySettings {
        self.settings
    }

    /// All points with display coordinates, including hidden ones.
    pub fn points(&self) -> &[AdjustedPoint] {
        &self.points
    }

    pub fn visible_points(&self) -> Vec<&AdjustedPoint> {
        filter_visible(&self.points, &self.settings)
    }

    fn visible_point(&self, id: &MarkerId) -> Option<&AdjustedPoint> {
        self.points
            .iter()
            .find(|p| &p.id == id && is_marker_visible(p.marker_type(), &self.settings))
    }

    pub fn active_marker(&self) -> Option<&MarkerId> {
        self.interaction.active()
    }

    pub fn interaction(&self) -> &MarkerInteraction {
        &self.interaction
    }

    pub fn map(&self) -> Option<&R> {
        self.map.as_ref()
    }

    /// The bound map instance, or [`crate::MapError::NoMapInstance`] naming `operation`.
    pub fn require_map(&self, operation: &str) -> Result<&R> {
        self.map.as_ref().ok_or_no_map(operation)
    }

    pub fn map_key(&self) -> String {
        format!("{}-{}", self.theme.map_id(&self.config), self.resize.zoom_key())
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Replace the payload and recompute everything derived from it.
    pub fn set_data(&mut self, data: ManifestMapData) {
        if data.error != self.data.error {
            self.error_dismissed = false;
        }
        self.data = data;
        for (index, point) in self.data.points.iter().enumerate() {
            if let Err(e) = point.checked_position(index) {
                warn!("[ManifestMap] Skipping marker: {}", e);
            }
        }
        self.points = resolve_overlaps(&self.data.points, &self.config);
        self.interaction.retain_markers(&self.points);
        // A reused id may now belong to a hidden category
        self.interaction.prune_hidden(&self.points, &self.settings);
        info!(
            "[ManifestMap] Loaded {} point(s), {} with geometry",
            self.data.points.len(),
            self.points.len()
        );
        self.sync_resources();
        self.fit_all_points();
    }

    /// Parse and apply a JSON payload.
    pub fn set_data_json(&mut self, json: &str) -> Result<()> {
        let data = ManifestMapData::from_json(json)?;
        self.set_data(data);
        Ok(())
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.data.loading = loading;
    }

    /// Set or clear the error text. A new error is shown even if an
    /// earlier one was dismissed.
    pub fn set_error(&mut self, error: Option<String>) {
        if error != self.data.error {
            self.error_dismissed = false;
        }
        self.data.error = error;
    }

    pub fn dismiss_error(&mut self) {
        self.error_dismissed = true;
    }

    pub fn set_theme(&mut self, theme: MapTheme) {
        if theme == self.theme {
            return;
        }
        self.style = PathStyle::new(&theme, &self.config);
        self.theme = theme;
        self.sync_resources();
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    /// Flip one visibility flag and return its new value.
    pub fn toggle_visibility(&mut self, toggle: VisibilityToggle) -> bool {
        let value = self.settings.toggle(toggle);
        debug!("[ManifestMap] {:?} -> {}", toggle, value);
        self.apply_visibility();
        value
    }

    pub fn set_visibility(&mut self, settings: VisibilitySettings) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        self.apply_visibility();
    }

    fn apply_visibility(&mut self) {
        if self.interaction.prune_hidden(&self.points, &self.settings) {
            debug!("[ManifestMap] Cleared selection of hidden markers");
        }
        self.sync_resources();
    }

    // ========================================================================
    // Map instance
    // ========================================================================

    /// Bind a map instance. A different instance replaces the current one;
    /// the same instance is a no-op.
    pub fn attach_map(&mut self, map: R) {
        let id = map.instance_id();
        if self.map.as_ref().map(|m| m.instance_id()) == Some(id) {
            return;
        }
        info!("[ManifestMap] Attaching map instance {}", id);
        self.map = Some(map);
        self.sync_resources();
        self.fit_all_points();
    }

    /// Release every drawable and forget the map instance.
    pub fn detach_map(&mut self) -> Option<R> {
        self.overlay.unbind();
        for circle in self.circles.values_mut() {
            circle.reset();
        }
        self.resize.cancel();
        let map = self.map.take();
        if let Some(map) = &map {
            info!("[ManifestMap] Detached map instance {}", map.instance_id());
        }
        map
    }

    /// Fit the viewport to every visible point's source coordinates.
    ///
    /// Returns the bounds applied, or `None` when nothing is visible or no
    /// map is bound.
    pub fn zoom_to_fit(&self) -> Option<Bounds> {
        let positions: Vec<_> = self.visible_points().iter().map(|p| p.raw).collect();
        self.fit(&positions)
    }

    fn fit_all_points(&self) {
        let positions: Vec<_> = self.points.iter().map(|p| p.raw).collect();
        self.fit(&positions);
    }

    fn fit(&self, positions: &[LatLng]) -> Option<Bounds> {
        let map = self.map.as_ref()?;
        let bounds = Bounds::from_points(positions)?;
        map.fit_bounds(&bounds, self.config.default_padding);
        Some(bounds)
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    /// Select a marker and move the viewport to it.
    ///
    /// Unknown and hidden markers are ignored.
    pub fn click_marker(&mut self, id: &MarkerId) -> Option<ViewportChange> {
        let point = self
            .points
            .iter()
            .find(|p| &p.id == id && is_marker_visible(p.marker_type(), &self.settings))?;
        let change = self
            .interaction
            .click_marker(point, self.map.as_ref(), &self.config);
        self.sync_circles();
        Some(change)
    }

    /// Hover enter/leave. Entering a hidden or unknown marker is ignored.
    pub fn hover_marker(&mut self, id: &MarkerId, hovered: bool) {
        if hovered && self.visible_point(id).is_none() {
            debug!("[ManifestMap] Ignoring hover on hidden marker {}", id);
            return;
        }
        self.interaction.set_hovered(id, hovered);
        self.sync_circles();
    }

    /// Background click clears the selection.
    pub fn click_map(&mut self) {
        self.interaction.clear_active();
        self.sync_circles();
    }

    /// Closing the popup of the active marker clears the selection.
    pub fn close_popup(&mut self, id: &MarkerId) {
        if self.interaction.is_active(id) {
            self.interaction.clear_active();
            self.sync_circles();
        }
    }

    /// Click on the radius circle owned by `owner`.
    pub fn click_circle(&mut self, owner: &MarkerId) -> bool {
        let cleared = self
            .circles
            .get(owner)
            .is_some_and(|circle| circle.handle_click(&mut self.interaction));
        if cleared {
            self.sync_circles();
        }
        cleared
    }

    // ========================================================================
    // Resize
    // ========================================================================

    /// Seed the viewport size measured at mount; later resizes compare
    /// against it.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.resize.set_size(width, height);
    }

    pub fn handle_resize(&mut self, width: f64, height: f64, now: Instant) {
        self.resize.on_resize(width, height, now);
    }

    /// Returns `true` when the map key changed and the host should remount.
    pub fn poll_resize(&mut self, now: Instant) -> bool {
        let remount = self.resize.poll(now);
        if remount {
            info!("[ManifestMap] Page zoom detected, new map key {}", self.map_key());
        }
        remount
    }

    // ========================================================================
    // Output
    // ========================================================================

    pub fn render(&self) -> MapFrame {
        let markers = self
            .visible_points()
            .into_iter()
            .map(|p| {
                describe_marker(
                    p,
                    &self.theme,
                    self.interaction.is_active(&p.id),
                    self.interaction.is_hovered(&p.id),
                )
            })
            .collect();

        MapFrame {
            map_key: self.map_key(),
            markers,
            path_layers: path_layers(&self.points, &self.settings, &self.style),
            status: MapStatus {
                loading: self.data.loading,
                error: self.data.error.clone().filter(|_| !self.error_dismissed),
            },
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            points: self.data.points.len(),
            located_points: self.points.len(),
            visible_markers: self.visible_points().len(),
            live_circles: self.circles.values().filter(|c| c.is_drawn()).count(),
            zoom_key: self.resize.zoom_key(),
            map_bound: self.map.is_some(),
            overlay: self.overlay.stats(),
        }
    }

    // ========================================================================
    // Resource reconciliation
    // ========================================================================

    fn sync_resources(&mut self) {
        let layers = path_layers(&self.points, &self.settings, &self.style);
        match &self.map {
            Some(map) => self.overlay.bind(map, &layers),
            None => {
                self.overlay.update(&layers);
            }
        }
        self.sync_circles();
    }

    /// One circle per visible marker with a radius; the rest are released.
    fn sync_circles(&mut self) {
        let Self {
            points,
            settings,
            theme,
            map,
            circles,
            interaction,
            ..
        } = self;

        let mut wanted = HashSet::new();
        for point in points
            .iter()
            .filter(|p| is_marker_visible(p.marker_type(), settings))
        {
            let Some(radius_m) = point.point.effective_radius() else {
                continue;
            };
            let props = CircleProps {
                owner: point.id.clone(),
                center: point.adjusted,
                radius_m,
                visible: interaction.is_highlighted(&point.id),
                colour: circle_colour(point.marker_type(), theme).to_string(),
            };
            circles
                .entry(point.id.clone())
                .or_default()
                .sync(map.as_ref(), &props);
            wanted.insert(point.id.clone());
        }

        // Dropping a renderer releases its circle
        circles.retain(|id, _| wanted.contains(id));
    }
}
