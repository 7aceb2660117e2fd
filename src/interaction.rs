//! Marker selection and hover state.
//!
//! At most one marker is active. Hover is tracked per marker and never
//! changes the active marker. A marker whose category gets hidden loses
//! both its hover flag and, if it held it, the active selection.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::geo_utils::circle_bounds;
use crate::{
    is_marker_visible, AdjustedPoint, Bounds, LatLng, MapConfig, MapRuntime, MarkerId,
    VisibilitySettings,
};

/// Viewport move triggered by selecting a marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewportChange {
    /// Fit the circle around a marker with a radius
    FitBounds { bounds: Bounds, padding: u32 },
    /// Center on a marker without a radius at the default zoom
    PanAndZoom { center: LatLng, zoom: u8 },
}

impl ViewportChange {
    pub fn for_marker(point: &AdjustedPoint, config: &MapConfig) -> Self {
        match point.point.effective_radius() {
            Some(radius) => ViewportChange::FitBounds {
                bounds: circle_bounds(point.adjusted, radius),
                padding: config.default_padding,
            },
            None => ViewportChange::PanAndZoom {
                center: point.adjusted,
                zoom: config.default_zoom,
            },
        }
    }

    pub fn apply<R: MapRuntime>(&self, map: &R) {
        match self {
            ViewportChange::FitBounds { bounds, padding } => map.fit_bounds(bounds, *padding),
            ViewportChange::PanAndZoom { center, zoom } => {
                map.pan_to(*center);
                map.set_zoom(*zoom);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkerInteraction {
    active: Option<MarkerId>,
    hovered: HashSet<MarkerId>,
}

impl MarkerInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&MarkerId> {
        self.active.as_ref()
    }

    pub fn is_active(&self, id: &MarkerId) -> bool {
        self.active.as_ref() == Some(id)
    }

    pub fn is_hovered(&self, id: &MarkerId) -> bool {
        self.hovered.contains(id)
    }

    /// Popups and radius circles show while a marker is active or hovered.
    pub fn is_highlighted(&self, id: &MarkerId) -> bool {
        self.is_active(id) || self.is_hovered(id)
    }

    pub fn select(&mut self, id: MarkerId) {
        self.active = Some(id);
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn set_hovered(&mut self, id: &MarkerId, hovered: bool) {
        if hovered {
            self.hovered.insert(id.clone());
        } else {
            self.hovered.remove(id);
        }
    }

    /// Select `point` and move the viewport to it.
    ///
    /// The viewport move is skipped when no map instance is bound.
    pub fn click_marker<R: MapRuntime>(
        &mut self,
        point: &AdjustedPoint,
        map: Option<&R>,
        config: &MapConfig,
    ) -> ViewportChange {
        self.select(point.id.clone());
        let change = ViewportChange::for_marker(point, config);
        match map {
            Some(map) => change.apply(map),
            None => debug!("[ManifestMap] No map bound, skipping viewport move for {}", point.id),
        }
        change
    }

    /// Drop hover and selection of markers hidden under `settings`.
    ///
    /// Returns `true` if any state changed.
    pub fn prune_hidden(&mut self, points: &[AdjustedPoint], settings: &VisibilitySettings) -> bool {
        let mut changed = false;
        for point in points
            .iter()
            .filter(|p| !is_marker_visible(p.marker_type(), settings))
        {
            changed |= self.hovered.remove(&point.id);
            if self.is_active(&point.id) {
                self.active = None;
                changed = true;
            }
        }
        changed
    }

    /// Forget state for markers that no longer exist.
    pub fn retain_markers(&mut self, points: &[AdjustedPoint]) {
        let ids: HashSet<&MarkerId> = points.iter().map(|p| &p.id).collect();
        self.hovered.retain(|id| ids.contains(id));
        if self.active.as_ref().is_some_and(|id| !ids.contains(id)) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessMap, MapEvent};
    use crate::{resolve_overlaps, ManifestMapPoint, MarkerType, VisibilityToggle};

    fn sample() -> Vec<AdjustedPoint> {
        let points = vec![
            ManifestMapPoint::new(MarkerType::StartPlace, 51.50, -0.12),
            ManifestMapPoint::new(MarkerType::ContentsAdded, 51.51, -0.12).with_radius(200.0),
            ManifestMapPoint::new(MarkerType::LatestLocation, 51.52, -0.12),
        ];
        resolve_overlaps(&points, &MapConfig::default())
    }

    #[test]
    fn test_single_selection() {
        let points = sample();
        let mut interaction = MarkerInteraction::new();
        let config = MapConfig::default();

        interaction.click_marker::<HeadlessMap>(&points[0], None, &config);
        interaction.click_marker::<HeadlessMap>(&points[2], None, &config);

        assert!(!interaction.is_active(&points[0].id));
        assert!(interaction.is_active(&points[2].id));
        assert_eq!(interaction.active(), Some(&points[2].id));
    }

    #[test]
    fn test_hover_does_not_change_selection() {
        let points = sample();
        let mut interaction = MarkerInteraction::new();
        interaction.select(points[0].id.clone());

        interaction.set_hovered(&points[1].id, true);
        assert!(interaction.is_highlighted(&points[1].id));
        assert!(interaction.is_active(&points[0].id));

        interaction.set_hovered(&points[1].id, false);
        assert!(!interaction.is_highlighted(&points[1].id));
        assert!(interaction.is_highlighted(&points[0].id));
    }

    #[test]
    fn test_click_without_radius_pans_and_zooms() {
        let points = sample();
        let map = HeadlessMap::new(1);
        let mut interaction = MarkerInteraction::new();

        interaction.click_marker(&points[0], Some(&map), &MapConfig::default());

        assert_eq!(
            map.events(),
            vec![
                MapEvent::PanTo {
                    map: 1,
                    position: points[0].adjusted
                },
                MapEvent::SetZoom { map: 1, zoom: 18 },
            ]
        );
    }

    #[test]
    fn test_click_with_radius_fits_circle() {
        let points = sample();
        let map = HeadlessMap::new(1);
        let mut interaction = MarkerInteraction::new();

        let change = interaction.click_marker(&points[1], Some(&map), &MapConfig::default());

        match change {
            ViewportChange::FitBounds { bounds, padding } => {
                assert_eq!(padding, 100);
                assert!(bounds.contains(points[1].adjusted));
                assert!(bounds.max_lat > points[1].adjusted.latitude);
            }
            other => panic!("unexpected change {:?}", other),
        }
        assert!(matches!(map.events()[0], MapEvent::FitBounds { .. }));
    }

    #[test]
    fn test_hiding_active_category_clears_selection_and_hover() {
        let points = sample();
        let mut interaction = MarkerInteraction::new();
        interaction.select(points[1].id.clone());
        interaction.set_hovered(&points[1].id, true);
        interaction.set_hovered(&points[0].id, true);

        let mut settings = VisibilitySettings::default();
        settings.set(VisibilityToggle::ContentsPlaces, false);

        assert!(interaction.prune_hidden(&points, &settings));
        assert_eq!(interaction.active(), None);
        assert!(!interaction.is_hovered(&points[1].id));
        assert!(interaction.is_hovered(&points[0].id));
        assert!(!interaction.prune_hidden(&points, &settings));
    }

    #[test]
    fn test_hiding_other_category_keeps_selection() {
        let points = sample();
        let mut interaction = MarkerInteraction::new();
        interaction.select(points[0].id.clone());

        let mut settings = VisibilitySettings::default();
        settings.set(VisibilityToggle::LatestLocation, false);

        assert!(!interaction.prune_hidden(&points, &settings));
        assert!(interaction.is_active(&points[0].id));
    }

    #[test]
    fn test_retain_markers_drops_vanished_selection() {
        let points = sample();
        let mut interaction = MarkerInteraction::new();
        interaction.select(points[2].id.clone());
        interaction.set_hovered(&points[2].id, true);

        interaction.retain_markers(&points[..2]);
        assert_eq!(interaction.active(), None);
        assert!(!interaction.is_hovered(&points[2].id));
    }
}
