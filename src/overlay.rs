//! # Overlay Lifecycle
//!
//! Owns the single drawing overlay bound to the current map instance.
//!
//! Two independent triggers drive it:
//! - **identity** ([`OverlayManager::bind`]): a map instance became
//!   available or was replaced. The old overlay is detached and released
//!   before the new one is created and attached.
//! - **content** ([`OverlayManager::update`]): the derived layers changed.
//!   Layers are pushed onto the existing overlay; it is never recreated for
//!   a content change.
//!
//! Teardown ([`OverlayManager::unbind`]) detaches and releases.

use log::{debug, info, warn};

use crate::{DrawingOverlay, MapInstanceId, MapRuntime, TripPathLayer};

/// Lifetime counters, mainly for lifecycle assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayStats {
    pub created: u32,
    pub destroyed: u32,
    pub layer_pushes: u32,
}

impl OverlayStats {
    /// Overlays currently alive according to this manager.
    pub fn live(&self) -> u32 {
        self.created - self.destroyed
    }
}

enum OverlayState<O> {
    Unbound,
    Bound { map_id: MapInstanceId, overlay: O },
}

/// Single-slot owner of the drawing overlay.
pub struct OverlayManager<O: DrawingOverlay> {
    state: OverlayState<O>,
    /// Last layers pushed, re-applied when a new overlay is bound
    layers: Vec<TripPathLayer>,
    stats: OverlayStats,
}

impl<O: DrawingOverlay> Default for OverlayManager<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: DrawingOverlay> OverlayManager<O> {
    pub fn new() -> Self {
        Self {
            state: OverlayState::Unbound,
            layers: Vec::new(),
            stats: OverlayStats::default(),
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, OverlayState::Bound { .. })
    }

    /// Map instance the overlay is attached to, if any.
    pub fn bound_map(&self) -> Option<MapInstanceId> {
        match &self.state {
            OverlayState::Bound { map_id, .. } => Some(*map_id),
            OverlayState::Unbound => None,
        }
    }

    pub fn layers(&self) -> &[TripPathLayer] {
        &self.layers
    }

    pub fn stats(&self) -> OverlayStats {
        self.stats
    }

    /// Identity trigger: bind to `map`, replacing any overlay on another instance.
    ///
    /// Binding to the instance already bound is a no-op. When the runtime
    /// refuses to create an overlay the manager stays unbound and the path
    /// is simply not drawn.
    pub fn bind<R>(&mut self, map: &R, layers: &[TripPathLayer])
    where
        R: MapRuntime<Overlay = O>,
    {
        let map_id = map.instance_id();
        if self.bound_map() == Some(map_id) {
            if !self.update(layers) {
                debug!("[Overlay] Map {} already bound, layers unchanged", map_id);
            }
            return;
        }

        // Teardown strictly before creation
        self.unbind();

        match map.create_overlay() {
            Ok(mut overlay) => {
                self.stats.created += 1;
                overlay.set_layers(layers);
                self.stats.layer_pushes += 1;
                self.layers = layers.to_vec();
                self.state = OverlayState::Bound { map_id, overlay };
                info!(
                    "[Overlay] Bound to map {} with {} layer(s)",
                    map_id,
                    layers.len()
                );
            }
            Err(e) => {
                self.layers = layers.to_vec();
                warn!("[Overlay] Could not create overlay for map {}: {}", map_id, e);
            }
        }
    }

    /// Content trigger: push `layers` onto the existing overlay.
    ///
    /// Returns `true` when layers were pushed. Unchanged layers and an
    /// unbound manager are no-ops; the layers are still remembered for the
    /// next bind.
    pub fn update(&mut self, layers: &[TripPathLayer]) -> bool {
        if self.layers == layers {
            return false;
        }
        self.layers = layers.to_vec();

        match &mut self.state {
            OverlayState::Bound { map_id, overlay } => {
                overlay.set_layers(layers);
                self.stats.layer_pushes += 1;
                debug!(
                    "[Overlay] Pushed {} layer(s) to map {}",
                    layers.len(),
                    map_id
                );
                true
            }
            OverlayState::Unbound => false,
        }
    }

    /// Teardown: detach and release the overlay if one is bound.
    pub fn unbind(&mut self) {
        if let OverlayState::Bound {
            map_id,
            mut overlay,
        } = std::mem::replace(&mut self.state, OverlayState::Unbound)
        {
            overlay.detach();
            self.stats.destroyed += 1;
            info!("[Overlay] Released overlay from map {}", map_id);
        }
    }
}

impl<O: DrawingOverlay> Drop for OverlayManager<O> {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessMap, HeadlessOverlay, MapEvent};
    use crate::{resolve_overlaps, ManifestMapPoint, MapConfig, MarkerType, PathStyle};
    use chrono::{TimeZone, Utc};

    fn layers(lat_shift: f64) -> Vec<TripPathLayer> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let points = vec![
            ManifestMapPoint::new(MarkerType::StartPlace, 51.5 + lat_shift, -0.12).with_timestamp(start),
            ManifestMapPoint::new(MarkerType::EndPlace, 51.6, -0.12)
                .with_timestamp(start + chrono::Duration::hours(1)),
        ];
        let adjusted = resolve_overlaps(&points, &MapConfig::default());
        crate::build_trip_path(&adjusted, &PathStyle::default())
            .into_iter()
            .collect()
    }

    #[test]
    fn test_bind_creates_and_pushes_layers() {
        let map = HeadlessMap::new(1);
        let mut manager: OverlayManager<HeadlessOverlay> = OverlayManager::new();

        manager.bind(&map, &layers(0.0));

        assert!(manager.is_bound());
        assert_eq!(manager.bound_map(), Some(1));
        assert_eq!(
            map.events(),
            vec![
                MapEvent::OverlayCreated { map: 1, overlay: 1 },
                MapEvent::OverlayLayers {
                    overlay: 1,
                    layer_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_content_change_reuses_overlay() {
        let map = HeadlessMap::new(1);
        let mut manager = OverlayManager::new();
        manager.bind(&map, &layers(0.0));
        map.clear_events();

        assert!(manager.update(&layers(0.01)));
        assert!(!manager.update(&layers(0.01)));
        assert!(manager.update(&[]));

        assert_eq!(manager.stats().created, 1);
        assert_eq!(manager.stats().destroyed, 0);
        assert!(map
            .events()
            .iter()
            .all(|e| matches!(e, MapEvent::OverlayLayers { overlay: 1, .. })));
    }

    #[test]
    fn test_rebinding_same_instance_is_not_a_remount() {
        let map = HeadlessMap::new(7);
        let mut manager = OverlayManager::new();
        manager.bind(&map, &layers(0.0));
        manager.bind(&map, &layers(0.0));

        assert_eq!(manager.stats().created, 1);
        assert_eq!(manager.stats().layer_pushes, 1);
        assert_eq!(map.live_overlays(), 1);

        // Same instance with new content only pushes layers
        manager.bind(&map, &layers(0.01));
        assert_eq!(manager.stats().created, 1);
        assert_eq!(manager.stats().layer_pushes, 2);
    }

    #[test]
    fn test_identity_change_destroys_before_create() {
        let first = HeadlessMap::new(1);
        let second = first.remount(2);
        let mut manager = OverlayManager::new();
        let content = layers(0.0);

        manager.bind(&first, &content);
        first.clear_events();
        manager.bind(&second, &content);

        assert_eq!(
            second.events(),
            vec![
                MapEvent::OverlayDetached { overlay: 1 },
                MapEvent::OverlayCreated { map: 2, overlay: 2 },
                MapEvent::OverlayLayers {
                    overlay: 2,
                    layer_count: 1
                },
            ]
        );
        assert_eq!(second.max_live_overlays(), 1);
        assert_eq!(manager.stats().live(), 1);
    }

    #[test]
    fn test_update_while_unbound_is_remembered() {
        let map = HeadlessMap::new(1);
        let mut manager: OverlayManager<HeadlessOverlay> = OverlayManager::new();

        assert!(!manager.update(&layers(0.0)));
        assert_eq!(manager.layers().len(), 1);

        manager.bind(&map, &[]);
        assert!(manager.layers().is_empty());
    }

    #[test]
    fn test_refused_overlay_leaves_manager_unbound() {
        let map = HeadlessMap::new(1).refusing_overlays();
        let mut manager = OverlayManager::new();
        manager.bind(&map, &layers(0.0));

        assert!(!manager.is_bound());
        assert_eq!(manager.stats().created, 0);
    }

    #[test]
    fn test_unbind_and_drop_release() {
        let map = HeadlessMap::new(1);
        {
            let mut manager = OverlayManager::new();
            manager.bind(&map, &layers(0.0));
            manager.unbind();
            manager.unbind();
            assert_eq!(manager.stats().destroyed, 1);
            manager.bind(&map, &layers(0.0));
        }
        assert_eq!(map.live_overlays(), 0);
    }
}
