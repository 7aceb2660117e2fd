//! Radius circle lifecycle.
//!
//! Each marker with a radius owns at most one circle. Whenever the circle's
//! inputs change (map instance, center, radius, visibility, colour) the
//! existing circle is detached and released first; a new one is created
//! only when visible and a map instance exists.

use log::{debug, warn};

use crate::{
    CircleOptions, LatLng, MapCircle, MapInstanceId, MapRuntime, MarkerId, MarkerInteraction,
};

/// Inputs of one circle.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleProps {
    pub owner: MarkerId,
    pub center: LatLng,
    pub radius_m: f64,
    pub visible: bool,
    pub colour: String,
}

type CircleDeps = (Option<MapInstanceId>, CircleProps);

pub struct RadiusCircle<C: MapCircle> {
    circle: Option<C>,
    deps: Option<CircleDeps>,
    created: u32,
    destroyed: u32,
}

impl<C: MapCircle> Default for RadiusCircle<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: MapCircle> RadiusCircle<C> {
    pub fn new() -> Self {
        Self {
            circle: None,
            deps: None,
            created: 0,
            destroyed: 0,
        }
    }

    pub fn is_drawn(&self) -> bool {
        self.circle.is_some()
    }

    /// Circles created and destroyed over this renderer's lifetime.
    pub fn counts(&self) -> (u32, u32) {
        (self.created, self.destroyed)
    }

    /// Re-run the circle effect if its inputs changed.
    ///
    /// Returns `true` when the effect ran.
    pub fn sync<R>(&mut self, map: Option<&R>, props: &CircleProps) -> bool
    where
        R: MapRuntime<Circle = C>,
    {
        let deps = (map.map(|m| m.instance_id()), props.clone());
        if self.deps.as_ref() == Some(&deps) {
            return false;
        }

        self.release();
        self.deps = Some(deps);

        if !props.visible {
            return true;
        }
        let Some(map) = map else {
            debug!("[RadiusCircle] No map bound for {}", props.owner);
            return true;
        };

        let options = CircleOptions::new(
            props.owner.clone(),
            props.center,
            props.radius_m,
            &props.colour,
        );
        match map.create_circle(&options) {
            Ok(circle) => {
                self.circle = Some(circle);
                self.created += 1;
            }
            Err(e) => warn!("[RadiusCircle] Could not draw circle for {}: {}", props.owner, e),
        }
        true
    }

    /// Detach and release the current circle, if any.
    pub fn release(&mut self) {
        if let Some(mut circle) = self.circle.take() {
            circle.detach();
            self.destroyed += 1;
        }
    }

    /// Teardown: release and forget the inputs so the next sync always runs.
    pub fn reset(&mut self) {
        self.release();
        self.deps = None;
    }

    /// Click on the drawn circle: deselects its owner if it is active.
    pub fn handle_click(&self, interaction: &mut MarkerInteraction) -> bool {
        let Some((_, props)) = &self.deps else {
            return false;
        };
        if self.circle.is_some() && interaction.is_active(&props.owner) {
            interaction.clear_active();
            return true;
        }
        false
    }
}

impl<C: MapCircle> Drop for RadiusCircle<C> {
    fn drop(&mut self) {
        self.release();
    }
}
