//! Host map runtime abstraction.
//!
//! The engine never talks to a concrete map widget. The host implements
//! [`MapRuntime`] for its current map instance; overlays and circles it
//! hands out are owned exclusively by the engine component that created
//! them and are released through `detach`.

use serde::Serialize;

use crate::{Bounds, LatLng, MarkerId, Result, TripPathLayer};

/// Identity of a map instance. A new value means the host recreated the map.
pub type MapInstanceId = u64;

/// Imperative drawing surface bound to one map instance.
pub trait DrawingOverlay {
    /// Replace the overlay's layers in place.
    fn set_layers(&mut self, layers: &[TripPathLayer]);

    /// Detach from the map and release native resources.
    fn detach(&mut self);
}

/// A radius circle attached to one map instance.
pub trait MapCircle {
    /// Detach from the map and release native resources.
    fn detach(&mut self);
}

/// Options for constructing a radius circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleOptions {
    /// Marker the circle belongs to; click events are routed back with it
    pub owner: MarkerId,
    pub center: LatLng,
    pub radius_m: f64,
    pub stroke_color: String,
    pub stroke_opacity: f64,
    pub stroke_weight: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub clickable: bool,
}

impl CircleOptions {
    pub fn new(owner: MarkerId, center: LatLng, radius_m: f64, colour: &str) -> Self {
        Self {
            owner,
            center,
            radius_m,
            stroke_color: colour.to_string(),
            stroke_opacity: 0.8,
            stroke_weight: 1.0,
            fill_color: colour.to_string(),
            fill_opacity: 0.1,
            clickable: true,
        }
    }
}

/// A live map instance provided by the host.
pub trait MapRuntime {
    type Overlay: DrawingOverlay;
    type Circle: MapCircle;

    fn instance_id(&self) -> MapInstanceId;

    /// Fit the viewport to `bounds` with `padding` pixels.
    fn fit_bounds(&self, bounds: &Bounds, padding: u32);

    fn pan_to(&self, position: LatLng);

    fn set_zoom(&self, zoom: u8);

    /// Construct a drawing overlay already attached to this map.
    fn create_overlay(&self) -> Result<Self::Overlay>;

    /// Construct a circle already attached to this map.
    fn create_circle(&self, options: &CircleOptions) -> Result<Self::Circle>;
}
