//! Headless map runtime.
//!
//! Records every operation instead of drawing. Useful for snapshot
//! rendering on a host without a map widget and for asserting resource
//! lifecycles in tests: live overlay and circle counts are tracked per
//! shared log, across remounts.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::{
    Bounds, CircleOptions, DrawingOverlay, LatLng, MapCircle, MapError, MapInstanceId, MapRuntime,
    MarkerId, Result, TripPathLayer,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    FitBounds {
        map: MapInstanceId,
        bounds: Bounds,
        padding: u32,
    },
    PanTo {
        map: MapInstanceId,
        position: LatLng,
    },
    SetZoom {
        map: MapInstanceId,
        zoom: u8,
    },
    OverlayCreated {
        map: MapInstanceId,
        overlay: u64,
    },
    OverlayLayers {
        overlay: u64,
        layer_count: usize,
    },
    OverlayDetached {
        overlay: u64,
    },
    CircleCreated {
        map: MapInstanceId,
        circle: u64,
        owner: MarkerId,
    },
    CircleDetached {
        circle: u64,
    },
}

#[derive(Debug, Default)]
struct HeadlessLog {
    events: Vec<MapEvent>,
    next_handle: u64,
    live_overlays: BTreeSet<u64>,
    live_circles: BTreeSet<u64>,
    max_live_overlays: usize,
}

impl HeadlessLog {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// A recording map instance.
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    id: MapInstanceId,
    log: Rc<RefCell<HeadlessLog>>,
    refuse_overlays: bool,
}

impl HeadlessMap {
    pub fn new(id: MapInstanceId) -> Self {
        Self {
            id,
            log: Rc::new(RefCell::new(HeadlessLog::default())),
            refuse_overlays: false,
        }
    }

    /// A new map instance sharing this one's log, as after a host remount.
    pub fn remount(&self, id: MapInstanceId) -> Self {
        Self {
            id,
            log: Rc::clone(&self.log),
            refuse_overlays: self.refuse_overlays,
        }
    }

    /// Make `create_overlay` fail, simulating a runtime without overlay support.
    pub fn refusing_overlays(mut self) -> Self {
        self.refuse_overlays = true;
        self
    }

    pub fn events(&self) -> Vec<MapEvent> {
        self.log.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.log.borrow_mut().events.clear();
    }

    pub fn live_overlays(&self) -> usize {
        self.log.borrow().live_overlays.len()
    }

    /// Highest number of overlays that were ever alive at the same time.
    pub fn max_live_overlays(&self) -> usize {
        self.log.borrow().max_live_overlays
    }

    pub fn live_circles(&self) -> usize {
        self.log.borrow().live_circles.len()
    }

    fn record(&self, event: MapEvent) {
        self.log.borrow_mut().events.push(event);
    }
}

#[derive(Debug)]
pub struct HeadlessOverlay {
    handle: u64,
    log: Rc<RefCell<HeadlessLog>>,
    attached: bool,
}

impl HeadlessOverlay {
    pub fn handle(&self) -> u64 {
        self.handle
    }
}

impl DrawingOverlay for HeadlessOverlay {
    fn set_layers(&mut self, layers: &[TripPathLayer]) {
        if !self.attached {
            return;
        }
        self.log.borrow_mut().events.push(MapEvent::OverlayLayers {
            overlay: self.handle,
            layer_count: layers.len(),
        });
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        let mut log = self.log.borrow_mut();
        log.live_overlays.remove(&self.handle);
        log.events.push(MapEvent::OverlayDetached {
            overlay: self.handle,
        });
    }
}

#[derive(Debug)]
pub struct HeadlessCircle {
    handle: u64,
    log: Rc<RefCell<HeadlessLog>>,
    attached: bool,
}

impl MapCircle for HeadlessCircle {
    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        let mut log = self.log.borrow_mut();
        log.live_circles.remove(&self.handle);
        log.events.push(MapEvent::CircleDetached {
            circle: self.handle,
        });
    }
}

impl MapRuntime for HeadlessMap {
    type Overlay = HeadlessOverlay;
    type Circle = HeadlessCircle;

    fn instance_id(&self) -> MapInstanceId {
        self.id
    }

    fn fit_bounds(&self, bounds: &Bounds, padding: u32) {
        self.record(MapEvent::FitBounds {
            map: self.id,
            bounds: *bounds,
            padding,
        });
    }

    fn pan_to(&self, position: LatLng) {
        self.record(MapEvent::PanTo {
            map: self.id,
            position,
        });
    }

    fn set_zoom(&self, zoom: u8) {
        self.record(MapEvent::SetZoom { map: self.id, zoom });
    }

    fn create_overlay(&self) -> Result<Self::Overlay> {
        if self.refuse_overlays {
            return Err(MapError::OverlayUnavailable {
                message: format!("map {} has no overlay support", self.id),
            });
        }
        let mut guard = self.log.borrow_mut();
        let log = &mut *guard;
        let handle = log.next_handle();
        log.live_overlays.insert(handle);
        log.max_live_overlays = log.max_live_overlays.max(log.live_overlays.len());
        log.events.push(MapEvent::OverlayCreated {
            map: self.id,
            overlay: handle,
        });
        drop(guard);
        Ok(HeadlessOverlay {
            handle,
            log: Rc::clone(&self.log),
            attached: true,
        })
    }

    fn create_circle(&self, options: &CircleOptions) -> Result<Self::Circle> {
        let mut guard = self.log.borrow_mut();
        let log = &mut *guard;
        let handle = log.next_handle();
        log.live_circles.insert(handle);
        log.events.push(MapEvent::CircleCreated {
            map: self.id,
            circle: handle,
            owner: options.owner.clone(),
        });
        drop(guard);
        Ok(HeadlessCircle {
            handle,
            log: Rc::clone(&self.log),
            attached: true,
        })
    }
}
