//! Resize debouncing.
//!
//! A browser page zoom resizes the window while keeping its aspect ratio;
//! a fullscreen toggle changes the ratio. Only the former should remount
//! the map. Resize events are coalesced within the debounce window and the
//! remount key is bumped once the window elapses without further events.
//!
//! No timers are involved: the host passes the instant of each event and
//! polls with the current instant.

use std::time::{Duration, Instant};

use log::debug;

use crate::MapConfig;

#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    last_size: (f64, f64),
    ratio_threshold: f64,
    delay: Duration,
    deadline: Option<Instant>,
    zoom_key: u64,
}

impl ResizeDebouncer {
    pub fn new(width: f64, height: f64, config: &MapConfig) -> Self {
        Self {
            last_size: (width, height),
            ratio_threshold: config.zoom_ratio_threshold,
            delay: Duration::from_millis(config.zoom_debounce_ms),
            deadline: None,
            zoom_key: 0,
        }
    }

    /// Remount counter; part of the map key.
    pub fn zoom_key(&self) -> u64 {
        self.zoom_key
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Set the baseline size without scheduling a remount.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.last_size = (width, height);
    }

    /// Record a resize event at `now`.
    ///
    /// Without a baseline (zero height) the event only becomes the new
    /// baseline.
    pub fn on_resize(&mut self, width: f64, height: f64, now: Instant) {
        let (last_w, last_h) = self.last_size;
        self.last_size = (width, height);

        if last_h <= 0.0 || height <= 0.0 {
            return;
        }
        let ratio_change = (last_w / last_h - width / height).abs();
        if ratio_change < self.ratio_threshold {
            // Restart the window
            self.deadline = Some(now + self.delay);
        } else {
            debug!(
                "[ManifestMap] Aspect ratio changed by {:.3}, treating resize as fullscreen toggle",
                ratio_change
            );
        }
    }

    /// Fire the pending remount if its window has elapsed.
    ///
    /// Returns `true` when the zoom key was bumped.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.zoom_key += 1;
                true
            }
            _ => false,
        }
    }

    /// Drop a pending remount (component teardown).
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_rapid_zoom_resizes_coalesce() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(1600.0, 900.0, &MapConfig::default());

        debouncer.on_resize(1440.0, 810.0, start);
        debouncer.on_resize(1280.0, 720.0, start + ms(40));
        debouncer.on_resize(1120.0, 630.0, start + ms(80));

        // 100ms after the first event, but only 20ms after the last
        assert!(!debouncer.poll(start + ms(100)));
        assert!(debouncer.poll(start + ms(180)));
        assert!(!debouncer.poll(start + ms(400)));
        assert_eq!(debouncer.zoom_key(), 1);
    }

    #[test]
    fn test_fullscreen_toggle_is_ignored() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(1200.0, 800.0, &MapConfig::default());

        debouncer.on_resize(1920.0, 1080.0, start);

        assert!(!debouncer.is_pending());
        assert!(!debouncer.poll(start + ms(500)));
        assert_eq!(debouncer.zoom_key(), 0);
    }

    #[test]
    fn test_cancel_drops_pending_remount() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(1600.0, 900.0, &MapConfig::default());
        debouncer.on_resize(800.0, 450.0, start);
        debouncer.cancel();
        assert!(!debouncer.poll(start + ms(200)));
    }

    #[test]
    fn test_unseeded_first_resize_only_sets_baseline() {
        let start = Instant::now();
        let mut debouncer = ResizeDebouncer::new(0.0, 0.0, &MapConfig::default());
        debouncer.on_resize(1440.0, 810.0, start);
        assert!(!debouncer.is_pending());

        debouncer.set_size(1600.0, 900.0);
        debouncer.on_resize(1440.0, 810.0, start);
        assert!(debouncer.poll(start + ms(100)));
    }
}
