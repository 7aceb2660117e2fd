//! Geographic helpers: circle bounds and fixed-precision rounding.

use crate::{Bounds, LatLng};

/// Spherical earth radius used by web map runtimes, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Bounding box of a circle: center ± radius along both axes.
///
/// The longitude span widens with latitude; near the poles it is clamped
/// to the full range.
pub fn circle_bounds(center: LatLng, radius_m: f64) -> Bounds {
    let dlat = (radius_m / EARTH_RADIUS_M).to_degrees();
    let cos_lat = center.latitude.to_radians().cos();
    let dlng = if cos_lat.abs() < 1e-12 {
        180.0
    } else {
        (dlat / cos_lat).min(180.0)
    };

    Bounds {
        min_lat: (center.latitude - dlat).max(-90.0),
        max_lat: (center.latitude + dlat).min(90.0),
        min_lng: center.longitude - dlng,
        max_lng: center.longitude + dlng,
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Normalise -0.0 so offsets compare cleanly
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_bounds_contains_radius() {
        let center = LatLng::new(51.5, -0.12);
        let bounds = circle_bounds(center, 500.0);
        assert!(bounds.contains(center));

        let north_m = (bounds.max_lat - center.latitude).to_radians() * EARTH_RADIUS_M;
        let east_m = (bounds.max_lng - center.longitude).to_radians()
            * EARTH_RADIUS_M
            * center.latitude.to_radians().cos();
        assert!((north_m - 500.0).abs() < 1e-6);
        assert!((east_m - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.000086602540378, 6), 0.000087);
        assert_eq!(round_to(-0.0000000001, 6), 0.0);
        assert!(round_to(-0.0000000001, 6).is_sign_positive());
    }
}
