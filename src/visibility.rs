//! Category-based marker visibility.

use crate::{AdjustedPoint, MarkerType, VisibilitySettings};

/// Visibility group a marker type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerCategory {
    /// START_PLACE, END_PLACE, TARGET_PLACE
    ManifestPlace,
    /// CONTENTS_ADDED, CONTENTS_REMOVED
    ContentsPlace,
    /// LATEST_LOCATION
    LatestLocation,
    /// Not gated by any marker toggle
    Ungated,
}

impl MarkerCategory {
    pub fn of(marker_type: MarkerType) -> Self {
        match marker_type {
            MarkerType::StartPlace | MarkerType::EndPlace | MarkerType::TargetPlace => {
                MarkerCategory::ManifestPlace
            }
            MarkerType::ContentsAdded | MarkerType::ContentsRemoved => MarkerCategory::ContentsPlace,
            MarkerType::LatestLocation => MarkerCategory::LatestLocation,
            MarkerType::TrackerPath | MarkerType::Unknown => MarkerCategory::Ungated,
        }
    }
}

/// Whether a marker of this type should render under `settings`.
///
/// `show_manifest_path` only gates the trip path overlay, so TRACKER_PATH
/// markers stay visible regardless.
pub fn is_marker_visible(marker_type: MarkerType, settings: &VisibilitySettings) -> bool {
    match MarkerCategory::of(marker_type) {
        MarkerCategory::ManifestPlace => settings.show_manifest_places,
        MarkerCategory::ContentsPlace => settings.show_contents_places,
        MarkerCategory::LatestLocation => settings.show_latest_location,
        MarkerCategory::Ungated => true,
    }
}

/// Render-eligible subset of `points`, preserving order.
pub fn filter_visible<'a>(
    points: &'a [AdjustedPoint],
    settings: &VisibilitySettings,
) -> Vec<&'a AdjustedPoint> {
    points
        .iter()
        .filter(|p| is_marker_visible(p.marker_type(), settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve_overlaps, ManifestMapPoint, MapConfig, VisibilityToggle};

    const ALL_TYPES: [MarkerType; 8] = [
        MarkerType::StartPlace,
        MarkerType::EndPlace,
        MarkerType::TargetPlace,
        MarkerType::LatestLocation,
        MarkerType::ContentsAdded,
        MarkerType::ContentsRemoved,
        MarkerType::TrackerPath,
        MarkerType::Unknown,
    ];

    fn sample_points() -> Vec<AdjustedPoint> {
        let points: Vec<ManifestMapPoint> = ALL_TYPES
            .iter()
            .enumerate()
            .map(|(i, t)| ManifestMapPoint::new(*t, 50.0 + i as f64 * 0.01, 1.0))
            .collect();
        resolve_overlaps(&points, &MapConfig::default())
    }

    #[test]
    fn test_everything_visible_by_default() {
        let settings = VisibilitySettings::default();
        for t in ALL_TYPES {
            assert!(is_marker_visible(t, &settings), "{:?} should be visible", t);
        }
    }

    #[test]
    fn test_each_toggle_hides_exactly_its_category() {
        let points = sample_points();
        let toggles = [
            VisibilityToggle::ManifestPlaces,
            VisibilityToggle::ContentsPlaces,
            VisibilityToggle::LatestLocation,
            VisibilityToggle::ManifestPath,
        ];

        for toggle in toggles {
            let mut settings = VisibilitySettings::default();
            settings.set(toggle, false);

            let visible = filter_visible(&points, &settings);
            let hidden: Vec<MarkerType> = points
                .iter()
                .filter(|p| !visible.iter().any(|v| v.id == p.id))
                .map(|p| p.marker_type())
                .collect();

            let expected: Vec<MarkerType> = match toggle {
                VisibilityToggle::ManifestPlaces => vec![
                    MarkerType::StartPlace,
                    MarkerType::EndPlace,
                    MarkerType::TargetPlace,
                ],
                VisibilityToggle::ContentsPlaces => {
                    vec![MarkerType::ContentsAdded, MarkerType::ContentsRemoved]
                }
                VisibilityToggle::LatestLocation => vec![MarkerType::LatestLocation],
                VisibilityToggle::ManifestPath => vec![],
            };
            assert_eq!(hidden, expected, "toggle {:?}", toggle);
        }
    }

    #[test]
    fn test_tracker_path_markers_ignore_path_toggle() {
        let settings = VisibilitySettings {
            show_manifest_places: false,
            show_contents_places: false,
            show_latest_location: false,
            show_manifest_path: false,
        };
        assert!(is_marker_visible(MarkerType::TrackerPath, &settings));
        assert!(is_marker_visible(MarkerType::Unknown, &settings));
        assert_eq!(filter_visible(&sample_points(), &settings).len(), 2);
    }
}
