//! Per-type marker rendering descriptors.
//!
//! Every marker type maps to a glyph, a z-index, a title and a set of info
//! popup rows through exhaustive matches. Adding a marker type means
//! extending [`MarkerType`] and these matches.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{AdjustedPoint, LatLng, MapTheme, MarkerId, MarkerType};

/// Short timestamp format used in titles and popups.
const SHORT_DATETIME: &str = "%d/%m/%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerIcon {
    Play,
    Stop,
    FlagCheckered,
    Plus,
    Minus,
}

/// Visual element drawn for a marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerGlyph {
    /// Map pin, optionally carrying an icon
    Pin {
        background: String,
        border_color: String,
        glyph_color: String,
        icon: Option<MarkerIcon>,
    },
    /// Round badge showing a count, or an icon when the count is absent
    Badge {
        background: String,
        count: Option<u32>,
        icon: MarkerIcon,
    },
    /// Small dot used for tracker positions and unknown types
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupRow {
    pub label: String,
    pub value: String,
    /// In-app route for linked values (e.g. a place page)
    pub link: Option<String>,
}

impl PopupRow {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            link: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoPopup {
    pub title: String,
    pub rows: Vec<PopupRow>,
}

/// Everything the host needs to draw one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMarker {
    pub id: MarkerId,
    pub marker_type: MarkerType,
    /// Display (adjusted) position
    pub position: LatLng,
    pub z_index: i32,
    pub title: String,
    pub glyph: MarkerGlyph,
    pub active: bool,
    pub hovered: bool,
    /// Present only while the marker is active or hovered
    pub popup: Option<InfoPopup>,
}

pub fn z_index(marker_type: MarkerType) -> i32 {
    match marker_type {
        MarkerType::StartPlace => 6,
        MarkerType::EndPlace => 5,
        MarkerType::TargetPlace => 4,
        MarkerType::LatestLocation | MarkerType::ContentsAdded | MarkerType::ContentsRemoved => 3,
        MarkerType::TrackerPath | MarkerType::Unknown => 1,
    }
}

fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format(SHORT_DATETIME).to_string()
}

/// Format a length in metres the way the popups show it.
pub fn format_length(metres: f64) -> String {
    if metres >= 1000.0 {
        format!("{:.1} km", metres / 1000.0)
    } else {
        format!("{:.0} m", metres)
    }
}

pub fn marker_title(point: &AdjustedPoint) -> String {
    match point.marker_type() {
        MarkerType::ContentsAdded => "Contents Added".to_string(),
        MarkerType::ContentsRemoved => "Contents Removed".to_string(),
        MarkerType::LatestLocation => "Latest Location".to_string(),
        MarkerType::StartPlace => "Start Place".to_string(),
        MarkerType::EndPlace => "End Place".to_string(),
        MarkerType::TargetPlace => "Target Place".to_string(),
        MarkerType::TrackerPath | MarkerType::Unknown => point
            .point
            .timestamp
            .as_ref()
            .map(format_datetime)
            .unwrap_or_default(),
    }
}

pub fn marker_glyph(marker_type: MarkerType, point: &AdjustedPoint, theme: &MapTheme) -> MarkerGlyph {
    let pin = |background: &str, icon: Option<MarkerIcon>| MarkerGlyph::Pin {
        background: background.to_string(),
        border_color: "#fff".to_string(),
        glyph_color: "#fff".to_string(),
        icon,
    };

    match marker_type {
        MarkerType::StartPlace => pin(&theme.secondary, Some(MarkerIcon::Play)),
        MarkerType::EndPlace => pin(&theme.secondary, Some(MarkerIcon::Stop)),
        MarkerType::TargetPlace => pin(&theme.secondary, Some(MarkerIcon::FlagCheckered)),
        MarkerType::LatestLocation => pin(&theme.success, None),
        MarkerType::ContentsAdded => MarkerGlyph::Badge {
            background: theme.success.clone(),
            count: point.point.contents_added_count.filter(|c| *c > 0),
            icon: MarkerIcon::Plus,
        },
        MarkerType::ContentsRemoved => MarkerGlyph::Badge {
            background: theme.danger.clone(),
            count: point.point.contents_removed_count.filter(|c| *c > 0),
            icon: MarkerIcon::Minus,
        },
        MarkerType::TrackerPath | MarkerType::Unknown => MarkerGlyph::Dot,
    }
}

/// Stroke/fill colour for the marker's radius circle.
pub fn circle_colour(marker_type: MarkerType, theme: &MapTheme) -> &str {
    match marker_type {
        MarkerType::LatestLocation | MarkerType::ContentsAdded => &theme.success,
        MarkerType::ContentsRemoved => &theme.danger,
        MarkerType::StartPlace
        | MarkerType::EndPlace
        | MarkerType::TargetPlace
        | MarkerType::TrackerPath
        | MarkerType::Unknown => &theme.secondary,
    }
}

pub fn info_popup(point: &AdjustedPoint) -> InfoPopup {
    let source = &point.point;
    let mut rows = Vec::new();

    if let Some(name) = &source.place_name {
        let mut row = PopupRow::new("Place", name.clone());
        row.link = source.place_id.map(|id| format!("/places/{}", id));
        rows.push(row);
    }
    if let Some(ts) = &source.timestamp {
        rows.push(PopupRow::new("Date", format_datetime(ts)));
    }
    if let (MarkerType::TargetPlace, Some(deadline)) = (source.marker_type, &source.deadline) {
        rows.push(PopupRow::new("Deadline", format_datetime(deadline)));
    }
    if let Some(radius) = source.effective_radius() {
        let label = match source.marker_type {
            MarkerType::LatestLocation => "Accuracy",
            _ => "Radius",
        };
        rows.push(PopupRow::new(label, format_length(radius)));
    }
    match (source.marker_type, source.contents_added_count, source.contents_removed_count) {
        (MarkerType::ContentsAdded, Some(n), _) if n > 0 => {
            rows.push(PopupRow::new("Added Contents", n.to_string()))
        }
        (MarkerType::ContentsRemoved, _, Some(n)) if n > 0 => {
            rows.push(PopupRow::new("Removed Contents", n.to_string()))
        }
        _ => {}
    }

    InfoPopup {
        title: marker_title(point),
        rows,
    }
}

/// Build the full rendering descriptor for one marker.
pub fn describe_marker(
    point: &AdjustedPoint,
    theme: &MapTheme,
    active: bool,
    hovered: bool,
) -> RenderedMarker {
    let marker_type = point.marker_type();
    RenderedMarker {
        id: point.id.clone(),
        marker_type,
        position: point.adjusted,
        z_index: z_index(marker_type),
        title: marker_title(point),
        glyph: marker_glyph(marker_type, point, theme),
        active,
        hovered,
        popup: (active || hovered).then(|| info_popup(point)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve_overlaps, ManifestMapPoint, MapConfig};
    use chrono::TimeZone;

    fn adjusted(point: ManifestMapPoint) -> AdjustedPoint {
        resolve_overlaps(&[point], &MapConfig::default()).remove(0)
    }

    #[test]
    fn test_z_index_ordering() {
        assert!(z_index(MarkerType::StartPlace) > z_index(MarkerType::EndPlace));
        assert!(z_index(MarkerType::EndPlace) > z_index(MarkerType::TargetPlace));
        assert_eq!(z_index(MarkerType::Unknown), 1);
    }

    #[test]
    fn test_unknown_type_renders_as_dot() {
        let point = adjusted(ManifestMapPoint::new(MarkerType::Unknown, 1.0, 1.0));
        let marker = describe_marker(&point, &MapTheme::default(), false, false);
        assert_eq!(marker.glyph, MarkerGlyph::Dot);
        assert_eq!(marker.title, "");
        assert!(marker.popup.is_none());
    }

    #[test]
    fn test_contents_badge_shows_count() {
        let mut raw = ManifestMapPoint::new(MarkerType::ContentsRemoved, 1.0, 1.0);
        raw.contents_removed_count = Some(3);
        let point = adjusted(raw);
        let theme = MapTheme::default();

        match marker_glyph(point.marker_type(), &point, &theme) {
            MarkerGlyph::Badge {
                background, count, ..
            } => {
                assert_eq!(background, theme.danger);
                assert_eq!(count, Some(3));
            }
            other => panic!("unexpected glyph {:?}", other),
        }

        let popup = info_popup(&point);
        assert_eq!(popup.title, "Contents Removed");
        assert_eq!(popup.rows.last().unwrap().value, "3");
    }

    #[test]
    fn test_popup_only_when_active_or_hovered() {
        let point = adjusted(ManifestMapPoint::new(MarkerType::StartPlace, 1.0, 1.0));
        let theme = MapTheme::default();
        assert!(describe_marker(&point, &theme, false, false).popup.is_none());
        assert!(describe_marker(&point, &theme, true, false).popup.is_some());
        assert!(describe_marker(&point, &theme, false, true).popup.is_some());
    }

    #[test]
    fn test_target_popup_rows() {
        let mut raw = ManifestMapPoint::new(MarkerType::TargetPlace, 1.0, 1.0).with_radius(1500.0);
        raw.place_id = Some(42);
        raw.place_name = Some("Warehouse".to_string());
        raw.deadline = Some(Utc.with_ymd_and_hms(2024, 5, 2, 17, 30, 0).unwrap());
        let popup = info_popup(&adjusted(raw));

        let labels: Vec<&str> = popup.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Place", "Deadline", "Radius"]);
        assert_eq!(popup.rows[0].link.as_deref(), Some("/places/42"));
        assert_eq!(popup.rows[1].value, "02/05/2024 17:30");
        assert_eq!(popup.rows[2].value, "1.5 km");
    }

    #[test]
    fn test_latest_location_radius_is_accuracy() {
        let point = adjusted(ManifestMapPoint::new(MarkerType::LatestLocation, 1.0, 1.0).with_radius(35.0));
        let popup = info_popup(&point);
        assert_eq!(popup.rows[0].label, "Accuracy");
        assert_eq!(popup.rows[0].value, "35 m");
        assert_eq!(circle_colour(MarkerType::LatestLocation, &MapTheme::default()), "#2e9e5b");
    }
}
