//! Overlap resolution for coincident markers.
//!
//! Each point is compared with the points *before* it in the list. When
//! `k` earlier points fall inside the same bucket (both coordinate deltas
//! strictly below half the offset distance) the point is pushed out along
//! the angle at index `k mod 6` of the hexagonal table. The first point of
//! a bucket never moves.
//!
//! The result is order-dependent: reordering the input changes which point
//! receives which offset. With the default single ring the seventh
//! coincident point lands on the first one again.

use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::round_to;
use crate::{LatLng, ManifestMapPoint, MapConfig, MarkerId, MarkerType};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Offsets are rounded to this many decimal places.
const OFFSET_DECIMALS: i32 = 6;

/// Planar offset in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub lat: f64,
    pub lng: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { lat: 0.0, lng: 0.0 };

    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// A point paired with its display coordinates.
///
/// `raw` is the authoritative source position; `adjusted` is display-only
/// and must never be fed back into the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPoint {
    pub id: MarkerId,
    /// Position of the point in the input list
    pub index: usize,
    pub point: ManifestMapPoint,
    pub raw: LatLng,
    pub offset: Offset,
    pub adjusted: LatLng,
}

impl AdjustedPoint {
    pub fn marker_type(&self) -> MarkerType {
        self.point.marker_type
    }
}

/// A source position with its list index for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

fn in_bucket(a: LatLng, b: LatLng, half: f64) -> bool {
    (a.latitude - b.latitude).abs() < half && (a.longitude - b.longitude).abs() < half
}

/// Offset for a point with `count` coincident predecessors.
pub fn offset_for_count(count: usize, config: &MapConfig) -> Offset {
    if count == 0 || config.offset_angles.is_empty() {
        return Offset::ZERO;
    }

    let slots = config.offset_angles.len();
    let angle = config.offset_angles[count % slots].to_radians();
    let ring = (count / slots) % config.overlap_rings.max(1) as usize;
    let distance = config.offset_distance * (ring + 1) as f64;

    Offset {
        lat: round_to(angle.sin() * distance, OFFSET_DECIMALS),
        lng: round_to(angle.cos() * distance, OFFSET_DECIMALS),
    }
}

/// Offset of the point at `index`, computed by scanning its predecessors.
///
/// Points without valid coordinates never coincide with anything and get
/// a zero offset.
pub fn marker_offset(points: &[ManifestMapPoint], index: usize, config: &MapConfig) -> Offset {
    let Some(position) = points.get(index).and_then(|p| p.position()) else {
        return Offset::ZERO;
    };
    let half = config.offset_distance / 2.0;

    let count = points[..index]
        .iter()
        .filter_map(|p| p.position())
        .filter(|other| in_bucket(*other, position, half))
        .count();

    offset_for_count(count, config)
}

fn build_index(points: &[ManifestMapPoint]) -> (Vec<Option<LatLng>>, RTree<IndexedPoint>) {
    let positions: Vec<Option<LatLng>> = points.iter().map(|p| p.position()).collect();
    let indexed: Vec<IndexedPoint> = positions
        .iter()
        .enumerate()
        .filter_map(|(idx, pos)| {
            pos.map(|p| IndexedPoint {
                idx,
                lat: p.latitude,
                lng: p.longitude,
            })
        })
        .collect();
    (positions, RTree::bulk_load(indexed))
}

fn coincident_before(tree: &RTree<IndexedPoint>, index: usize, position: LatLng, half: f64) -> usize {
    let search = AABB::from_corners(
        [position.latitude - half, position.longitude - half],
        [position.latitude + half, position.longitude + half],
    );
    tree.locate_in_envelope(&search)
        .filter(|candidate| candidate.idx < index)
        .filter(|candidate| {
            in_bucket(LatLng::new(candidate.lat, candidate.lng), position, half)
        })
        .count()
}

fn adjust(index: usize, point: &ManifestMapPoint, raw: LatLng, offset: Offset) -> AdjustedPoint {
    AdjustedPoint {
        id: MarkerId::from_index(index),
        index,
        point: point.clone(),
        raw,
        offset,
        adjusted: LatLng::new(raw.latitude + offset.lat, raw.longitude + offset.lng),
    }
}

/// Resolve display coordinates for every point with valid geometry.
///
/// Points lacking coordinates are dropped from the output; the remaining
/// points keep their list index (and therefore their marker id).
pub fn resolve_overlaps(points: &[ManifestMapPoint], config: &MapConfig) -> Vec<AdjustedPoint> {
    let (positions, tree) = build_index(points);
    let half = config.offset_distance / 2.0;

    points
        .iter()
        .zip(positions)
        .enumerate()
        .filter_map(|(index, (point, position))| {
            let raw = position?;
            let count = coincident_before(&tree, index, raw, half);
            Some(adjust(index, point, raw, offset_for_count(count, config)))
        })
        .collect()
}

/// Parallel variant of [`resolve_overlaps`]; produces identical output.
#[cfg(feature = "parallel")]
pub fn resolve_overlaps_parallel(
    points: &[ManifestMapPoint],
    config: &MapConfig,
) -> Vec<AdjustedPoint> {
    let (positions, tree) = build_index(points);
    let half = config.offset_distance / 2.0;

    points
        .par_iter()
        .zip(positions.into_par_iter())
        .enumerate()
        .filter_map(|(index, (point, position))| {
            let raw = position?;
            let count = coincident_before(&tree, index, raw, half);
            Some(adjust(index, point, raw, offset_for_count(count, config)))
        })
        .collect()
}
