#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index over census zones.
//!
//! A [`ZoneSet`] owns the zones of one census dataset, all expressed in a
//! single coordinate reference system, together with an R-tree over their
//! bounding boxes. The allocator uses it to narrow the zones it has to test
//! against a set of band polygons before running exact geometry.

pub mod projection;

use std::collections::BTreeSet;

use catchment_geography_models::{CensusZone, Crs};
use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{AABB, RTree, RTreeObject};

/// A zone's bounding box stored in the R-tree, pointing back into the
/// zone vector.
struct ZoneEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Census zones in one reference system plus an R-tree over them.
///
/// Immutable once built. Share it behind an `Arc` across requests.
pub struct ZoneSet {
    crs: Crs,
    zones: Vec<CensusZone>,
    index: RTree<ZoneEntry>,
}

impl std::fmt::Debug for ZoneSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneSet")
            .field("crs", &self.crs)
            .field("zones", &self.zones.len())
            .finish_non_exhaustive()
    }
}

impl ZoneSet {
    /// Builds the R-tree for `zones`, which must all be expressed in `crs`.
    ///
    /// Zones with empty geometry are kept (they still appear in
    /// [`Self::zones`]) but never returned as candidates.
    #[must_use]
    pub fn new(crs: Crs, zones: Vec<CensusZone>) -> Self {
        let entries: Vec<ZoneEntry> = zones
            .iter()
            .enumerate()
            .filter_map(|(index, zone)| {
                compute_envelope(&zone.geometry).map(|envelope| ZoneEntry { index, envelope })
            })
            .collect();

        let skipped = zones.len() - entries.len();
        if skipped > 0 {
            log::warn!("{skipped} census zones have empty geometry and will never be matched");
        }

        Self {
            crs,
            zones,
            index: RTree::bulk_load(entries),
        }
    }

    /// Reference system of every zone in the set.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// All zones, in load order.
    #[must_use]
    pub fn zones(&self) -> &[CensusZone] {
        &self.zones
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether the set has no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Sum of all known zone populations.
    #[must_use]
    pub fn total_population(&self) -> f64 {
        self.zones.iter().map(CensusZone::population_or_zero).sum()
    }

    /// Indices of zones whose bounding box intersects `rect`.
    #[must_use]
    pub fn candidates_in(&self, rect: &Rect<f64>) -> BTreeSet<usize> {
        let query = rect_to_envelope(rect);
        self.index
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.index)
            .collect()
    }

    /// Indices of zones whose bounding box intersects the bounding box of
    /// any of `shapes`, in ascending zone order.
    ///
    /// Querying per shape keeps the candidate set tight when the shapes are
    /// far apart from each other.
    #[must_use]
    pub fn candidates_for<'a, I>(&self, shapes: I) -> BTreeSet<usize>
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        let mut out = BTreeSet::new();
        for shape in shapes {
            if let Some(rect) = shape.bounding_rect() {
                out.extend(self.candidates_in(&rect));
            }
        }
        out
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
///
/// Returns `None` for non-areal geometry types or invalid coordinates.
#[must_use]
pub fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Computes the bounding box envelope for a [`MultiPolygon`].
///
/// Returns `None` for empty geometry.
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect().map(|rect| rect_to_envelope(&rect))
}

fn rect_to_envelope(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}
