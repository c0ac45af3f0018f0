#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Overlap-resolving population allocator.
//!
//! Given census zones with resident counts and, for each demand point, a
//! near band (0–5 min walk) and a far band (0–10 min walk), estimates how
//! many residents each point reaches in its near band and in its exclusive
//! far ring, without counting anyone twice.
//!
//! The near band and the far ring are processed independently. For each:
//!
//! 1. Zones are pre-filtered to those touching the union of all bands
//!    (R-tree envelope query, then an exact intersection test).
//! 2. Every point whose band (or ring, for the far pass) covers a positive
//!    area of a zone becomes a claimant of that zone.
//! 3. A single claimant receives `population × covered / zone area`.
//! 4. Several claimants split the zone by the configured
//!    [`OverlapStrategy`]: pairwise nearest-point-wins differencing in input
//!    order (the default), or a bisector partition that does not depend on
//!    input order.
//!
//! The far ring of a point is `(zone ∩ far) − (zone ∩ near)`, so a point's
//! near and far figures never share area.
//!
//! Failures never abort a run. A zone without a population contributes
//! zero, an empty band contributes zero, and a geometry operation that
//! fails drops only the zone/point pair it was computed for. The one hard
//! error is a reference-system mismatch between zones and points.

pub mod geometry;
mod resolve;

use catchment_allocator_models::{Allocation, Band, DemandPoint, OverlapStrategy, PointAllocation};
use catchment_geography_models::{CensusZone, Crs};
use catchment_spatial::ZoneSet;
use geo::{BoundingRect, MultiPolygon};
use thiserror::Error;

use crate::geometry::{GeometryError, GeometryOps, PlanarGeometry};
use crate::resolve::Claim;

pub use catchment_allocator_models as models;

/// Errors that reject an allocation call outright.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// Zones and points are expressed in different reference systems.
    #[error("Projection mismatch: zones are in {zones}, points are in {points}")]
    ProjectionMismatch {
        /// Reference system of the zone set.
        zones: Crs,
        /// Reference system the points were supplied in.
        points: Crs,
    },
}

/// Allocates census population to demand points.
///
/// Holds no state between calls; the same allocator can serve concurrent
/// requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Allocator<G = PlanarGeometry> {
    geometry: G,
    strategy: OverlapStrategy,
}

impl Allocator<PlanarGeometry> {
    /// An allocator using `geo` for geometry.
    #[must_use]
    pub const fn new(strategy: OverlapStrategy) -> Self {
        Self {
            geometry: PlanarGeometry,
            strategy,
        }
    }
}

impl<G: GeometryOps> Allocator<G> {
    /// An allocator using a custom geometry backend.
    #[must_use]
    pub const fn with_geometry(geometry: G, strategy: OverlapStrategy) -> Self {
        Self { geometry, strategy }
    }

    /// The overlap strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> OverlapStrategy {
        self.strategy
    }

    /// Computes near and far populations for every point.
    ///
    /// `points_crs` is the reference system the points' locations and bands
    /// are expressed in. Results come back in input order with the input
    /// ids; an empty `points` slice yields an empty allocation.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::ProjectionMismatch`] if `points_crs`
    /// differs from the zone set's reference system.
    pub fn allocate(
        &self,
        zones: &ZoneSet,
        points_crs: Crs,
        points: &[DemandPoint],
    ) -> Result<Allocation, AllocationError> {
        if zones.crs() != points_crs {
            return Err(AllocationError::ProjectionMismatch {
                zones: zones.crs(),
                points: points_crs,
            });
        }

        let mut allocation = Allocation {
            points: points
                .iter()
                .map(|p| PointAllocation::empty(p.id.clone()))
                .collect(),
        };

        if points.is_empty() {
            return Ok(allocation);
        }

        for band in Band::ALL {
            let shares = self.allocate_band(zones, points, band);
            for (result, share) in allocation.points.iter_mut().zip(shares) {
                match band {
                    Band::Near => result.population_near = share,
                    Band::Far => result.population_far = share,
                }
            }
        }

        log::debug!(
            "Allocated {:.1} near / {:.1} far residents across {} points ({} strategy)",
            allocation.total_near(),
            allocation.total_far(),
            points.len(),
            self.strategy
        );

        Ok(allocation)
    }

    /// Per-point population for one band, indexed like `points`.
    fn allocate_band(&self, zones: &ZoneSet, points: &[DemandPoint], band: Band) -> Vec<f64> {
        let mut shares = vec![0.0; points.len()];
        let selected = self.select_zones(zones, points, band);

        log::debug!(
            "{band} band: {} of {} zones touch a band",
            selected.len(),
            zones.len()
        );

        for index in selected {
            self.allocate_zone(&zones.zones()[index], points, band, &mut shares);
        }

        shares
    }

    /// Zones that intersect the union of every point's `band` polygon, in
    /// zone order.
    ///
    /// Only narrows the search: if the union or an intersects test fails,
    /// the zone is kept and the per-pair computation decides.
    fn select_zones(&self, zones: &ZoneSet, points: &[DemandPoint], band: Band) -> Vec<usize> {
        let bands: Vec<&MultiPolygon<f64>> = points
            .iter()
            .map(|p| p.band(band))
            .filter(|b| !b.0.is_empty())
            .collect();

        if bands.is_empty() {
            return Vec::new();
        }

        let candidates = zones.candidates_for(bands.iter().copied());

        let union = match self.geometry.union_all(&bands) {
            Ok(union) => Some(union),
            Err(e) => {
                log::warn!("{band} band union failed, testing every candidate zone: {e}");
                None
            }
        };

        candidates
            .into_iter()
            .filter(|&index| {
                union.as_ref().is_none_or(|union| {
                    self.geometry
                        .intersects(&zones.zones()[index].geometry, union)
                        .unwrap_or(true)
                })
            })
            .collect()
    }

    fn allocate_zone(
        &self,
        zone: &CensusZone,
        points: &[DemandPoint],
        band: Band,
        shares: &mut [f64],
    ) {
        let population = zone.population_or_zero();
        if !population.is_finite() || population <= 0.0 {
            return;
        }

        let zone_area = self.geometry.area(&zone.geometry);
        if zone_area <= 0.0 {
            if let Some(winner) = self.degenerate_zone_winner(zone, points, band) {
                shares[winner] += population;
            }
            return;
        }

        let claims = self.claims(zone, points, band);

        match claims.as_slice() {
            [] => {}
            [single] => {
                shares[single.point] += population * self.geometry.area(&single.region) / zone_area;
            }
            _ => {
                let resolved = resolve::resolve(
                    &self.geometry,
                    self.strategy,
                    zone.geometry.bounding_rect(),
                    points,
                    &claims,
                );
                for (point, area) in resolved {
                    if area > 0.0 {
                        shares[point] += population * area / zone_area;
                    }
                }
            }
        }
    }

    /// Points with a positive-area region of `zone` in `band`, in input
    /// order.
    fn claims(&self, zone: &CensusZone, points: &[DemandPoint], band: Band) -> Vec<Claim> {
        points
            .iter()
            .enumerate()
            .filter_map(|(index, point)| match self.claim_region(zone, point, band) {
                Ok(Some(region)) if self.geometry.area(&region) > 0.0 => Some(Claim {
                    point: index,
                    region,
                }),
                Ok(_) => None,
                Err(e) => {
                    log::warn!(
                        "Skipping point {} for zone {} ({band} band): {e}",
                        point.id,
                        zone.id
                    );
                    None
                }
            })
            .collect()
    }

    /// The part of `zone` that `point` reaches in `band`.
    ///
    /// For [`Band::Far`] this is the ring: the far intersection minus the
    /// point's own near intersection. A far intersection without positive
    /// area yields `None` before any differencing.
    fn claim_region(
        &self,
        zone: &CensusZone,
        point: &DemandPoint,
        band: Band,
    ) -> Result<Option<MultiPolygon<f64>>, GeometryError> {
        match band {
            Band::Near => {
                if point.near_band.0.is_empty() {
                    return Ok(None);
                }
                self.geometry
                    .intersection(&zone.geometry, &point.near_band)
                    .map(Some)
            }
            Band::Far => {
                if point.far_band.0.is_empty() {
                    return Ok(None);
                }
                let far = self
                    .geometry
                    .intersection(&zone.geometry, &point.far_band)?;
                if far.0.is_empty() || self.geometry.area(&far) <= 0.0 {
                    return Ok(None);
                }

                let near = self
                    .geometry
                    .intersection(&zone.geometry, &point.near_band)?;
                if near.0.is_empty() {
                    return Ok(Some(far));
                }

                self.geometry.difference(&far, &near).map(Some)
            }
        }
    }

    /// Picks the point that receives all of a zero-area zone.
    ///
    /// Such a zone has no positive-area intersection with anything, so a
    /// point claims it when its band touches the zone (for the far pass:
    /// touches the far band and not the near band). Several claimants go to
    /// the one strictly nearest the zone's centroid; ties go to the earlier
    /// point.
    fn degenerate_zone_winner(
        &self,
        zone: &CensusZone,
        points: &[DemandPoint],
        band: Band,
    ) -> Option<usize> {
        let touches = |point: &DemandPoint, band_polygon: &MultiPolygon<f64>| {
            self.geometry
                .intersects(&zone.geometry, band_polygon)
                .unwrap_or_else(|e| {
                    log::warn!(
                        "Skipping point {} for degenerate zone {}: {e}",
                        point.id,
                        zone.id
                    );
                    false
                })
        };

        let claimants: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, point)| match band {
                Band::Near => touches(point, &point.near_band),
                Band::Far => touches(point, &point.far_band) && !touches(point, &point.near_band),
            })
            .map(|(index, _)| index)
            .collect();

        let first = *claimants.first()?;
        let Some(centroid) = self.geometry.centroid(&zone.geometry) else {
            return Some(first);
        };

        let mut best = first;
        let mut best_distance = self.geometry.distance(points[first].location, centroid);
        for &index in &claimants[1..] {
            let distance = self.geometry.distance(points[index].location, centroid);
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }

        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catchment_allocator_models::{ExplicitId, PointId};
    use geo::{Point, polygon};

    const EPS: f64 = 1e-6;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]])
    }

    fn zone(id: &str, geometry: MultiPolygon<f64>, population: Option<f64>) -> CensusZone {
        CensusZone {
            id: id.to_string(),
            geometry,
            population,
        }
    }

    fn point(
        id: usize,
        x: f64,
        y: f64,
        near: MultiPolygon<f64>,
        far: MultiPolygon<f64>,
    ) -> DemandPoint {
        DemandPoint {
            id: PointId::Ordinal(id),
            location: Point::new(x, y),
            near_band: near,
            far_band: far,
        }
    }

    fn empty() -> MultiPolygon<f64> {
        MultiPolygon(vec![])
    }

    fn zones(list: Vec<CensusZone>) -> ZoneSet {
        ZoneSet::new(Crs::WEB_MERCATOR, list)
    }

    fn run(zones: &ZoneSet, points: &[DemandPoint]) -> Allocation {
        Allocator::new(OverlapStrategy::Pairwise)
            .allocate(zones, Crs::WEB_MERCATOR, points)
            .unwrap()
    }

    #[test]
    fn single_zone_single_point_takes_area_fraction() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let points = [point(0, 0.25, 0.5, rect(0.0, 0.0, 0.5, 1.0), empty())];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 500.0).abs() < EPS);
        assert!(result.points[0].population_far.abs() < EPS);
        assert_eq!(result.rounded().total_population, 500);
    }

    #[test]
    fn disjoint_bands_split_without_double_counting() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let points = [
            point(0, 0.1, 0.5, rect(0.0, 0.0, 0.3, 1.0), empty()),
            point(1, 0.6, 0.5, rect(0.5, 0.0, 0.7, 1.0), empty()),
        ];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 300.0).abs() < EPS);
        assert!((result.points[1].population_near - 200.0).abs() < EPS);
        assert!((result.total() - 500.0).abs() < EPS);
    }

    #[test]
    fn overlap_goes_to_the_nearest_point() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let cover = rect(-1.0, -1.0, 2.0, 2.0);
        let points = [
            point(0, 0.5, 0.6, cover.clone(), empty()),
            point(1, 0.5, 2.0, cover, empty()),
        ];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 1000.0).abs() < EPS);
        assert!(result.points[1].population_near.abs() < EPS);
        assert!((result.total_near() - 1000.0).abs() < EPS);
    }

    #[test]
    fn partial_overlap_removes_only_the_contested_area() {
        // A covers x in [0, 0.6], B covers x in [0.4, 1]. The overlap
        // [0.4, 0.6] has centroid x = 0.5, closer to A at x = 0.45.
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let points = [
            point(0, 0.45, 0.5, rect(0.0, 0.0, 0.6, 1.0), empty()),
            point(1, 0.9, 0.5, rect(0.4, 0.0, 1.0, 1.0), empty()),
        ];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 600.0).abs() < 1e-3);
        assert!((result.points[1].population_near - 400.0).abs() < 1e-3);
    }

    #[test]
    fn far_ring_excludes_the_points_own_near_band() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let points = [point(
            0,
            0.25,
            0.5,
            rect(0.0, 0.0, 0.5, 1.0),
            rect(-1.0, -1.0, 2.0, 2.0),
        )];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 500.0).abs() < EPS);
        assert!((result.points[0].population_far - 500.0).abs() < 1e-3);
        assert!((result.points[0].population_total() - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn far_ring_competes_only_with_other_rings() {
        // A's near band covers the left half, B's far band covers the
        // whole zone. B's ring overlaps nothing of A's ring, so B gets the
        // whole zone in its far ring even though A's near band is there.
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let points = [
            point(0, 0.25, 0.5, rect(0.0, 0.0, 0.5, 1.0), rect(0.0, 0.0, 0.5, 1.0)),
            point(1, 3.0, 0.5, empty(), rect(-1.0, -1.0, 2.0, 2.0)),
        ];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 500.0).abs() < EPS);
        assert!(result.points[0].population_far.abs() < 1e-3);
        assert!((result.points[1].population_far - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn zero_area_zone_goes_wholly_to_its_single_claimant() {
        let sliver = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.5),
            (x: 0.5, y: 0.5),
            (x: 1.0, y: 0.5),
            (x: 0.0, y: 0.5),
        ]]);
        let set = zones(vec![zone("sliver", sliver, Some(40.0))]);
        let points = [point(0, 0.5, 0.5, rect(0.0, 0.0, 1.0, 1.0), empty())];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 40.0).abs() < EPS);
        assert!(result.total_near().is_finite());
    }

    #[test]
    fn zero_area_zone_with_two_claimants_goes_to_the_nearest() {
        let sliver = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.5),
            (x: 1.0, y: 0.5),
            (x: 2.0, y: 0.5),
            (x: 0.0, y: 0.5),
        ]]);
        let set = zones(vec![zone("sliver", sliver, Some(40.0))]);
        let cover = rect(-1.0, -1.0, 3.0, 3.0);
        let points = [
            point(0, 5.0, 5.0, cover.clone(), empty()),
            point(1, 1.0, 0.6, cover, empty()),
        ];

        let result = run(&set, &points);

        assert!(result.points[0].population_near.abs() < EPS);
        assert!((result.points[1].population_near - 40.0).abs() < EPS);
    }

    #[test]
    fn missing_population_yields_zero_filled_results() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), None)]);
        let points = [point(
            7,
            0.5,
            0.5,
            rect(0.0, 0.0, 1.0, 1.0),
            rect(-1.0, -1.0, 2.0, 2.0),
        )];

        let result = run(&set, &points);

        assert_eq!(result.points.len(), 1);
        assert_eq!(result.points[0].id, PointId::Ordinal(7));
        assert!(result.total().abs() < EPS);
    }

    #[test]
    fn non_finite_population_is_ignored() {
        let set = zones(vec![
            zone("nan", rect(0.0, 0.0, 1.0, 1.0), Some(f64::NAN)),
            zone("inf", rect(1.0, 0.0, 2.0, 1.0), Some(f64::INFINITY)),
            zone("ok", rect(2.0, 0.0, 3.0, 1.0), Some(100.0)),
        ]);
        let points = [point(0, 1.5, 0.5, rect(0.0, 0.0, 3.0, 1.0), empty())];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 100.0).abs() < EPS);
        assert!(result.total().is_finite());
        assert_eq!(result.rounded().total_population, 100);
    }

    #[test]
    fn no_points_yields_an_empty_allocation() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(10.0))]);
        let result = run(&set, &[]);
        assert!(result.points.is_empty());
        assert_eq!(result.rounded().total_population, 0);
    }

    #[test]
    fn mismatched_reference_systems_are_rejected() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(10.0))]);
        let points = [point(0, 0.5, 0.5, rect(0.0, 0.0, 1.0, 1.0), empty())];

        let err = Allocator::new(OverlapStrategy::Pairwise)
            .allocate(&set, Crs::WGS84, &points)
            .unwrap_err();

        assert!(matches!(
            err,
            AllocationError::ProjectionMismatch {
                zones: Crs::WEB_MERCATOR,
                points: Crs::WGS84,
            }
        ));
    }

    #[test]
    fn broken_band_only_affects_its_own_point() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let broken = MultiPolygon(vec![polygon![
            (x: 0.5, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.5, y: 0.0),
        ]]);
        let points = [
            point(0, 0.25, 0.5, rect(0.0, 0.0, 0.5, 1.0), empty()),
            point(1, 0.75, 0.5, broken, empty()),
        ];

        let result = run(&set, &points);

        assert!((result.points[0].population_near - 500.0).abs() < EPS);
        assert!(result.points[1].population_near.abs() < EPS);
    }

    /// Geometry backend that fails every intersection involving one
    /// poisoned polygon.
    struct PoisonedGeometry {
        poison: MultiPolygon<f64>,
    }

    impl GeometryOps for PoisonedGeometry {
        fn intersection(
            &self,
            a: &MultiPolygon<f64>,
            b: &MultiPolygon<f64>,
        ) -> Result<MultiPolygon<f64>, GeometryError> {
            if *a == self.poison || *b == self.poison {
                return Err(GeometryError::Engine {
                    op: "intersection",
                    message: "poisoned".to_string(),
                });
            }
            PlanarGeometry.intersection(a, b)
        }

        fn difference(
            &self,
            a: &MultiPolygon<f64>,
            b: &MultiPolygon<f64>,
        ) -> Result<MultiPolygon<f64>, GeometryError> {
            PlanarGeometry.difference(a, b)
        }

        fn union_all(
            &self,
            _shapes: &[&MultiPolygon<f64>],
        ) -> Result<MultiPolygon<f64>, GeometryError> {
            Err(GeometryError::Engine {
                op: "union",
                message: "poisoned".to_string(),
            })
        }

        fn intersects(
            &self,
            a: &MultiPolygon<f64>,
            b: &MultiPolygon<f64>,
        ) -> Result<bool, GeometryError> {
            PlanarGeometry.intersects(a, b)
        }

        fn area(&self, a: &MultiPolygon<f64>) -> f64 {
            PlanarGeometry.area(a)
        }

        fn centroid(&self, a: &MultiPolygon<f64>) -> Option<geo::Point<f64>> {
            PlanarGeometry.centroid(a)
        }

        fn distance(&self, a: geo::Point<f64>, b: geo::Point<f64>) -> f64 {
            PlanarGeometry.distance(a, b)
        }
    }

    #[test]
    fn failing_geometry_backend_degrades_per_pair() {
        let poison = rect(0.5, 0.0, 0.8, 1.0);
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0))]);
        let points = [
            point(0, 0.1, 0.5, rect(0.0, 0.0, 0.3, 1.0), empty()),
            point(1, 0.6, 0.5, poison.clone(), empty()),
        ];
        let allocator = Allocator::with_geometry(
            PoisonedGeometry { poison },
            OverlapStrategy::Pairwise,
        );

        let result = allocator
            .allocate(&set, Crs::WEB_MERCATOR, &points)
            .unwrap();

        assert!((result.points[0].population_near - 300.0).abs() < EPS);
        assert!(result.points[1].population_near.abs() < EPS);
    }

    #[test]
    fn far_away_zones_do_not_change_the_result() {
        let near_zone = zone("near", rect(0.0, 0.0, 1.0, 1.0), Some(1000.0));
        let far_zone = zone("far", rect(100.0, 100.0, 101.0, 101.0), Some(5000.0));
        let points = [point(
            0,
            0.5,
            0.5,
            rect(0.0, 0.0, 0.5, 1.0),
            rect(0.0, 0.0, 1.0, 1.0),
        )];

        let alone = run(&zones(vec![near_zone.clone()]), &points);
        let with_far = run(&zones(vec![near_zone, far_zone]), &points);

        assert_eq!(alone, with_far);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let set = zones(vec![
            zone("a", rect(0.0, 0.0, 1.0, 1.0), Some(700.0)),
            zone("b", rect(1.0, 0.0, 2.0, 1.0), Some(300.0)),
        ]);
        let points = [
            point(0, 0.4, 0.5, rect(0.0, 0.0, 1.2, 1.0), rect(-1.0, -1.0, 3.0, 2.0)),
            point(1, 1.6, 0.5, rect(0.9, 0.0, 2.0, 1.0), rect(-1.0, -1.0, 3.0, 2.0)),
        ];

        let first = run(&set, &points);
        let second = run(&set, &points);

        assert_eq!(first, second);
        assert!(first.points.iter().all(|p| p.population_near >= 0.0));
        assert!(first.points.iter().all(|p| p.population_far >= 0.0));
    }

    #[test]
    fn explicit_ids_are_echoed_in_order() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 1.0, 1.0), Some(10.0))]);
        let mut a = point(0, 0.5, 0.5, rect(0.0, 0.0, 1.0, 1.0), empty());
        a.id = PointId::Explicit(ExplicitId::Text("north".to_string()));
        let mut b = point(1, 5.0, 5.0, empty(), empty());
        b.id = PointId::Explicit(ExplicitId::Number(0));

        let result = run(&set, &[a, b]);

        assert_eq!(
            result.points[0].id,
            PointId::Explicit(ExplicitId::Text("north".to_string()))
        );
        assert_eq!(result.points[1].id, PointId::Explicit(ExplicitId::Number(0)));
    }

    fn three_in_a_row(order: [usize; 3]) -> Vec<DemandPoint> {
        let cover = rect(-1.0, -1.0, 4.0, 2.0);
        let locations = [(0.5, 0.5), (1.5, 0.5), (2.5, 0.5)];
        order
            .iter()
            .map(|&i| point(i, locations[i].0, locations[i].1, cover.clone(), empty()))
            .collect()
    }

    fn near_by_id(allocation: &Allocation, id: usize) -> f64 {
        allocation
            .points
            .iter()
            .find(|p| p.id == PointId::Ordinal(id))
            .map_or(f64::NAN, |p| p.population_near)
    }

    #[test]
    fn voronoi_strategy_splits_three_way_overlap_evenly() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 3.0, 1.0), Some(900.0))]);
        let allocator = Allocator::new(OverlapStrategy::Voronoi);

        let result = allocator
            .allocate(&set, Crs::WEB_MERCATOR, &three_in_a_row([0, 1, 2]))
            .unwrap();

        for id in 0..3 {
            assert!((near_by_id(&result, id) - 300.0).abs() < 1e-3);
        }
        assert!((result.total_near() - 900.0).abs() < 1e-3);
    }

    #[test]
    fn voronoi_strategy_ignores_input_order() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 3.0, 1.0), Some(900.0))]);
        let allocator = Allocator::new(OverlapStrategy::Voronoi);

        let forward = allocator
            .allocate(&set, Crs::WEB_MERCATOR, &three_in_a_row([0, 1, 2]))
            .unwrap();
        let shuffled = allocator
            .allocate(&set, Crs::WEB_MERCATOR, &three_in_a_row([2, 0, 1]))
            .unwrap();

        for id in 0..3 {
            assert!((near_by_id(&forward, id) - near_by_id(&shuffled, id)).abs() < 1e-3);
        }
    }

    #[test]
    fn pairwise_strategy_gives_three_way_overlap_to_the_middle_point() {
        let set = zones(vec![zone("z", rect(0.0, 0.0, 3.0, 1.0), Some(900.0))]);

        let result = run(&set, &three_in_a_row([0, 1, 2]));

        assert!(near_by_id(&result, 0).abs() < 1e-3);
        assert!((near_by_id(&result, 1) - 900.0).abs() < 1e-3);
        assert!(near_by_id(&result, 2).abs() < 1e-3);
    }
}
