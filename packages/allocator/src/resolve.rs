//! Splitting a census zone between several claimants.
//!
//! Both strategies take the claimants' raw regions (zone ∩ band, or the
//! ring for the far pass) and return each claimant's final region area.

use catchment_allocator_models::{DemandPoint, OverlapStrategy};
use geo::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};

use crate::geometry::{GeometryError, GeometryOps};

/// A point's positive-area share of one zone, before overlap resolution.
#[derive(Debug, Clone)]
pub struct Claim {
    /// Index of the point in the input slice.
    pub point: usize,
    /// Region of the zone reachable from the point in the current band.
    pub region: MultiPolygon<f64>,
}

/// Final region area per claimant, in claim order.
pub fn resolve<G: GeometryOps>(
    geometry: &G,
    strategy: OverlapStrategy,
    zone_bounds: Option<Rect<f64>>,
    points: &[DemandPoint],
    claims: &[Claim],
) -> Vec<(usize, f64)> {
    claims
        .iter()
        .map(|claim| {
            let region = match (strategy, zone_bounds) {
                (OverlapStrategy::Voronoi, Some(bounds)) => {
                    voronoi_region(geometry, points, claims, claim, bounds)
                }
                _ => pairwise_region(geometry, points, claims, claim),
            };
            (claim.point, geometry.area(&region))
        })
        .collect()
}

/// Nearest-point-wins differencing against every other claimant in order.
///
/// Each overlap between the working region and another claimant's raw
/// region goes to whichever location is nearer the overlap's centroid.
/// Ties stay with `claim`.
fn pairwise_region<G: GeometryOps>(
    geometry: &G,
    points: &[DemandPoint],
    claims: &[Claim],
    claim: &Claim,
) -> MultiPolygon<f64> {
    let location = points[claim.point].location;
    let mut region = claim.region.clone();

    for other in claims.iter().filter(|o| o.point != claim.point) {
        let other_location = points[other.point].location;
        match lose_overlap_if_farther(geometry, &region, location, other, other_location) {
            Ok(Some(reduced)) => region = reduced,
            Ok(None) => {}
            Err(e) => log::warn!(
                "Keeping overlap between points {} and {}: {e}",
                points[claim.point].id,
                points[other.point].id
            ),
        }
    }

    region
}

fn lose_overlap_if_farther<G: GeometryOps>(
    geometry: &G,
    region: &MultiPolygon<f64>,
    location: Point<f64>,
    other: &Claim,
    other_location: Point<f64>,
) -> Result<Option<MultiPolygon<f64>>, GeometryError> {
    if !geometry.intersects(region, &other.region)? {
        return Ok(None);
    }

    let overlap = geometry.intersection(region, &other.region)?;
    if overlap.0.is_empty() {
        return Ok(None);
    }

    let Some(centroid) = geometry.centroid(&overlap) else {
        return Ok(None);
    };

    if geometry.distance(other_location, centroid) < geometry.distance(location, centroid) {
        geometry.difference(region, &overlap).map(Some)
    } else {
        Ok(None)
    }
}

/// Removes from `claim` every part of its overlaps that lies on the other
/// claimant's side of their perpendicular bisector.
///
/// Only the raw regions are compared, so the result does not depend on the
/// order of `claims`. Claimants at the same location split nothing; the
/// earlier one keeps the whole overlap.
fn voronoi_region<G: GeometryOps>(
    geometry: &G,
    points: &[DemandPoint],
    claims: &[Claim],
    claim: &Claim,
    bounds: Rect<f64>,
) -> MultiPolygon<f64> {
    let location = points[claim.point].location;
    let mut region = claim.region.clone();

    for other in claims.iter().filter(|o| o.point != claim.point) {
        let other_location = points[other.point].location;
        let reduced = overlap_on_far_side(geometry, claim, location, other, other_location, bounds)
            .and_then(|lost| match lost {
                Some(lost) if !lost.0.is_empty() => geometry.difference(&region, &lost).map(Some),
                _ => Ok(None),
            });

        match reduced {
            Ok(Some(r)) => region = r,
            Ok(None) => {}
            Err(e) => log::warn!(
                "Keeping overlap between points {} and {}: {e}",
                points[claim.point].id,
                points[other.point].id
            ),
        }
    }

    region
}

/// The part of `claim`'s raw overlap with `other` that is closer to
/// `other`'s location.
fn overlap_on_far_side<G: GeometryOps>(
    geometry: &G,
    claim: &Claim,
    location: Point<f64>,
    other: &Claim,
    other_location: Point<f64>,
    bounds: Rect<f64>,
) -> Result<Option<MultiPolygon<f64>>, GeometryError> {
    if !geometry.intersects(&claim.region, &other.region)? {
        return Ok(None);
    }
    let overlap = geometry.intersection(&claim.region, &other.region)?;
    if overlap.0.is_empty() {
        return Ok(None);
    }
    match closer_half_plane(location, other_location, bounds) {
        Some(half_plane) => geometry.intersection(&overlap, &half_plane).map(Some),
        None if other.point < claim.point => Ok(Some(overlap)),
        None => Ok(None),
    }
}

/// The part of the plane around `bounds` that is strictly closer to `q`
/// than to `p`, as a polygon large enough to cover `bounds`.
///
/// `None` when `p` and `q` coincide.
fn closer_half_plane(p: Point<f64>, q: Point<f64>, bounds: Rect<f64>) -> Option<MultiPolygon<f64>> {
    let dx = q.x() - p.x();
    let dy = q.y() - p.y();
    let len = dx.hypot(dy);
    if !len.is_normal() {
        return None;
    }

    let d = Coord {
        x: dx / len,
        y: dy / len,
    };
    let n = Coord { x: -d.y, y: d.x };
    let mid = Coord {
        x: f64::midpoint(p.x(), q.x()),
        y: f64::midpoint(p.y(), q.y()),
    };

    // Every corner of `bounds` must lie within `reach` of the midpoint.
    let reach = [
        bounds.min(),
        bounds.max(),
        Coord {
            x: bounds.min().x,
            y: bounds.max().y,
        },
        Coord {
            x: bounds.max().x,
            y: bounds.min().y,
        },
    ]
    .iter()
    .map(|c| (c.x - mid.x).hypot(c.y - mid.y))
    .fold(0.0_f64, f64::max)
        + 1.0;

    let at = |along_d: f64, along_n: f64| Coord {
        x: mid.x + d.x * along_d + n.x * along_n,
        y: mid.y + d.y * along_d + n.y * along_n,
    };

    let ring = LineString(vec![
        at(0.0, -reach),
        at(2.0 * reach, -reach),
        at(2.0 * reach, reach),
        at(0.0, reach),
        at(0.0, -reach),
    ]);

    Some(MultiPolygon(vec![Polygon::new(ring, vec![])]))
}
