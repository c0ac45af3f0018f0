//! Offline batch allocation over a points CSV.

use catchment_allocator::{AllocationError, Allocator};
use catchment_allocator_models::{PointId, RoundedAllocation};
use catchment_geography::CensusDataset;
use catchment_isochrone::{BandBuilder, IsochroneError, OrsClient};
use catchment_points::{ExportPoint, ImportedPoint};
use thiserror::Error;

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A point could not be turned into bands.
    #[error("Point {id}: {source}")]
    Point {
        /// Offending point.
        id: String,
        /// Underlying failure.
        source: IsochroneError,
    },

    /// The allocator rejected the run.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Fetches routed isochrones for every point, falling back to circles per
/// point. Requests run one at a time to stay within the service's rate
/// limits.
pub async fn fetch_isochrones(
    client: &OrsClient,
    points: &[ImportedPoint],
) -> Result<Vec<Option<Vec<serde_json::Value>>>, BatchError> {
    let mut all = Vec::with_capacity(points.len());

    for point in points {
        let isochrones = client
            .isochrones_or_fallback(point.lat, point.lng, None)
            .await
            .map_err(|source| BatchError::Point {
                id: point.id.to_string(),
                source,
            })?;

        let features = isochrones
            .features
            .iter()
            .filter_map(|feature| serde_json::to_value(feature).ok())
            .collect();
        all.push(Some(features));
    }

    Ok(all)
}

/// Allocates the dataset's population to `points`.
///
/// `isochrones`, when given, holds one optional feature list per point in
/// the same order.
///
/// # Errors
///
/// Returns [`BatchError`] if a point has non-finite coordinates or the
/// allocator rejects the run.
pub fn allocate_points(
    dataset: &CensusDataset,
    bands: &BandBuilder,
    allocator: &Allocator,
    points: &[ImportedPoint],
    isochrones: &[Option<Vec<serde_json::Value>>],
) -> Result<RoundedAllocation, BatchError> {
    let demand_points = points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let supplied = isochrones.get(index).and_then(Option::as_deref);
            bands
                .demand_point(
                    PointId::Explicit(point.id.clone()),
                    point.lat,
                    point.lng,
                    supplied,
                )
                .map(|(demand_point, _)| demand_point)
                .map_err(|source| BatchError::Point {
                    id: point.id.to_string(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let allocation = allocator.allocate(dataset.zones(), bands.target(), &demand_points)?;
    Ok(allocation.rounded())
}

/// Pairs rounded results with the points they were computed for.
#[must_use]
pub fn export_rows(points: &[ImportedPoint], allocation: &RoundedAllocation) -> Vec<ExportPoint> {
    points
        .iter()
        .zip(&allocation.points)
        .map(|(point, result)| ExportPoint {
            id: Some(point.id.clone()),
            lat: Some(point.lat),
            lng: Some(point.lng),
            population_near: Some(result.population_near.into()),
            population_far: Some(result.population_far.into()),
            population_total: Some(result.population_total.into()),
        })
        .collect()
}
