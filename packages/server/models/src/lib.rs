#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the catchment server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the allocator's result types so the wire contract can evolve
//! independently of the core.

use catchment_allocator_models::{ExplicitId, PointId, RoundedAllocation};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Whether a census dataset is currently loaded.
    pub census_loaded: bool,
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human readable message.
    pub error: String,
}

impl ApiError {
    /// Wraps a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Body of `POST /api/isochrones`.
///
/// Coordinates are optional so that a missing one is answered with a JSON
/// 400 rather than an extractor error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IsochroneRequest {
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lng: Option<f64>,
    /// Ranges in seconds. The configured ranges are used when absent.
    pub ranges: Option<Vec<u32>>,
}

/// Response of `POST /api/isochrones`.
#[derive(Debug, Clone, Serialize)]
pub struct IsochroneResponse {
    /// One `GeoJSON` feature per range, smallest first.
    pub isochrones: Vec<geojson::Feature>,
    /// `true` when the features are circles rather than routed isochrones.
    pub fallback: bool,
}

/// One demand point in a population request.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPointRequest {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Caller id, echoed back. The point's position is used when absent.
    #[serde(default)]
    pub id: Option<ExplicitId>,
    /// Isochrone features previously returned by `/api/isochrones`.
    #[serde(default)]
    pub isochrones: Option<Vec<serde_json::Value>>,
}

/// Body of `POST /api/population-in-isochrones`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopulationRequest {
    /// Demand points in evaluation order.
    #[serde(default)]
    pub points: Vec<ApiPointRequest>,
}

/// Population figures for one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPointPopulation {
    /// Echoed id.
    pub id: PointId,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Residents within the near band.
    pub population_near: u64,
    /// Residents within the far ring.
    pub population_far: u64,
    /// Residents within either.
    pub population_total: u64,
}

/// Response of `POST /api/population-in-isochrones`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationResponse {
    /// Near-band residents over all points.
    pub total_population_near: u64,
    /// Far-ring residents over all points.
    pub total_population_far: u64,
    /// Residents within any band of any point.
    pub total_population: u64,
    /// Per-point figures in request order.
    pub points: Vec<ApiPointPopulation>,
}

impl PopulationResponse {
    /// Joins a rounded allocation with the coordinates of the request
    /// points it was computed for. Both are in request order.
    #[must_use]
    pub fn from_allocation(allocation: RoundedAllocation, requests: &[ApiPointRequest]) -> Self {
        Self {
            total_population_near: allocation.total_population_near,
            total_population_far: allocation.total_population_far,
            total_population: allocation.total_population,
            points: allocation
                .points
                .into_iter()
                .zip(requests)
                .map(|(point, request)| ApiPointPopulation {
                    id: point.id,
                    lat: request.lat,
                    lng: request.lng,
                    population_near: point.population_near,
                    population_far: point.population_far,
                    population_total: point.population_total,
                })
                .collect(),
        }
    }
}

/// Body of `POST /api/export-points`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    /// Points to export, as the client holds them.
    #[serde(default)]
    pub points: Vec<serde_json::Value>,
}

/// One imported point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiImportedPoint {
    /// Row id or a generated one.
    pub id: ExplicitId,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Response of `POST /api/import-points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResponse {
    /// Always `true`; failures use [`ApiError`].
    pub success: bool,
    /// Imported points in file order.
    pub points: Vec<ApiImportedPoint>,
    /// Number of imported points.
    pub count: usize,
}

impl ImportResponse {
    /// A successful import of `points`.
    #[must_use]
    pub fn new(points: Vec<ApiImportedPoint>) -> Self {
        Self {
            success: true,
            count: points.len(),
            points,
        }
    }
}
