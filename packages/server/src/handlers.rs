//! HTTP handler functions for the catchment API.

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use catchment_allocator_models::{DemandPoint, PointId};
use catchment_geography::{CensusDataset, CensusError};
use catchment_isochrone::IsochroneSource;
use catchment_points::{ExportPoint, PointsError};
use catchment_server_models::{
    ApiError, ApiHealth, ApiImportedPoint, ExportRequest, ImportResponse, IsochroneRequest,
    IsochroneResponse, PopulationRequest, PopulationResponse,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        census_loaded: state.census.current().is_some(),
    })
}

/// `GET /api/census-metadata`
///
/// Returns the metadata of the loaded census dataset, loading it first
/// if needed.
pub async fn census_metadata(state: web::Data<AppState>) -> HttpResponse {
    match load_census(&state).await {
        Ok(dataset) => HttpResponse::Ok().json(dataset.metadata()),
        Err(e) => {
            log::warn!("Census metadata unavailable: {e}");
            HttpResponse::NotFound().json(ApiError::new("Census metadata not available"))
        }
    }
}

/// `POST /api/census/reload`
///
/// Re-reads the census dataset from disk. The previous dataset stays in
/// service when the reload fails.
pub async fn reload_census(state: web::Data<AppState>) -> HttpResponse {
    let store = state.clone();
    let result = web::block(move || store.census.reload()).await;

    match result {
        Ok(Ok(dataset)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "total_features": dataset.metadata().total_features,
            "pop_column": dataset.population_column(),
        })),
        Ok(Err(e)) => {
            log::error!("Failed to reload census data: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(format!(
                "Failed to reload census data: {e}"
            )))
        }
        Err(e) => {
            log::error!("Census reload task failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to reload census data"))
        }
    }
}

/// `POST /api/isochrones`
///
/// Fetches walking isochrones around a location, falling back to circles
/// when the routing service is unavailable.
pub async fn isochrones(
    state: web::Data<AppState>,
    body: web::Json<IsochroneRequest>,
) -> HttpResponse {
    let IsochroneRequest { lat, lng, ranges } = body.into_inner();
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return HttpResponse::BadRequest().json(ApiError::new("Coordinates not provided"));
    };

    match state
        .isochrones
        .isochrones_or_fallback(lat, lng, ranges.as_deref())
        .await
    {
        Ok(result) => HttpResponse::Ok().json(IsochroneResponse {
            fallback: result.source == IsochroneSource::Fallback,
            isochrones: result.features,
        }),
        Err(e) => {
            log::warn!("No isochrones for ({lat}, {lng}): {e}");
            HttpResponse::BadRequest().json(ApiError::new(format!("Invalid coordinates: {e}")))
        }
    }
}

/// `POST /api/population-in-isochrones`
///
/// Allocates census population to the requested points. Each point uses
/// its supplied isochrones when it has at least two, else fallback
/// circles.
pub async fn population_in_isochrones(
    state: web::Data<AppState>,
    body: web::Json<PopulationRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    if request.points.is_empty() {
        return HttpResponse::Ok().json(PopulationResponse::default());
    }

    let dataset = match load_census(&state).await {
        Ok(dataset) => dataset,
        Err(e) => {
            log::error!("Census data not loaded: {e}");
            return HttpResponse::InternalServerError()
                .json(ApiError::new(format!("Census data not loaded: {e}")));
        }
    };

    let mut points: Vec<DemandPoint> = Vec::with_capacity(request.points.len());
    for (index, point) in request.points.iter().enumerate() {
        let id = PointId::explicit_or_ordinal(point.id.clone(), index);
        match state
            .bands
            .demand_point(id, point.lat, point.lng, point.isochrones.as_deref())
        {
            Ok((demand_point, origin)) => {
                log::debug!("Point {} uses {origin:?} bands", demand_point.id);
                points.push(demand_point);
            }
            Err(e) => {
                return HttpResponse::BadRequest()
                    .json(ApiError::new(format!("Invalid point at position {index}: {e}")));
            }
        }
    }

    let allocator = state.allocator;
    let crs = state.bands.target();
    let result = web::block(move || allocator.allocate(dataset.zones(), crs, &points)).await;

    match result {
        Ok(Ok(allocation)) => HttpResponse::Ok().json(PopulationResponse::from_allocation(
            allocation.rounded(),
            &request.points,
        )),
        Ok(Err(e)) => {
            log::error!("Allocation rejected: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(e.to_string()))
        }
        Err(e) => {
            log::error!("Allocation task failed: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new("Failed to calculate population"))
        }
    }
}

/// `POST /api/export-points`
///
/// Renders the posted points as a CSV attachment.
pub async fn export_points(body: web::Json<ExportRequest>) -> HttpResponse {
    let points: Vec<ExportPoint> = match body
        .into_inner()
        .points
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()
    {
        Ok(points) => points,
        Err(e) => {
            return HttpResponse::BadRequest().json(ApiError::new(format!("Invalid point: {e}")));
        }
    };

    match catchment_points::export_points(&points) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                header::CONTENT_DISPOSITION,
                "attachment; filename=stations.csv",
            ))
            .body(csv),
        Err(PointsError::NothingToExport) => {
            HttpResponse::BadRequest().json(ApiError::new("No points to export"))
        }
        Err(e) => {
            log::error!("Failed to export points: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to export points"))
        }
    }
}

/// `POST /api/import-points`
///
/// Parses a raw `id,lat,lng` CSV body. Rows without an id are numbered
/// from the current epoch milliseconds.
///
/// The CSV must be the request body itself. Multipart form uploads (a
/// `file` field) are not accepted and get a 400 telling the client so.
pub async fn import_points(req: HttpRequest, body: String) -> HttpResponse {
    if is_multipart(&req) {
        return HttpResponse::BadRequest().json(ApiError::new(
            "Multipart uploads are not supported; send the CSV as the request body",
        ));
    }

    if body.trim().is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new("No file sent"));
    }

    let base_id = chrono::Utc::now().timestamp_millis();

    match catchment_points::parse_points(&body, base_id) {
        Ok(points) => HttpResponse::Ok().json(ImportResponse::new(
            points
                .into_iter()
                .map(|p| ApiImportedPoint {
                    id: p.id,
                    lat: p.lat,
                    lng: p.lng,
                })
                .collect(),
        )),
        Err(PointsError::NoValidPoints) => {
            HttpResponse::BadRequest().json(ApiError::new("No valid points found in CSV"))
        }
        Err(e) => {
            log::error!("Failed to import points: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new(format!("Error processing CSV: {e}")))
        }
    }
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/")
        })
}

/// Returns the current census dataset, loading it on the blocking pool if
/// no dataset is in service yet.
async fn load_census(state: &web::Data<AppState>) -> Result<Arc<CensusDataset>, CensusError> {
    if let Some(dataset) = state.census.current() {
        return Ok(dataset);
    }

    let store = state.clone();
    web::block(move || store.census.get_or_load())
        .await
        .map_err(|e| CensusError::Conversion {
            message: format!("census load task failed: {e}"),
        })?
}
