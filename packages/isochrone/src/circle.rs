//! Circular stand-ins for walking isochrones.
//!
//! Circles are built in Web Mercator with the radius scaled by the
//! projection's scale factor at the centre latitude, so they are round on
//! the ground at any latitude.

use catchment_spatial::projection::{self, ProjectionError};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, JsonObject};

use crate::FallbackConfig;

/// A circle of `radius_m` ground metres around a WGS84 `(lng, lat)`,
/// expressed in Web Mercator coordinates.
///
/// # Errors
///
/// Returns [`ProjectionError`] for non-finite coordinates.
pub fn mercator_circle(
    lng: f64,
    lat: f64,
    radius_m: f64,
    segments: usize,
) -> Result<Polygon<f64>, ProjectionError> {
    let center = projection::lnglat_to_mercator(Coord { x: lng, y: lat })?;
    let radius = radius_m * projection::mercator_scale(lat);
    let segments = segments.max(3);

    #[allow(clippy::cast_precision_loss)]
    let ring: Vec<Coord<f64>> = (0..=segments)
        .map(|i| {
            let angle = std::f64::consts::TAU * (i % segments) as f64 / segments as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();

    Ok(Polygon::new(LineString(ring), vec![]))
}

/// Same as [`mercator_circle`], returned in WGS84 degrees.
///
/// # Errors
///
/// Returns [`ProjectionError`] for non-finite coordinates.
pub fn lnglat_circle(
    lng: f64,
    lat: f64,
    radius_m: f64,
    segments: usize,
) -> Result<Polygon<f64>, ProjectionError> {
    let circle = mercator_circle(lng, lat, radius_m, segments)?;
    projection::reproject(
        &circle,
        catchment_geography_models::Crs::WEB_MERCATOR,
        catchment_geography_models::Crs::WGS84,
    )
}

/// One `GeoJSON` feature per range: a circle of `range × walking speed`
/// metres with `properties.value` set to the range in seconds.
///
/// # Errors
///
/// Returns [`ProjectionError`] for non-finite coordinates.
pub fn fallback_isochrones(
    lat: f64,
    lng: f64,
    ranges: &[u32],
    config: &FallbackConfig,
) -> Result<Vec<Feature>, ProjectionError> {
    ranges
        .iter()
        .map(|&range| {
            let radius_m = f64::from(range) * config.walking_speed_mps;
            let circle = lnglat_circle(lng, lat, radius_m, config.segments)?;

            let mut properties = JsonObject::new();
            properties.insert("value".to_string(), serde_json::json!(range));

            Ok(Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::from(&circle)),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect()
}

/// Near and far fallback bands around a WGS84 point, in Web Mercator.
///
/// # Errors
///
/// Returns [`ProjectionError`] for non-finite coordinates.
pub fn fallback_bands(
    lat: f64,
    lng: f64,
    config: &FallbackConfig,
) -> Result<(MultiPolygon<f64>, MultiPolygon<f64>), ProjectionError> {
    let near = mercator_circle(lng, lat, config.near_radius_m, config.segments)?;
    let far = mercator_circle(lng, lat, config.far_radius_m, config.segments)?;
    Ok((MultiPolygon(vec![near]), MultiPolygon(vec![far])))
}
