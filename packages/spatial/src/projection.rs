//! Spherical Web Mercator (EPSG:3857) projection.
//!
//! Census zones and band polygons arrive as WGS84 longitude/latitude and
//! are projected to Web Mercator so that intersection areas, area ratios
//! and centroid distances are computed in a planar reference. Mercator is
//! not equal-area, but within the extent of one census zone the scale
//! factor is effectively constant, so the area ratios the allocator uses
//! are preserved.

use catchment_geography_models::Crs;
use geo::{Coord, MapCoords};
use thiserror::Error;

/// Radius of the Web Mercator sphere in metres.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude at which Web Mercator is clipped to a square world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Errors from reprojecting geometry.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// No transform is implemented between the two systems.
    #[error("Unsupported reprojection from {from} to {to}")]
    Unsupported {
        /// Source reference system.
        from: Crs,
        /// Target reference system.
        to: Crs,
    },

    /// A coordinate was NaN or infinite.
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// X / longitude.
        x: f64,
        /// Y / latitude.
        y: f64,
    },
}

type Transform = fn(Coord<f64>) -> Result<Coord<f64>, ProjectionError>;

/// Projects a WGS84 longitude/latitude coordinate to Web Mercator metres.
///
/// Latitudes beyond [`MAX_LATITUDE`] are clamped.
///
/// # Errors
///
/// Returns [`ProjectionError::NonFinite`] for NaN or infinite input.
pub fn lnglat_to_mercator(coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
    check_finite(coord)?;
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Ok(Coord {
        x: EARTH_RADIUS_M * coord.x.to_radians(),
        y: EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
    })
}

/// Inverse of [`lnglat_to_mercator`].
///
/// # Errors
///
/// Returns [`ProjectionError::NonFinite`] for NaN or infinite input.
pub fn mercator_to_lnglat(coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
    check_finite(coord)?;
    Ok(Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2)
            .to_degrees(),
    })
}

/// Web Mercator units per ground metre at `latitude` degrees.
///
/// Multiply a ground distance by this to get the equivalent distance in
/// projected coordinates around that latitude.
#[must_use]
pub fn mercator_scale(latitude: f64) -> f64 {
    1.0 / latitude
        .clamp(-MAX_LATITUDE, MAX_LATITUDE)
        .to_radians()
        .cos()
}

/// Reprojects any `geo` geometry between two supported systems.
///
/// Identity when `from == to`. Supported pairs are WGS84 ↔ Web Mercator.
///
/// # Errors
///
/// Returns [`ProjectionError`] for unsupported pairs or non-finite
/// coordinates.
pub fn reproject<G>(geometry: &G, from: Crs, to: Crs) -> Result<G::Output, ProjectionError>
where
    G: MapCoords<f64, f64>,
{
    let transform: Transform = if from == to {
        identity
    } else if from == Crs::WGS84 && to == Crs::WEB_MERCATOR {
        lnglat_to_mercator
    } else if from == Crs::WEB_MERCATOR && to == Crs::WGS84 {
        mercator_to_lnglat
    } else {
        return Err(ProjectionError::Unsupported { from, to });
    };

    geometry.try_map_coords(transform)
}

/// Whether [`reproject`] can convert from `crs` into Web Mercator.
#[must_use]
pub fn is_supported(crs: Crs) -> bool {
    crs == Crs::WGS84 || crs == Crs::WEB_MERCATOR
}

fn identity(coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
    check_finite(coord)?;
    Ok(coord)
}

fn check_finite(coord: Coord<f64>) -> Result<(), ProjectionError> {
    if coord.x.is_finite() && coord.y.is_finite() {
        Ok(())
    } else {
        Err(ProjectionError::NonFinite {
            x: coord.x,
            y: coord.y,
        })
    }
}
