//! Near and far bands for demand points.
//!
//! A point that arrives with at least two isochrone features uses the
//! first as its near band and the second as its far band. Anything else
//! (no isochrones, one isochrone, or features that fail to parse) gets
//! fallback circles of the configured radii.

use catchment_allocator_models::{DemandPoint, PointId};
use catchment_geography_models::Crs;
use catchment_spatial::{geometry_to_multipolygon, projection};
use geo::{Coord, MultiPolygon, Point};

use crate::circle::fallback_bands;
use crate::{FallbackConfig, IsochroneError};

/// How a demand point's bands were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandOrigin {
    /// Parsed from supplied isochrone features.
    Isochrones,
    /// Fallback circles.
    Circles,
}

/// Builds demand points in a target reference system.
#[derive(Debug, Clone)]
pub struct BandBuilder {
    fallback: FallbackConfig,
    target: Crs,
}

impl BandBuilder {
    /// A builder producing geometry in `target`.
    #[must_use]
    pub const fn new(fallback: FallbackConfig, target: Crs) -> Self {
        Self { fallback, target }
    }

    /// Reference system of the built points.
    #[must_use]
    pub const fn target(&self) -> Crs {
        self.target
    }

    /// Builds the demand point for a WGS84 location.
    ///
    /// `isochrones` are `GeoJSON` features in WGS84, smallest range first.
    ///
    /// # Errors
    ///
    /// Returns [`IsochroneError::Projection`] if the location cannot be
    /// projected (non-finite coordinates).
    pub fn demand_point(
        &self,
        id: PointId,
        lat: f64,
        lng: f64,
        isochrones: Option<&[serde_json::Value]>,
    ) -> Result<(DemandPoint, BandOrigin), IsochroneError> {
        let location: Point<f64> = projection::reproject(
            &Point::from(Coord { x: lng, y: lat }),
            Crs::WGS84,
            self.target,
        )?;

        let parsed = match isochrones {
            Some([near, far, ..]) => match (self.parse_band(near), self.parse_band(far)) {
                (Ok(near), Ok(far)) => Some((near, far)),
                (Err(e), _) | (_, Err(e)) => {
                    log::warn!("Could not use isochrones for point {id}, using circles: {e}");
                    None
                }
            },
            _ => None,
        };

        let (near_band, far_band, origin) = match parsed {
            Some((near, far)) => (near, far, BandOrigin::Isochrones),
            None => {
                let (near, far) = fallback_bands(lat, lng, &self.fallback)?;
                (
                    projection::reproject(&near, Crs::WEB_MERCATOR, self.target)?,
                    projection::reproject(&far, Crs::WEB_MERCATOR, self.target)?,
                    BandOrigin::Circles,
                )
            }
        };

        Ok((
            DemandPoint {
                id,
                location,
                near_band,
                far_band,
            },
            origin,
        ))
    }

    fn parse_band(&self, feature: &serde_json::Value) -> Result<MultiPolygon<f64>, String> {
        let geometry = feature
            .get("geometry")
            .ok_or_else(|| "isochrone feature has no geometry".to_string())?;
        let geometry = geojson::Geometry::from_json_value(geometry.clone())
            .map_err(|e| e.to_string())?;
        let band = geometry_to_multipolygon(geometry)
            .ok_or_else(|| "isochrone geometry is not a polygon".to_string())?;
        projection::reproject(&band, Crs::WGS84, self.target).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains};
    use serde_json::json;

    const LAT: f64 = 38.5714;
    const LNG: f64 = -7.9135;

    fn builder() -> BandBuilder {
        BandBuilder::new(FallbackConfig::default(), Crs::WEB_MERCATOR)
    }

    fn square_feature(half: f64, value: u32) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": {"value": value},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [LNG - half, LAT - half],
                    [LNG + half, LAT - half],
                    [LNG + half, LAT + half],
                    [LNG - half, LAT + half],
                    [LNG - half, LAT - half]
                ]]
            }
        })
    }

    #[test]
    fn two_isochrones_become_near_and_far() {
        let isochrones = vec![square_feature(0.003, 300), square_feature(0.006, 600)];

        let (point, origin) = builder()
            .demand_point(PointId::Ordinal(0), LAT, LNG, Some(isochrones.as_slice()))
            .unwrap();

        assert_eq!(origin, BandOrigin::Isochrones);
        assert!(point.far_band.unsigned_area() > point.near_band.unsigned_area() * 3.0);
        assert!(point.near_band.contains(&point.location));
    }

    #[test]
    fn missing_or_single_isochrone_uses_circles() {
        let single = vec![square_feature(0.003, 300)];

        for isochrones in [None, Some(single.as_slice())] {
            let (point, origin) = builder()
                .demand_point(PointId::Ordinal(0), LAT, LNG, isochrones)
                .unwrap();
            assert_eq!(origin, BandOrigin::Circles);
            assert!(point.far_band.unsigned_area() > point.near_band.unsigned_area());
        }
    }

    #[test]
    fn malformed_isochrone_falls_back_to_circles() {
        let isochrones = vec![
            square_feature(0.003, 300),
            json!({"type": "Feature", "geometry": {"type": "Point", "coordinates": [LNG, LAT]}}),
        ];

        let (_, origin) = builder()
            .demand_point(PointId::Ordinal(1), LAT, LNG, Some(isochrones.as_slice()))
            .unwrap();

        assert_eq!(origin, BandOrigin::Circles);
    }

    #[test]
    fn circles_follow_configured_radii() {
        let fallback = FallbackConfig {
            near_radius_m: 100.0,
            far_radius_m: 200.0,
            ..FallbackConfig::default()
        };
        let (point, _) = BandBuilder::new(fallback, Crs::WEB_MERCATOR)
            .demand_point(PointId::Ordinal(0), 0.0, 0.0, None)
            .unwrap();

        let ratio = point.far_band.unsigned_area() / point.near_band.unsigned_area();
        assert!((ratio - 4.0).abs() < 1e-6);
        let circle = std::f64::consts::PI * 1e4;
        assert!((point.near_band.unsigned_area() - circle).abs() / circle < 1e-2);
    }

    #[test]
    fn wgs84_target_keeps_degrees() {
        let (point, _) = BandBuilder::new(FallbackConfig::default(), Crs::WGS84)
            .demand_point(PointId::Ordinal(0), LAT, LNG, None)
            .unwrap();

        assert!((point.location.x() - LNG).abs() < 1e-12);
        assert!((point.location.y() - LAT).abs() < 1e-12);
        assert!(point.near_band.contains(&point.location));
    }

    #[test]
    fn non_finite_location_is_rejected() {
        assert!(
            builder()
                .demand_point(PointId::Ordinal(0), f64::NAN, LNG, None)
                .is_err()
        );
    }
}
