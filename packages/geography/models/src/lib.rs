#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census zone and geographic reference types.
//!
//! These types describe the polygonal census zones (tracts, statistical
//! subsections) that carry the resident population counts, and the
//! coordinate reference system they are expressed in.

pub mod crs;

pub use crs::{Crs, InvalidCrsError};

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// A census zone ready for population allocation.
///
/// The geometry is expressed in whatever reference system the owning
/// zone set declares; zones never carry their own reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusZone {
    /// Stable identifier (feature id or the configured id column).
    pub id: String,
    /// Zone boundary.
    pub geometry: MultiPolygon<f64>,
    /// Resident population. `None` when the population attribute is
    /// absent or non-numeric for this zone.
    pub population: Option<f64>,
}

impl CensusZone {
    /// Population to allocate from this zone. Missing and non-finite
    /// values count as zero.
    #[must_use]
    pub fn population_or_zero(&self) -> f64 {
        self.population.filter(|p| p.is_finite()).unwrap_or(0.0)
    }
}

/// Bounding box of the census data in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Westernmost longitude.
    pub minx: f64,
    /// Southernmost latitude.
    pub miny: f64,
    /// Easternmost longitude.
    pub maxx: f64,
    /// Northernmost latitude.
    pub maxy: f64,
}

impl Bounds {
    /// Grows the box to include another box.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            minx: self.minx.min(other.minx),
            miny: self.miny.min(other.miny),
            maxx: self.maxx.max(other.maxx),
            maxy: self.maxy.max(other.maxy),
        }
    }
}

/// Description of a prepared census dataset, persisted as `metadata.json`
/// next to the data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusMetadata {
    /// Property holding the resident count, if one was found.
    pub pop_column: Option<String>,
    /// Number of features in the data file.
    pub total_features: usize,
    /// Extent of the data (WGS84).
    pub bounds: Option<Bounds>,
    /// Property names in the order they appear in the data.
    pub columns: Vec<String>,
    /// Reference system of the data file.
    #[serde(default = "default_crs")]
    pub crs: Crs,
}

const fn default_crs() -> Crs {
    Crs::WGS84
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_population_counts_as_zero() {
        let zone = CensusZone {
            id: "z1".to_string(),
            geometry: MultiPolygon(vec![]),
            population: None,
        };
        assert!(zone.population_or_zero().abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_population_counts_as_zero() {
        for population in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let zone = CensusZone {
                id: "z1".to_string(),
                geometry: MultiPolygon(vec![]),
                population: Some(population),
            };
            assert!(zone.population_or_zero().abs() < f64::EPSILON);
        }
    }

    #[test]
    fn bounds_union_expands() {
        let a = Bounds {
            minx: 0.0,
            miny: 0.0,
            maxx: 1.0,
            maxy: 1.0,
        };
        let b = Bounds {
            minx: -1.0,
            miny: 0.5,
            maxx: 0.5,
            maxy: 2.0,
        };
        assert_eq!(
            a.union(b),
            Bounds {
                minx: -1.0,
                miny: 0.0,
                maxx: 1.0,
                maxy: 2.0,
            }
        );
    }

    #[test]
    fn metadata_without_crs_defaults_to_wgs84() {
        let json = serde_json::json!({
            "pop_column": "N_INDIVIDUOS",
            "total_features": 3,
            "bounds": { "minx": -8.0, "miny": 38.5, "maxx": -7.8, "maxy": 38.6 },
            "columns": ["BGRI2021", "N_INDIVIDUOS"]
        });
        let metadata: CensusMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(metadata.crs, Crs::WGS84);
        assert_eq!(metadata.pop_column.as_deref(), Some("N_INDIVIDUOS"));
    }
}
