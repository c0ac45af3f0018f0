#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census zone data management.
//!
//! Converts a source boundary file into a WGS84 `GeoJSON` dataset plus a
//! `metadata.json` summary ([`prepare`]), loads that dataset into a
//! projected, R-tree indexed [`catchment_spatial::ZoneSet`]
//! ([`load_dataset`]), and keeps the loaded dataset shared between requests
//! ([`CensusStore`]).

pub mod columns;
pub mod load;
pub mod prepare;
pub mod store;

use std::path::PathBuf;

use catchment_geography_models::{Crs, InvalidCrsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use load::{CensusDataset, load_dataset, parse_dataset, read_metadata};
pub use prepare::{prepare, write_metadata};
pub use store::CensusStore;

/// Errors that can occur while preparing or loading census data.
#[derive(Debug, Error)]
pub enum CensusError {
    /// The census data file has not been prepared yet.
    #[error("Census data not found at {}. Run `catchment prepare` first.", path.display())]
    NotFound {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The data file declares a reference system that cannot be parsed.
    #[error("Invalid CRS: {0}")]
    Crs(#[from] InvalidCrsError),

    /// The data file declares a reference system with no projection.
    #[error("Unsupported CRS {crs}: census data must be in EPSG:4326 or EPSG:3857")]
    UnsupportedCrs {
        /// The declared reference system.
        crs: Crs,
    },

    /// An external conversion tool failed.
    #[error("{program} failed: {message}")]
    Command {
        /// Program that was run.
        program: &'static str,
        /// What went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Where the census dataset lives and how its attributes are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    /// Prepared WGS84 `GeoJSON` file.
    pub data_path: PathBuf,
    /// `metadata.json` written by [`prepare`].
    pub metadata_path: PathBuf,
    /// Property holding the resident count. Auto-detected when unset.
    pub population_column: Option<String>,
    /// Property holding the zone identifier. The feature id, then the
    /// feature position, are used when unset.
    pub id_column: Option<String>,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/census_data.geojson"),
            metadata_path: PathBuf::from("data/metadata.json"),
            population_column: None,
            id_column: None,
        }
    }
}
