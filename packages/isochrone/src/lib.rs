#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Walking-time bands around demand points.
//!
//! Isochrones come from an `OpenRouteService` instance ([`OrsClient`]).
//! When routing is unavailable, circles sized by walking speed stand in
//! for them ([`circle`]). [`bands`] turns either into the near and far
//! polygons the allocator consumes.

pub mod bands;
pub mod circle;
pub mod client;
pub mod retry;

use catchment_spatial::projection::ProjectionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bands::{BandBuilder, BandOrigin};
pub use client::{IsochroneSource, Isochrones, OrsClient};

/// Errors that can occur while fetching or building isochrones.
#[derive(Debug, Error)]
pub enum IsochroneError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The routing service answered with an error status.
    #[error("Routing service returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response excerpt or retry summary.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The routing service returned no isochrone features.
    #[error("Routing service returned no isochrones")]
    Empty,

    /// Coordinates could not be projected.
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),
}

/// Routing service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsochroneConfig {
    /// Service root, without the `/v2/...` path.
    pub base_url: String,
    /// Routing profile.
    pub profile: String,
    /// Default isochrone ranges in seconds.
    pub ranges: Vec<u32>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries on timeouts, rate limiting and server errors.
    pub max_retries: u32,
}

impl Default for IsochroneConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            profile: "foot-walking".to_string(),
            ranges: vec![300, 600],
            timeout_secs: 15,
            max_retries: 1,
        }
    }
}

/// Circle sizes used when real isochrones are unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Walking speed used to size display circles from ranges.
    pub walking_speed_mps: f64,
    /// Near band radius for allocation (about 5 minutes).
    pub near_radius_m: f64,
    /// Far band radius for allocation (about 10 minutes).
    pub far_radius_m: f64,
    /// Vertices per circle.
    pub segments: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            walking_speed_mps: 1.39,
            near_radius_m: 417.0,
            far_radius_m: 833.0,
            segments: 64,
        }
    }
}
