//! `OpenRouteService` isochrone client.

use std::time::Duration;

use geojson::Feature;
use serde::Serialize;

use crate::circle::fallback_isochrones;
use crate::{FallbackConfig, IsochroneConfig, IsochroneError, retry};

/// Where a set of isochrones came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsochroneSource {
    /// Computed by the routing service.
    Routing,
    /// Circles sized by walking speed.
    Fallback,
}

/// Isochrone polygons for one location, smallest range first.
#[derive(Debug, Clone, Serialize)]
pub struct Isochrones {
    /// One `GeoJSON` feature per range, in WGS84.
    pub features: Vec<Feature>,
    /// Where the features came from.
    pub source: IsochroneSource,
}

/// Client for the `OpenRouteService` isochrone endpoint.
#[derive(Debug, Clone)]
pub struct OrsClient {
    http: reqwest::Client,
    config: IsochroneConfig,
    fallback: FallbackConfig,
    api_key: Option<String>,
}

impl OrsClient {
    /// Builds a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`IsochroneError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: IsochroneConfig,
        fallback: FallbackConfig,
        api_key: Option<String>,
    ) -> Result<Self, IsochroneError> {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            log::warn!(
                "ORS_API_KEY is not set; requests to {} may be rejected and fall back to circles",
                config.base_url
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            fallback,
            api_key,
        })
    }

    /// Routing service settings.
    #[must_use]
    pub const fn config(&self) -> &IsochroneConfig {
        &self.config
    }

    /// Fallback circle settings.
    #[must_use]
    pub const fn fallback(&self) -> &FallbackConfig {
        &self.fallback
    }

    /// Full URL of the isochrone endpoint for the configured profile.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v2/isochrones/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        )
    }

    /// Requests isochrones from the routing service.
    ///
    /// # Errors
    ///
    /// Returns [`IsochroneError`] if the request fails, the response is
    /// malformed, or it contains no features.
    pub async fn fetch(
        &self,
        lat: f64,
        lng: f64,
        ranges: &[u32],
    ) -> Result<Vec<Feature>, IsochroneError> {
        let url = self.endpoint();
        let body = request_body(lat, lng, ranges);

        let response = retry::send_json(
            || {
                let request = self
                    .http
                    .post(&url)
                    .header(
                        reqwest::header::ACCEPT,
                        "application/json, application/geo+json",
                    )
                    .json(&body);
                match &self.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            },
            self.config.max_retries,
        )
        .await?;

        parse_features(response)
    }

    /// Isochrones for `ranges` (or the configured default ranges) around a
    /// location, falling back to circles on any routing failure.
    ///
    /// # Errors
    ///
    /// Returns [`IsochroneError::Projection`] only when the coordinates are
    /// not finite, so no fallback can be built either.
    pub async fn isochrones_or_fallback(
        &self,
        lat: f64,
        lng: f64,
        ranges: Option<&[u32]>,
    ) -> Result<Isochrones, IsochroneError> {
        let ranges = ranges.unwrap_or(self.config.ranges.as_slice());

        match self.fetch(lat, lng, ranges).await {
            Ok(features) => Ok(Isochrones {
                features,
                source: IsochroneSource::Routing,
            }),
            Err(e) => {
                log::warn!("Isochrone request for ({lat}, {lng}) failed, using fallback: {e}");
                Ok(Isochrones {
                    features: fallback_isochrones(lat, lng, ranges, &self.fallback)?,
                    source: IsochroneSource::Fallback,
                })
            }
        }
    }
}

/// Request body for one location. The service expects `[lng, lat]`.
#[must_use]
pub fn request_body(lat: f64, lng: f64, ranges: &[u32]) -> serde_json::Value {
    serde_json::json!({
        "locations": [[lng, lat]],
        "range": ranges,
        "range_type": "time",
    })
}

/// Extracts the features of an isochrone response.
///
/// # Errors
///
/// Returns [`IsochroneError::Empty`] when there are no features and
/// [`IsochroneError::Json`] when a feature is malformed.
pub fn parse_features(mut response: serde_json::Value) -> Result<Vec<Feature>, IsochroneError> {
    let features = response
        .get_mut("features")
        .map(serde_json::Value::take);

    let Some(serde_json::Value::Array(features)) = features else {
        return Err(IsochroneError::Empty);
    };
    if features.is_empty() {
        return Err(IsochroneError::Empty);
    }

    features
        .into_iter()
        .map(|feature| serde_json::from_value(feature).map_err(IsochroneError::from))
        .collect()
}
