//! Coordinate reference system identifiers.
//!
//! Only EPSG codes are modelled. Legacy `GeoJSON` `crs` members use URN
//! spellings (`urn:ogc:def:crs:EPSG::4326`, `urn:ogc:def:crs:OGC:1.3:CRS84`),
//! so parsing accepts those as well as the short `EPSG:4326` form.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An EPSG coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    epsg: u32,
}

impl Crs {
    /// Geographic WGS84 longitude/latitude (EPSG:4326).
    pub const WGS84: Self = Self { epsg: 4326 };

    /// Spherical Web Mercator in metres (EPSG:3857).
    pub const WEB_MERCATOR: Self = Self { epsg: 3857 };

    /// Wraps a raw EPSG code.
    #[must_use]
    pub const fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    /// The EPSG code.
    #[must_use]
    pub const fn epsg(self) -> u32 {
        self.epsg
    }

    /// Whether coordinates are angular degrees rather than planar units.
    #[must_use]
    pub const fn is_geographic(self) -> bool {
        self.epsg == 4326
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = InvalidCrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }

        // The code is always the last segment, with or without a version
        // (`urn:ogc:def:crs:EPSG:6.6:4326`).
        let code = upper
            .contains("EPSG")
            .then(|| upper.rsplit(':').next())
            .flatten()
            .ok_or_else(|| InvalidCrsError {
                value: trimmed.to_string(),
            })?;

        code.parse::<u32>()
            .map(Self::from_epsg)
            .map_err(|_| InvalidCrsError {
                value: trimmed.to_string(),
            })
    }
}

impl TryFrom<String> for Crs {
    type Error = InvalidCrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Error returned when a string does not name an EPSG reference system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCrsError {
    /// The unrecognized value.
    pub value: String,
}

impl std::fmt::Display for InvalidCrsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate reference system '{}': expected EPSG:<code>",
            self.value
        )
    }
}

impl std::error::Error for InvalidCrsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_form() {
        assert_eq!("EPSG:3857".parse::<Crs>().unwrap(), Crs::WEB_MERCATOR);
        assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::WGS84);
    }

    #[test]
    fn parses_legacy_geojson_urns() {
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(),
            Crs::WGS84
        );
        assert_eq!(
            "urn:ogc:def:crs:EPSG::3763".parse::<Crs>().unwrap(),
            Crs::from_epsg(3763)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!("WGS 84".parse::<Crs>().is_err());
        assert!("EPSG:abc".parse::<Crs>().is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_value(Crs::WEB_MERCATOR).unwrap();
        assert_eq!(json, serde_json::json!("EPSG:3857"));
        let back: Crs = serde_json::from_value(json).unwrap();
        assert_eq!(back, Crs::WEB_MERCATOR);
    }

    #[test]
    fn display_roundtrips() {
        let crs = Crs::from_epsg(3763);
        assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        assert!(!crs.is_geographic());
        assert!(Crs::WGS84.is_geographic());
    }
}
