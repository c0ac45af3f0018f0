#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV exchange format for demand points.
//!
//! Imports read `id,lat,lng` rows (extra columns are ignored). Exports
//! write `id,lat,lng,population_near,population_far,population_total`.

use std::io::Write;

use catchment_allocator_models::ExplicitId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header of exported point files.
pub const EXPORT_HEADER: [&str; 6] = [
    "id",
    "lat",
    "lng",
    "population_near",
    "population_far",
    "population_total",
];

/// Errors that can occur while reading or writing point files.
#[derive(Debug, Error)]
pub enum PointsError {
    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No row had usable coordinates.
    #[error("No valid points found in CSV")]
    NoValidPoints,

    /// Nothing to export.
    #[error("No points to export")]
    NothingToExport,
}

/// A point read from CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedPoint {
    /// The row's id, or a generated one.
    pub id: ExplicitId,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// A point with its population figures, as exported. Every field is
/// optional so that partially filled client state can be exported as is,
/// and population figures are written in the numeric form they arrived in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportPoint {
    /// Point id.
    pub id: Option<ExplicitId>,
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lng: Option<f64>,
    /// Residents within the near band.
    pub population_near: Option<serde_json::Number>,
    /// Residents within the far ring.
    pub population_far: Option<serde_json::Number>,
    /// Residents within either.
    pub population_total: Option<serde_json::Number>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PointRow {
    id: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
}

/// Parses `id,lat,lng` CSV text.
///
/// Integer ids are kept as numbers and any other non-empty id is kept as
/// text. Rows without an id get `base_id + row index`. Rows whose
/// coordinates are missing or not finite numbers are skipped.
///
/// # Errors
///
/// * [`PointsError::Csv`] if the header row cannot be read
/// * [`PointsError::NoValidPoints`] if no row was usable
pub fn parse_points(text: &str, base_id: i64) -> Result<Vec<ImportedPoint>, PointsError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader.headers()?;

    let mut points = Vec::new();
    for (index, result) in reader.deserialize::<PointRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping malformed point row {}: {e}", index + 1);
                continue;
            }
        };

        let (Some(lat), Some(lng)) = (parse_coordinate(row.lat), parse_coordinate(row.lng)) else {
            log::warn!("Skipping point row {} without valid coordinates", index + 1);
            continue;
        };

        let id = match row.id.filter(|id| !id.is_empty()) {
            Some(id) => id
                .parse::<i64>()
                .map_or(ExplicitId::Text(id), ExplicitId::Number),
            None => {
                let offset = i64::try_from(index).unwrap_or(i64::MAX);
                ExplicitId::Number(base_id.saturating_add(offset))
            }
        };

        points.push(ImportedPoint { id, lat, lng });
    }

    if points.is_empty() {
        return Err(PointsError::NoValidPoints);
    }

    log::info!("Imported {} points", points.len());
    Ok(points)
}

fn parse_coordinate(value: Option<String>) -> Option<f64> {
    value?.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Writes points as CSV to `writer`.
///
/// # Errors
///
/// * [`PointsError::NothingToExport`] if `points` is empty
/// * [`PointsError`] if writing fails
pub fn write_points<W: Write>(writer: W, points: &[ExportPoint]) -> Result<(), PointsError> {
    if points.is_empty() {
        return Err(PointsError::NothingToExport);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;

    for point in points {
        csv_writer.write_record([
            point.id.as_ref().map(ToString::to_string).unwrap_or_default(),
            point.lat.map(|v| v.to_string()).unwrap_or_default(),
            point.lng.map(|v| v.to_string()).unwrap_or_default(),
            population_field(point.population_near.as_ref()),
            population_field(point.population_far.as_ref()),
            population_field(point.population_total.as_ref()),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn population_field(value: Option<&serde_json::Number>) -> String {
    value.map_or_else(|| "0".to_string(), ToString::to_string)
}

/// Renders points as a CSV string.
///
/// # Errors
///
/// Same as [`write_points`].
pub fn export_points(points: &[ExportPoint]) -> Result<String, PointsError> {
    let mut buffer = Vec::new();
    write_points(&mut buffer, points)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_keep_their_type_and_missing_ids_are_generated() {
        let csv = "id,lat,lng\n12,38.57,-7.91\nnorth-gate,38.58,-7.92\n,38.59,-7.93\n007,38.6,-7.94\n";

        let points = parse_points(csv, 1_700_000_000_000).unwrap();

        assert_eq!(
            points.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            vec![
                ExplicitId::Number(12),
                ExplicitId::Text("north-gate".to_string()),
                ExplicitId::Number(1_700_000_000_002),
                ExplicitId::Number(7),
            ]
        );
        assert!((points[1].lat - 38.58).abs() < 1e-12);
        assert!((points[1].lng + 7.92).abs() < 1e-12);
    }

    #[test]
    fn rows_with_bad_coordinates_are_skipped() {
        let csv = "id,lat,lng\n1,abc,-7.9\n2,,-7.9\n3,NaN,1\n4,38.5,-7.9\n";

        let points = parse_points(csv, 0).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, ExplicitId::Number(4));
    }

    #[test]
    fn missing_id_column_generates_every_id() {
        let csv = "lat,lng,name\n38.5,-7.9,a\n38.6,-7.8,b\n";

        let points = parse_points(csv, 100).unwrap();

        assert_eq!(points[0].id, ExplicitId::Number(100));
        assert_eq!(points[1].id, ExplicitId::Number(101));
    }

    #[test]
    fn whitespace_and_short_rows_are_tolerated() {
        let csv = "id , lat , lng\n 5 , 38.5 , -7.9 \n6,38.6\n";

        let points = parse_points(csv, 0).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, ExplicitId::Number(5));
    }

    #[test]
    fn nothing_valid_is_an_error() {
        assert!(matches!(
            parse_points("id,lat,lng\nx,,\n", 0),
            Err(PointsError::NoValidPoints)
        ));
        assert!(matches!(
            parse_points("", 0),
            Err(PointsError::NoValidPoints)
        ));
    }

    #[test]
    fn export_writes_header_and_defaults() {
        let points = vec![
            ExportPoint {
                id: Some(ExplicitId::Number(1)),
                lat: Some(38.57),
                lng: Some(-7.91),
                population_near: Some(500_u64.into()),
                population_far: Some(250_u64.into()),
                population_total: Some(750_u64.into()),
            },
            ExportPoint {
                id: Some(ExplicitId::Text("a,b".to_string())),
                ..ExportPoint::default()
            },
        ];

        let csv = export_points(&points).unwrap();

        assert_eq!(
            csv.lines().collect::<Vec<_>>(),
            vec![
                "id,lat,lng,population_near,population_far,population_total",
                "1,38.57,-7.91,500,250,750",
                "\"a,b\",,,0,0,0",
            ]
        );
    }

    #[test]
    fn export_points_deserialize_from_client_json() {
        let points: Vec<ExportPoint> = serde_json::from_value(serde_json::json!([
            {"id": 3, "lat": 38.5, "lng": -7.9, "population_near": 10},
            {"id": "st-1", "lat": 38.6, "lng": -7.8, "extra": true}
        ]))
        .unwrap();

        assert_eq!(points[0].id, Some(ExplicitId::Number(3)));
        assert_eq!(points[0].population_far, None);
        assert_eq!(points[1].id, Some(ExplicitId::Text("st-1".to_string())));
    }

    #[test]
    fn fractional_populations_and_ids_are_written_unchanged() {
        let points: Vec<ExportPoint> = serde_json::from_value(serde_json::json!([
            {"id": 2.5, "lat": 38.5, "lng": -7.9, "population_near": 12.5, "population_far": 3, "population_total": 15.5},
            {"id": 18_446_744_073_709_551_615_u64, "lat": 38.6, "lng": -7.8}
        ]))
        .unwrap();

        let csv = export_points(&points).unwrap();

        assert_eq!(
            csv.lines().collect::<Vec<_>>(),
            vec![
                "id,lat,lng,population_near,population_far,population_total",
                "2.5,38.5,-7.9,12.5,3,15.5",
                "18446744073709551615,38.6,-7.8,0,0,0",
            ]
        );
    }

    #[test]
    fn empty_export_is_an_error() {
        assert!(matches!(
            export_points(&[]),
            Err(PointsError::NothingToExport)
        ));
    }
}
