//! Loading a prepared census dataset into a projected zone set.

use std::path::Path;

use catchment_geography_models::{Bounds, CensusMetadata, CensusZone, Crs};
use catchment_spatial::{ZoneSet, geometry_to_multipolygon, projection};
use geo::{BoundingRect, MultiPolygon, Rect};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};

use crate::columns::{detect_population_column, summarize_columns};
use crate::{CensusConfig, CensusError};

/// Reference system every loaded zone set is projected into.
pub const ZONE_CRS: Crs = Crs::WEB_MERCATOR;

/// A loaded census dataset: projected zones plus their description.
///
/// Immutable once loaded; share it behind an `Arc`.
#[derive(Debug)]
pub struct CensusDataset {
    zones: ZoneSet,
    metadata: CensusMetadata,
}

impl CensusDataset {
    /// Zones in [`ZONE_CRS`].
    #[must_use]
    pub const fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Description of the data, with the population column that was used.
    #[must_use]
    pub const fn metadata(&self) -> &CensusMetadata {
        &self.metadata
    }

    /// Property the populations were read from.
    #[must_use]
    pub fn population_column(&self) -> Option<&str> {
        self.metadata.pop_column.as_deref()
    }
}

/// Reads `metadata.json` if it exists.
///
/// # Errors
///
/// Returns [`CensusError`] if the file exists but cannot be read or parsed.
pub fn read_metadata(path: &Path) -> Result<Option<CensusMetadata>, CensusError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Loads the dataset described by `config` from disk.
///
/// # Errors
///
/// * [`CensusError::NotFound`] if the data file is missing
/// * [`CensusError`] if the data or metadata cannot be read or parsed
pub fn load_dataset(config: &CensusConfig) -> Result<CensusDataset, CensusError> {
    if !config.data_path.exists() {
        return Err(CensusError::NotFound {
            path: config.data_path.clone(),
        });
    }

    log::info!("Loading census data from {}", config.data_path.display());

    let contents = std::fs::read_to_string(&config.data_path)?;
    let recorded = match read_metadata(&config.metadata_path) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!(
                "Ignoring unreadable metadata at {}: {e}",
                config.metadata_path.display()
            );
            None
        }
    };

    let dataset = parse_dataset(&contents, recorded.as_ref(), config)?;

    log::info!(
        "Census data loaded: {} features, population column {:?}, total population {:.0}",
        dataset.metadata.total_features,
        dataset.population_column(),
        dataset.zones.total_population()
    );

    Ok(dataset)
}

/// Builds a dataset from `GeoJSON` text.
///
/// `recorded` is previously written metadata, used as a hint for the
/// population column.
///
/// # Errors
///
/// Returns [`CensusError`] if the text is not a feature collection or
/// declares an unsupported reference system.
pub fn parse_dataset(
    text: &str,
    recorded: Option<&CensusMetadata>,
    config: &CensusConfig,
) -> Result<CensusDataset, CensusError> {
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => {
            return Err(CensusError::Conversion {
                message: "census data must be a GeoJSON FeatureCollection".to_string(),
            });
        }
    };

    let source_crs = declared_crs(&collection)?;
    if !projection::is_supported(source_crs) {
        return Err(CensusError::UnsupportedCrs { crs: source_crs });
    }

    let summary = summarize_columns(collection.features.iter().map(|f| f.properties.as_ref()));
    let pop_column = detect_population_column(
        &summary,
        config.population_column.as_deref(),
        recorded.and_then(|m| m.pop_column.as_deref()),
    );

    let total_features = collection.features.len();
    let mut bounds: Option<Rect<f64>> = None;
    let mut zones = Vec::with_capacity(total_features);
    let mut skipped = 0usize;

    for (index, feature) in collection.features.into_iter().enumerate() {
        let id = zone_id(&feature, config.id_column.as_deref(), index);
        let population = pop_column
            .as_deref()
            .and_then(|column| read_population(feature.properties.as_ref(), column));

        let Some(geometry) = feature.geometry.and_then(geometry_to_multipolygon) else {
            log::warn!("Census feature {id} has no polygon geometry, skipping");
            skipped += 1;
            continue;
        };

        if let Some(rect) = geometry.bounding_rect() {
            bounds = Some(bounds.map_or(rect, |b| merge_rects(b, rect)));
        }

        let geometry: MultiPolygon<f64> =
            match projection::reproject(&geometry, source_crs, ZONE_CRS) {
                Ok(projected) => projected,
                Err(e) => {
                    log::warn!("Census feature {id} could not be projected, skipping: {e}");
                    skipped += 1;
                    continue;
                }
            };

        zones.push(CensusZone {
            id,
            geometry,
            population,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} of {total_features} census features");
    }

    let mut columns: Vec<String> = summary.into_iter().map(|c| c.name).collect();
    columns.push("geometry".to_string());

    let metadata = CensusMetadata {
        pop_column,
        total_features,
        bounds: bounds.and_then(|rect| wgs84_bounds(rect, source_crs)),
        columns,
        crs: source_crs,
    };

    Ok(CensusDataset {
        zones: ZoneSet::new(ZONE_CRS, zones),
        metadata,
    })
}

/// The reference system named by the collection's legacy `crs` member, or
/// WGS84 when there is none.
fn declared_crs(collection: &FeatureCollection) -> Result<Crs, CensusError> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(serde_json::Value::as_str);

    match name {
        Some(name) => Ok(name.parse()?),
        None => Ok(Crs::WGS84),
    }
}

fn zone_id(feature: &Feature, id_column: Option<&str>, index: usize) -> String {
    if let Some(value) = id_column
        .and_then(|column| feature.properties.as_ref()?.get(column))
        .and_then(property_to_string)
    {
        return value;
    }

    match &feature.id {
        Some(geojson::feature::Id::String(s)) => s.clone(),
        Some(geojson::feature::Id::Number(n)) => n.to_string(),
        None => index.to_string(),
    }
}

fn property_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A finite, non-negative numeric population value, if the feature has
/// one.
fn read_population(properties: Option<&JsonObject>, column: &str) -> Option<f64> {
    properties?
        .get(column)?
        .as_f64()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

fn wgs84_bounds(rect: Rect<f64>, source: Crs) -> Option<Bounds> {
    let rect = match projection::reproject(&rect, source, Crs::WGS84) {
        Ok(rect) => rect,
        Err(e) => {
            log::warn!("Could not express census bounds in WGS84: {e}");
            return None;
        }
    };
    Some(Bounds {
        minx: rect.min().x,
        miny: rect.min().y,
        maxx: rect.max().x,
        maxy: rect.max().y,
    })
}
