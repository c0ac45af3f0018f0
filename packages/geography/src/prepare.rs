//! Converting a source boundary file into the prepared census dataset.
//!
//! `GeoJSON` sources are copied as they are. Anything else (`GeoPackage`,
//! shapefile, `FlatGeobuf`) is converted to WGS84 `GeoJSON` with `ogr2ogr`,
//! which must be on `PATH`. The converted file is then parsed once to write
//! `metadata.json`.

use std::path::Path;
use std::process::Command;

use catchment_geography_models::CensusMetadata;

use crate::load::{parse_dataset, read_metadata};
use crate::{CensusConfig, CensusError};

/// Prepares the census dataset described by `config` from `source`.
///
/// Writes `config.data_path` and `config.metadata_path`, creating parent
/// directories as needed, and returns the written metadata.
///
/// # Errors
///
/// * [`CensusError::NotFound`] if `source` does not exist
/// * [`CensusError::Command`] if `ogr2ogr` is missing or fails
/// * [`CensusError`] if the converted data cannot be parsed or written
pub fn prepare(source: &Path, config: &CensusConfig) -> Result<CensusMetadata, CensusError> {
    if !source.exists() {
        return Err(CensusError::NotFound {
            path: source.to_path_buf(),
        });
    }

    if let Some(parent) = config.data_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if is_geojson(source) {
        if source != config.data_path {
            log::info!(
                "Copying {} to {}",
                source.display(),
                config.data_path.display()
            );
            std::fs::copy(source, &config.data_path)?;
        }
    } else {
        convert_with_ogr2ogr(source, &config.data_path)?;
    }

    let contents = std::fs::read_to_string(&config.data_path)?;
    let recorded = read_metadata(&config.metadata_path).unwrap_or(None);
    let dataset = parse_dataset(&contents, recorded.as_ref(), config)?;
    let metadata = dataset.metadata().clone();

    write_metadata(&config.metadata_path, &metadata)?;

    log::info!("Preparation complete: {} features", metadata.total_features);
    match dataset.population_column() {
        Some(column) => log::info!(
            "Population column {column}, total population {:.0}",
            dataset.zones().total_population()
        ),
        None => log::warn!("No population column found in the census data"),
    }

    Ok(metadata)
}

/// Writes `metadata` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CensusError`] if the file cannot be written.
pub fn write_metadata(path: &Path, metadata: &CensusMetadata) -> Result<(), CensusError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json)?;
    log::info!("Metadata written to {}", path.display());
    Ok(())
}

fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
}

fn convert_with_ogr2ogr(source: &Path, output: &Path) -> Result<(), CensusError> {
    log::info!(
        "Running ogr2ogr to convert {} to WGS84 GeoJSON...",
        source.display()
    );

    // ogr2ogr refuses to overwrite an existing GeoJSON file.
    if output.exists() {
        std::fs::remove_file(output)?;
    }

    let status = Command::new("ogr2ogr")
        .args(["-f", "GeoJSON", "-t_srs", "EPSG:4326"])
        .arg(output)
        .arg(source)
        .status()
        .map_err(|e| CensusError::Command {
            program: "ogr2ogr",
            message: e.to_string(),
        })?;

    if !status.success() {
        return Err(CensusError::Command {
            program: "ogr2ogr",
            message: format!("exited with {status}"),
        });
    }

    log::info!("Converted census data written to {}", output.display());
    Ok(())
}
