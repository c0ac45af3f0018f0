#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the catchment toolchain.
//!
//! * `prepare` converts a census source file to `GeoJSON` and writes its
//!   metadata.
//! * `serve` starts the HTTP server.
//! * `allocate` runs an offline allocation over a points CSV.

mod batch;

use std::path::PathBuf;

use catchment_allocator::Allocator;
use catchment_allocator_models::OverlapStrategy;
use catchment_geography::load::ZONE_CRS;
use catchment_isochrone::{BandBuilder, OrsClient};
use catchment_server::{AppConfig, config::ors_api_key};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catchment", about = "Walking-band population estimator")]
struct Cli {
    /// Config file (defaults to `CATCHMENT_CONFIG`, then `catchment.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a census source file and write its metadata
    Prepare {
        /// `GeoPackage`, shapefile or `GeoJSON` with census zones
        source: PathBuf,
    },
    /// Start the HTTP server
    Serve,
    /// Allocate population to the points of a CSV file
    Allocate {
        /// CSV with `id,lat,lng` columns
        #[arg(long)]
        points: PathBuf,
        /// Output CSV (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Fetch routed isochrones instead of using circles
        #[arg(long)]
        routing: bool,
        /// Override the configured overlap strategy
        #[arg(long)]
        strategy: Option<OverlapStrategy>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Prepare { source } => {
            let metadata = catchment_geography::prepare(&source, &config.census)?;
            println!(
                "Prepared {} zones (population column: {})",
                metadata.total_features,
                metadata.pop_column.as_deref().unwrap_or("none")
            );
        }
        Commands::Serve => {
            // The server runs on actix-web's own runtime, so it gets a
            // blocking thread rather than nesting inside tokio's.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(catchment_server::run_server(config))
            })
            .await??;
        }
        Commands::Allocate {
            points,
            output,
            routing,
            strategy,
        } => {
            let text = std::fs::read_to_string(&points)?;
            let points = catchment_points::parse_points(&text, 0)?;

            let dataset = catchment_geography::load_dataset(&config.census)?;

            let isochrones = if routing {
                let client = OrsClient::new(
                    config.isochrone.clone(),
                    config.fallback.clone(),
                    ors_api_key(),
                )?;
                batch::fetch_isochrones(&client, &points).await?
            } else {
                Vec::new()
            };

            let bands = BandBuilder::new(config.fallback.clone(), ZONE_CRS);
            let allocator = Allocator::new(strategy.unwrap_or(config.allocator.strategy));

            let allocation =
                batch::allocate_points(&dataset, &bands, &allocator, &points, &isochrones)?;
            let rows = batch::export_rows(&points, &allocation);

            match output {
                Some(path) => {
                    catchment_points::write_points(std::fs::File::create(&path)?, &rows)?;
                    log::info!("Wrote {} points to {}", rows.len(), path.display());
                }
                None => catchment_points::write_points(std::io::stdout().lock(), &rows)?,
            }

            log::info!(
                "Total population: {} (near {}, far {})",
                allocation.total_population,
                allocation.total_population_near,
                allocation.total_population_far
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_accepts_a_strategy_override() {
        let cli = Cli::try_parse_from([
            "catchment",
            "allocate",
            "--points",
            "p.csv",
            "--strategy",
            "voronoi",
        ])
        .unwrap();

        match cli.command {
            Commands::Allocate {
                points,
                output,
                routing,
                strategy,
            } => {
                assert_eq!(points, PathBuf::from("p.csv"));
                assert!(output.is_none());
                assert!(!routing);
                assert_eq!(strategy, Some(OverlapStrategy::Voronoi));
            }
            _ => panic!("expected the allocate command"),
        }
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(
            Cli::try_parse_from([
                "catchment",
                "allocate",
                "--points",
                "p.csv",
                "--strategy",
                "random",
            ])
            .is_err()
        );
    }

    #[test]
    fn global_config_applies_to_subcommands() {
        let cli = Cli::try_parse_from(["catchment", "serve", "--config", "alt.toml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Commands::Serve));
    }
}
