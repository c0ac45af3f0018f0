#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the catchment population estimator.
//!
//! Serves the REST API used by the map frontend (isochrones, population
//! allocation, CSV import/export) and the frontend's static files. The
//! census dataset is loaded lazily on first use and can be reloaded
//! without restarting; allocation runs on the blocking thread pool.

pub mod config;
mod handlers;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use catchment_allocator::Allocator;
use catchment_geography::{CensusStore, load::ZONE_CRS};
use catchment_isochrone::{BandBuilder, OrsClient};
use catchment_server_models::ApiError;

pub use config::{AppConfig, ConfigError};

/// Largest accepted JSON body. Requests carry isochrone polygons for
/// every point, which can add up.
const JSON_LIMIT: usize = 32 * 1024 * 1024;

/// Largest accepted CSV upload.
const CSV_LIMIT: usize = 8 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// Census dataset handle.
    pub census: CensusStore,
    /// Isochrone client with circular fallback.
    pub isochrones: OrsClient,
    /// Builds demand points in the census zones' reference system.
    pub bands: BandBuilder,
    /// Population allocator.
    pub allocator: Allocator,
}

impl AppState {
    /// Builds the state from configuration. The census dataset is not
    /// loaded until first requested.
    ///
    /// # Errors
    ///
    /// Returns [`catchment_isochrone::IsochroneError`] if the HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &AppConfig,
        ors_api_key: Option<String>,
    ) -> Result<Self, catchment_isochrone::IsochroneError> {
        Ok(Self {
            census: CensusStore::new(config.census.clone()),
            isochrones: OrsClient::new(
                config.isochrone.clone(),
                config.fallback.clone(),
                ors_api_key,
            )?,
            bands: BandBuilder::new(config.fallback.clone(), ZONE_CRS),
            allocator: Allocator::new(config.allocator.strategy),
        })
    }
}

/// Registers the `/api` routes and the JSON and payload limits.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| {
                let response = HttpResponse::BadRequest().json(ApiError::new(err.to_string()));
                error::InternalError::from_response(err, response).into()
            }),
    )
    .app_data(web::PayloadConfig::default().limit(CSV_LIMIT))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/census-metadata", web::get().to(handlers::census_metadata))
            .route("/census/reload", web::post().to(handlers::reload_census))
            .route("/isochrones", web::post().to(handlers::isochrones))
            .route(
                "/population-in-isochrones",
                web::post().to(handlers::population_in_isochrones),
            )
            .route("/export-points", web::post().to(handlers::export_points))
            .route("/import-points", web::post().to(handlers::import_points)),
    );
}

/// Starts the catchment API server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`) and initialises logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP client cannot be built,
/// the server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config, config::ors_api_key()).map_err(|e| {
        std::io::Error::other(format!("Failed to build isochrone client: {e}"))
    })?;
    let state = web::Data::new(state);

    let static_dir = config.server.static_dir.clone();
    if !static_dir.join("index.html").exists() {
        log::warn!(
            "No index.html in {}; only the API will be served",
            static_dir.display()
        );
    }

    log::info!(
        "Census data: {} (loaded on first request)",
        config.census.data_path.display()
    );
    log::info!("Overlap strategy: {}", config.allocator.strategy);

    let bind_addr = config.server.bind_addr.clone();
    let port = config.server.port;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            // Frontend assets
            .service(Files::new("/static", &static_dir))
            .service(Files::new("/", &static_dir).index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
