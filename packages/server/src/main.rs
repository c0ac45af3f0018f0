#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the catchment API server.
//!
//! Reads `catchment.toml` (or `CATCHMENT_CONFIG`) and a `.env` file when
//! present, then serves until interrupted.

use catchment_server::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = AppConfig::load(None).map_err(std::io::Error::other)?;

    catchment_server::run_server(config).await
}
