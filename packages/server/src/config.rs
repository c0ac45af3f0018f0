//! Application configuration.
//!
//! Settings come from a TOML file (every field has a default) and are
//! then overridden by `BIND_ADDR` and `PORT` from the environment. The
//! routing API key is only ever read from `ORS_API_KEY`.

use std::path::{Path, PathBuf};

use catchment_allocator_models::OverlapStrategy;
use catchment_geography::CensusConfig;
use catchment_isochrone::{FallbackConfig, IsochroneConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file read when no path is given and `CATCHMENT_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "catchment.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", path.display())]
    NotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has wrongly typed fields.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// HTTP listener and static asset settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Directory holding `index.html` and the frontend assets.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 5000,
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Allocator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// How zones contested by several points are split.
    pub strategy: OverlapStrategy,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[server]`
    pub server: ServerConfig,
    /// `[census]`
    pub census: CensusConfig,
    /// `[isochrone]`
    pub isochrone: IsochroneConfig,
    /// `[fallback]`
    pub fallback: FallbackConfig,
    /// `[allocator]`
    pub allocator: AllocatorConfig,
}

impl AppConfig {
    /// Parses a TOML document. Missing tables and fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration and applies environment overrides.
    ///
    /// The file is `path` when given, else `CATCHMENT_CONFIG`, else
    /// [`DEFAULT_CONFIG_PATH`]. Only the implicit default file may be
    /// absent, in which case built-in defaults are used.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::NotFound`] if an explicitly named file is missing
    /// * [`ConfigError::Io`] if the file cannot be read
    /// * [`ConfigError::Toml`] if the file is malformed
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CATCHMENT_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                log::info!("Loading config from {}", path.display());
                Self::from_toml_str(&std::fs::read_to_string(&path)?)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    log::info!("Loading config from {}", path.display());
                    Self::from_toml_str(&std::fs::read_to_string(path)?)?
                } else {
                    log::debug!("No {DEFAULT_CONFIG_PATH} found, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies `BIND_ADDR` and `PORT` as returned by `lookup`. An
    /// unparsable port is ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind_addr) = lookup("BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            self.server.bind_addr = bind_addr;
        }

        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("Ignoring invalid PORT {port:?}: {e}"),
            }
        }
    }
}

/// The routing API key from `ORS_API_KEY`, if set.
#[must_use]
pub fn ors_api_key() -> Option<String> {
    std::env::var("ORS_API_KEY").ok()
}
