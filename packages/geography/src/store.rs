//! Lazily loaded, shared census dataset.

use std::sync::{Arc, PoisonError, RwLock};

use crate::load::{CensusDataset, load_dataset};
use crate::{CensusConfig, CensusError};

/// Holds the current census dataset for a long-running process.
///
/// The dataset is loaded on first use and can be replaced with
/// [`Self::reload`]. Readers get an `Arc` snapshot, so a reload never
/// disturbs a computation already in progress.
#[derive(Debug)]
pub struct CensusStore {
    config: CensusConfig,
    current: RwLock<Option<Arc<CensusDataset>>>,
}

impl CensusStore {
    /// A store that will load from `config` on first use.
    #[must_use]
    pub const fn new(config: CensusConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
        }
    }

    /// A store pre-populated with `dataset`.
    #[must_use]
    pub fn with_dataset(config: CensusConfig, dataset: CensusDataset) -> Self {
        Self {
            config,
            current: RwLock::new(Some(Arc::new(dataset))),
        }
    }

    /// Where the dataset is loaded from.
    #[must_use]
    pub const fn config(&self) -> &CensusConfig {
        &self.config
    }

    /// The loaded dataset, if any, without triggering a load.
    #[must_use]
    pub fn current(&self) -> Option<Arc<CensusDataset>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The loaded dataset, loading it first if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError`] if the dataset is not loaded and cannot be
    /// loaded now.
    pub fn get_or_load(&self) -> Result<Arc<CensusDataset>, CensusError> {
        if let Some(dataset) = self.current() {
            return Ok(dataset);
        }

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(dataset) = guard.as_ref() {
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(load_dataset(&self.config)?);
        *guard = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Loads the dataset from disk again and makes it current.
    ///
    /// On failure the previous dataset stays in place.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError`] if the dataset cannot be loaded.
    pub fn reload(&self) -> Result<Arc<CensusDataset>, CensusError> {
        let dataset = Arc::new(load_dataset(&self.config)?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&dataset));
        log::info!("Census data reloaded");
        Ok(dataset)
    }
}
