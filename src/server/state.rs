use crate::config::Config;
use crate::listing::{Business, JsonStore, ListingStore, LocationEnhancementPipeline};
use crate::location::{GeocodingClient, LocationError, LocationRecord, ReferenceParser};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct AppState {
    pub config: Config,
    /// Link parsing is pure; it never waits on the pipeline.
    pub parser: ReferenceParser,
    /// One pipeline per process so every request shares the geocoder throttle.
    pub pipeline: Mutex<LocationEnhancementPipeline>,
    pub store: Mutex<JsonStore>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, LocationError> {
        let store = JsonStore::load_from(&config.store_path)?;
        Ok(Self::new(config, store))
    }

    pub fn new(config: Config, store: JsonStore) -> Self {
        let pipeline = LocationEnhancementPipeline::new(GeocodingClient::from_config(&config))
            .with_default_radius(config.default_search_radius_km);
        Self {
            parser: ReferenceParser::new(config.link_hosts.clone()),
            config,
            pipeline: Mutex::new(pipeline),
            store: Mutex::new(store),
        }
    }

    pub fn store(&self) -> MutexGuard<'_, JsonStore> {
        lock(&self.store)
    }

    /// Store handle for pipeline runs; see `SharedStore`.
    pub fn shared_store(&self) -> SharedStore<'_> {
        SharedStore(&self.store)
    }

    pub fn pipeline(&self) -> MutexGuard<'_, LocationEnhancementPipeline> {
        lock(&self.pipeline)
    }
}

/// Locks the store per operation, never across a geocoder call or a batch pause.
pub struct SharedStore<'a>(&'a Mutex<JsonStore>);

impl ListingStore for SharedStore<'_> {
    fn all(&self) -> Vec<Business> {
        lock(self.0).all()
    }

    fn get(&self, id: &str) -> Option<Business> {
        lock(self.0).get(id)
    }

    fn set_location(&mut self, id: &str, record: LocationRecord) -> Result<(), LocationError> {
        lock(self.0).set_location(id, record)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
