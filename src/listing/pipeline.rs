//! Location enhancement: orchestrates the resolution tiers.
//!
//! Tier order: specific deep link → named service area → unresolved.
//! The first tier that yields a location wins; a miss in one tier falls
//! through to the next.

use super::business::Business;
use super::store::ListingStore;
use crate::location::gazetteer::{self, ServiceAreaEntry};
use crate::location::throttle::{Clock, SystemClock};
use crate::location::{
    Confidence, GeocodeBackend, GeocodingClient, LocationError, LocationRecord, LocationType,
    NominatimBackend,
};
use chrono::Utc;
use serde::Serialize;

/// Radius attached to records resolved from a specific link.
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 5.0;

/// How a business listing several service areas is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceAreaStrategy {
    /// Use only the first listed area; an unknown first area leaves the
    /// business unresolved.
    #[default]
    FirstListed,
    /// Cover every recognised area with one circle around their centroid.
    Merged,
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    /// Number of items attempted.
    pub fn total(&self) -> usize {
        self.success + self.failed + self.skipped
    }
}

/// What happened to one business in a batch.
#[derive(Debug)]
pub enum ItemOutcome {
    Enhanced(LocationRecord),
    /// Nothing usable to resolve from; the business stays off the map.
    Unresolved,
    Failed(LocationError),
}

#[derive(Debug)]
pub struct BatchItem {
    pub id: String,
    pub outcome: ItemOutcome,
}

/// The location enhancement pipeline.
pub struct LocationEnhancementPipeline<B = NominatimBackend, C: Clock = SystemClock> {
    geocoder: GeocodingClient<B, C>,
    default_radius_km: f64,
    area_strategy: ServiceAreaStrategy,
}

impl<B: GeocodeBackend, C: Clock> LocationEnhancementPipeline<B, C> {
    pub fn new(geocoder: GeocodingClient<B, C>) -> Self {
        Self {
            geocoder,
            default_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            area_strategy: ServiceAreaStrategy::default(),
        }
    }

    pub fn with_default_radius(mut self, radius_km: f64) -> Self {
        self.default_radius_km = radius_km;
        self
    }

    pub fn with_area_strategy(mut self, strategy: ServiceAreaStrategy) -> Self {
        self.area_strategy = strategy;
        self
    }

    /// Resolve one business to a location record, or `None` if every tier misses.
    pub fn enhance(&mut self, business: &Business) -> Option<LocationRecord> {
        if let Some(link) = business.location_link.as_deref().filter(|l| !l.trim().is_empty()) {
            match self.geocoder.geocode_reference(link) {
                Some(result) => {
                    return Some(LocationRecord {
                        coordinates: Some(result.coordinates),
                        search_radius_km: Some(self.default_radius_km),
                        location_type: LocationType::Specific,
                        confidence: Some(result.confidence),
                        last_updated_at: Utc::now(),
                    });
                }
                None => log::warn!(
                    "Could not resolve location link of '{}' ({}), trying service areas",
                    business.name, business.id,
                ),
            }
        }

        if !business.service_areas.is_empty() {
            return self.resolve_areas(business);
        }
        None
    }

    fn resolve_areas(&self, business: &Business) -> Option<LocationRecord> {
        let (center, radius_km) = match self.area_strategy {
            ServiceAreaStrategy::FirstListed => {
                let first = &business.service_areas[0];
                let Some(area) = gazetteer::lookup(first) else {
                    log::debug!("Unknown service area '{}' for '{}'", first, business.id);
                    return None;
                };
                (area.center, area.radius_km)
            }
            ServiceAreaStrategy::Merged => {
                let known: Vec<&ServiceAreaEntry> = business
                    .service_areas
                    .iter()
                    .filter_map(|name| gazetteer::lookup(name))
                    .collect();
                gazetteer::covering_circle(&known)?
            }
        };

        Some(LocationRecord {
            coordinates: Some(center),
            search_radius_km: Some(radius_km),
            location_type: LocationType::ServiceAreas,
            confidence: Some(Confidence::Medium),
            last_updated_at: Utc::now(),
        })
    }

    /// Resolve a stored business and write the record back.
    ///
    /// `Ok(None)` means unresolved; nothing is written. `Err` is reserved for
    /// store failures and unknown ids.
    pub fn enhance_stored<S: ListingStore>(
        &mut self,
        store: &mut S,
        id: &str,
    ) -> Result<Option<LocationRecord>, LocationError> {
        let business = store
            .get(id)
            .ok_or_else(|| LocationError::Store(format!("no listing with id '{}'", id)))?;

        match self.enhance(&business) {
            Some(record) => {
                store.set_location(id, record.clone())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// A resumable cursor over every listing in the store.
    pub fn batch<'a, S: ListingStore>(&'a mut self, store: &'a mut S) -> EnhancementBatch<'a, B, C, S> {
        let ids = store.all().into_iter().map(|b| b.id).collect();
        EnhancementBatch {
            pipeline: self,
            store,
            ids,
            position: 0,
            started: false,
            summary: BatchSummary::default(),
        }
    }

    /// Enhance every listing, pacing between items, and report counts.
    pub fn enhance_all<S: ListingStore>(&mut self, store: &mut S) -> BatchSummary {
        let mut batch = self.batch(store);
        batch.by_ref().for_each(drop);
        let summary = batch.summary();
        log::info!(
            "Enhancement finished: {} enhanced, {} failed, {} unresolved ({} total)",
            summary.success, summary.failed, summary.skipped, summary.total(),
        );
        summary
    }
}

/// Batch cursor. Each `next()` processes one listing; pacing sleeps happen
/// between items only. Dropping the cursor stops the batch, and records
/// already written stay written.
pub struct EnhancementBatch<'a, B, C: Clock, S> {
    pipeline: &'a mut LocationEnhancementPipeline<B, C>,
    store: &'a mut S,
    ids: Vec<String>,
    position: usize,
    started: bool,
    summary: BatchSummary,
}

impl<B: GeocodeBackend, C: Clock, S: ListingStore> EnhancementBatch<'_, B, C, S> {
    /// Skip every listing up to and including `id`.
    pub fn resume_after(mut self, id: &str) -> Self {
        match self.ids.iter().position(|i| i == id) {
            Some(pos) => self.position = pos + 1,
            None => log::warn!("Resume point '{}' not found, starting from the beginning", id),
        }
        self
    }

    /// Counts so far.
    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    /// Id of the next listing to process, for resuming a stopped batch.
    pub fn next_id(&self) -> Option<&str> {
        self.ids.get(self.position).map(String::as_str)
    }

    pub fn remaining(&self) -> usize {
        self.ids.len().saturating_sub(self.position)
    }
}

impl<B: GeocodeBackend, C: Clock, S: ListingStore> Iterator for EnhancementBatch<'_, B, C, S> {
    type Item = BatchItem;

    fn next(&mut self) -> Option<BatchItem> {
        let id = self.ids.get(self.position)?.clone();
        if self.started {
            self.pipeline.geocoder.pause();
        }
        self.started = true;
        self.position += 1;

        let index = self.position;
        let total = self.ids.len();
        let outcome = match self.pipeline.enhance_stored(&mut *self.store, &id) {
            Ok(Some(record)) => {
                self.summary.success += 1;
                log::info!(
                    "[{}/{}] {} → {} ({})",
                    index, total, id, record.location_type,
                    record.confidence.map(|c| c.to_string()).unwrap_or_default(),
                );
                ItemOutcome::Enhanced(record)
            }
            Ok(None) => {
                self.summary.skipped += 1;
                log::info!("[{}/{}] {} → unresolved", index, total, id);
                ItemOutcome::Unresolved
            }
            Err(e) => {
                self.summary.failed += 1;
                log::warn!("[{}/{}] {} failed: {}", index, total, id, e);
                ItemOutcome::Failed(e)
            }
        };

        Some(BatchItem { id, outcome })
    }
}
