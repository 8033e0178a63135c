//! Business listings: storage seam, location enhancement, proximity search.

pub mod business;
pub mod pipeline;
pub mod search;
pub mod store;

pub use business::Business;
pub use pipeline::{
    BatchItem, BatchSummary, EnhancementBatch, ItemOutcome, LocationEnhancementPipeline,
    ServiceAreaStrategy, DEFAULT_SEARCH_RADIUS_KM,
};
pub use search::{search, BusinessWithDistance, SearchQuery, SortOrder};
pub use store::{JsonStore, ListingStore};
