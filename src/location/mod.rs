//! Location intelligence for business listings.
//!
//! Provides deep-link parsing, the service-area gazetteer, throttled
//! Nominatim geocoding, and great-circle distance.

pub mod distance;
pub mod gazetteer;
pub mod geocoder;
pub mod reference;
pub mod throttle;
pub mod types;

pub use distance::{distance_km, format_distance, EARTH_RADIUS_KM};
pub use gazetteer::{area_list, AreaInfo, AreaTier, ServiceAreaEntry};
pub use geocoder::{GeocodeBackend, GeocodingClient, NominatimBackend, NominatimPlace};
pub use reference::{navigation_link, parse_reference, ReferenceParser};
pub use throttle::{Clock, ManualClock, RequestThrottle, SystemClock};
pub use types::{
    Confidence, Coordinates, GeocodingResult, LocationError, LocationRecord, LocationType,
    ParsedReference,
};
