//! Geocoding client: Nominatim lookups behind a request throttle.
//!
//! Every failure mode (network, HTTP status, empty result set, junk payload)
//! collapses into `None` here. Fallback is the caller's business.

use super::reference::ReferenceParser;
use super::throttle::{Clock, RequestThrottle, SystemClock};
use super::types::{Confidence, Coordinates, GeocodingResult, LocationError};
use crate::config::Config;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound of the random delay added before a retry.
const RETRY_JITTER_MS: u64 = 250;

/// Importance above which a match is considered precise.
const HIGH_IMPORTANCE: f64 = 0.6;
/// Importance above which a match is at least street-level good.
const MEDIUM_IMPORTANCE: f64 = 0.3;

/// Point-of-interest and building-level place types.
const PRECISE_TYPES: &[&str] = &[
    "house", "building", "yes", "shop", "restaurant", "cafe", "bakery", "supermarket",
    "office", "clinic", "pharmacy", "school", "attraction", "hotel", "bar", "pub",
    "fast_food", "marketplace", "mall", "place_of_worship", "community_centre",
];

/// OSM classes whose every member is a point of interest, whatever its type.
const PRECISE_CLASSES: &[&str] = &["shop", "amenity", "tourism", "craft", "office", "building"];

/// Street and neighbourhood-level place types.
const STREET_TYPES: &[&str] = &[
    "street", "road", "residential", "primary", "secondary", "tertiary", "unclassified",
    "living_street", "pedestrian", "service", "neighbourhood", "suburb", "quarter",
    "city_block", "postcode",
];

// ─── Wire format ────────────────────────────────────────────────

/// One element of the Nominatim JSON array.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default, rename = "type")]
    pub place_type: Option<String>,
    #[serde(default, rename = "class")]
    pub place_class: Option<String>,
}

impl NominatimPlace {
    fn coordinates(&self) -> Result<Coordinates, LocationError> {
        let lat: f64 = self
            .lat
            .trim()
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad lat '{}'", self.lat)))?;
        let lng: f64 = self
            .lon
            .trim()
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad lon '{}'", self.lon)))?;
        Coordinates::new(lat, lng)
    }
}

/// Classify a match from its importance score, place type and OSM class.
pub fn classify_confidence(
    importance: Option<f64>,
    place_type: Option<&str>,
    place_class: Option<&str>,
) -> Confidence {
    let importance = importance.unwrap_or(0.0);
    let ptype = place_type.unwrap_or("");
    let class = place_class.unwrap_or("");
    if PRECISE_TYPES.contains(&ptype)
        || PRECISE_CLASSES.contains(&class)
        || importance > HIGH_IMPORTANCE
    {
        Confidence::High
    } else if STREET_TYPES.contains(&ptype) || class == "highway" || importance > MEDIUM_IMPORTANCE {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

// ─── Backends ───────────────────────────────────────────────────

/// Issues a single search request upstream.
pub trait GeocodeBackend {
    fn search(&self, query: &str) -> Result<Vec<NominatimPlace>, LocationError>;
}

impl<B: GeocodeBackend + ?Sized> GeocodeBackend for &B {
    fn search(&self, query: &str) -> Result<Vec<NominatimPlace>, LocationError> {
        (**self).search(query)
    }
}

/// OpenStreetMap Nominatim over HTTP.
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    base_url: String,
    country_codes: String,
    language: String,
    user_agent: String,
    timeout: Duration,
}

impl NominatimBackend {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.geocoder_url.clone(),
            country_codes: config.country_codes.clone(),
            language: config.language.clone(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl GeocodeBackend for NominatimBackend {
    fn search(&self, query: &str) -> Result<Vec<NominatimPlace>, LocationError> {
        let mut request = ureq::get(&self.base_url)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .query("q", query)
            .query("format", "json")
            .query("limit", "1");
        if !self.country_codes.is_empty() {
            request = request.query("countrycodes", &self.country_codes);
        }
        if !self.language.is_empty() {
            request = request.query("accept-language", &self.language);
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(status, _) => LocationError::Http { status },
            ureq::Error::Transport(t) => LocationError::Network(t.to_string()),
        })?;

        response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))
    }
}

// ─── Client ─────────────────────────────────────────────────────

/// Serialized, throttled geocoding with confidence classification.
pub struct GeocodingClient<B = NominatimBackend, C: Clock = SystemClock> {
    backend: B,
    throttle: RequestThrottle<C>,
    parser: ReferenceParser,
    country_suffix: Option<String>,
    max_retries: u32,
}

impl GeocodingClient<NominatimBackend, SystemClock> {
    pub fn from_config(config: &Config) -> Self {
        GeocodingClient::new(
            NominatimBackend::from_config(config),
            RequestThrottle::new(Duration::from_millis(config.min_request_interval_ms)),
            ReferenceParser::new(config.link_hosts.clone()),
        )
        .with_country_suffix(&config.country_suffix)
        .with_max_retries(config.max_retries)
    }
}

impl<B: GeocodeBackend, C: Clock> GeocodingClient<B, C> {
    pub fn new(backend: B, throttle: RequestThrottle<C>, parser: ReferenceParser) -> Self {
        Self {
            backend,
            throttle,
            parser,
            country_suffix: None,
            max_retries: 0,
        }
    }

    /// Append a country name to free-text queries to bias results.
    pub fn with_country_suffix(mut self, suffix: &str) -> Self {
        let suffix = suffix.trim();
        self.country_suffix = if suffix.is_empty() { None } else { Some(suffix.to_string()) };
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn parser(&self) -> &ReferenceParser {
        &self.parser
    }

    /// Geocode a free-text address.
    pub fn geocode_address(&mut self, address: &str) -> Option<GeocodingResult> {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }
        let query = self.biased_query(address);

        let mut attempt = 0u32;
        loop {
            self.throttle.acquire();
            match self.backend.search(&query) {
                Ok(places) => return self.first_result(&query, places),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let jitter = Duration::from_millis(rand::rng().random_range(0..=RETRY_JITTER_MS));
                    log::warn!(
                        "Geocoding '{}' failed ({}), retry {}/{} after {} ms jitter",
                        query, e, attempt, self.max_retries, jitter.as_millis(),
                    );
                    self.throttle.sleep_extra(jitter);
                }
                Err(e) => {
                    log::warn!("Geocoding '{}' failed: {}", query, e);
                    return None;
                }
            }
        }
    }

    /// Resolve a deep link: explicit coordinates short-circuit the network,
    /// otherwise the recovered address (or place name) is geocoded.
    pub fn geocode_reference(&mut self, link: &str) -> Option<GeocodingResult> {
        let parsed = self.parser.parse(link)?;

        if let Some(coordinates) = parsed.coordinates() {
            let address = parsed
                .query()
                .map(str::to_string)
                .unwrap_or_else(|| coordinates.to_string());
            log::debug!("Reference carries explicit coordinates {}", coordinates);
            return Some(GeocodingResult {
                coordinates,
                address,
                confidence: Confidence::High,
            });
        }

        let query = parsed.query()?.to_string();
        self.geocode_address(&query)
    }

    /// Sleep one full request interval.
    pub fn pause(&self) {
        self.throttle.pause();
    }

    fn biased_query(&self, address: &str) -> String {
        match &self.country_suffix {
            Some(suffix) if !address.to_lowercase().contains(&suffix.to_lowercase()) => {
                format!("{}, {}", address, suffix)
            }
            _ => address.to_string(),
        }
    }

    fn first_result(&self, query: &str, places: Vec<NominatimPlace>) -> Option<GeocodingResult> {
        let Some(place) = places.into_iter().next() else {
            log::warn!("Geocoding '{}' returned no results", query);
            return None;
        };
        match place.coordinates() {
            Ok(coordinates) => Some(GeocodingResult {
                coordinates,
                confidence: classify_confidence(
                    place.importance,
                    place.place_type.as_deref(),
                    place.place_class.as_deref(),
                ),
                address: place.display_name,
            }),
            Err(e) => {
                log::warn!("Geocoding '{}' returned unusable result: {}", query, e);
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{place, FakeBackend};
    use super::*;
    use crate::location::throttle::{ManualClock, MIN_REQUEST_INTERVAL};

    fn client<'a>(
        backend: &'a FakeBackend,
        clock: &'a ManualClock,
    ) -> GeocodingClient<&'a FakeBackend, &'a ManualClock> {
        GeocodingClient::new(
            backend,
            RequestThrottle::with_clock(clock, MIN_REQUEST_INTERVAL),
            ReferenceParser::default(),
        )
    }

    #[test]
    fn test_classify_confidence() {
        assert_eq!(classify_confidence(Some(0.1), Some("restaurant"), None), Confidence::High);
        assert_eq!(classify_confidence(Some(0.7), Some("administrative"), None), Confidence::High);
        assert_eq!(classify_confidence(Some(0.1), Some("residential"), None), Confidence::Medium);
        assert_eq!(classify_confidence(Some(0.4), Some("administrative"), None), Confidence::Medium);
        assert_eq!(classify_confidence(Some(0.2), Some("administrative"), None), Confidence::Low);
        assert_eq!(classify_confidence(None, None, None), Confidence::Low);
    }

    #[test]
    fn test_place_class_lifts_confidence() {
        // Types unknown to the classifier; only the class tells them apart.
        assert_eq!(classify_confidence(Some(0.1), Some("dentist"), Some("amenity")), Confidence::High);
        assert_eq!(classify_confidence(Some(0.1), Some("florist"), Some("shop")), Confidence::High);
        assert_eq!(classify_confidence(Some(0.1), Some("bus_stop"), Some("highway")), Confidence::Medium);
        assert_eq!(classify_confidence(Some(0.1), Some("dentist"), None), Confidence::Low);
        assert_eq!(classify_confidence(Some(0.1), Some("village"), Some("place")), Confidence::Low);
    }

    #[test]
    fn test_geocode_uses_place_class() {
        let backend = FakeBackend::default();
        let mut dentist = place("32.0700", "34.7800", "Smile Clinic, Tel Aviv", 0.05, "dentist");
        dentist.place_class = Some("amenity".into());
        backend.push(Ok(vec![dentist]));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);

        let result = client.geocode_address("Smile Clinic").unwrap();
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_geocode_address_success() {
        let backend = FakeBackend::default();
        backend.push(Ok(vec![place("32.0775", "34.7748", "Dizengoff Center, Tel Aviv", 0.45, "mall")]));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);

        let result = client.geocode_address("Dizengoff Center").unwrap();
        assert_eq!(result.coordinates, Coordinates { lat: 32.0775, lng: 34.7748 });
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.address, "Dizengoff Center, Tel Aviv");
    }

    #[test]
    fn test_country_suffix_bias() {
        let backend = FakeBackend::default();
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock).with_country_suffix("Israel");
        client.geocode_address("Herzl 1 Haifa");
        client.geocode_address("Herzl 1 Haifa, Israel");
        let queries = backend.queries.borrow();
        assert_eq!(queries[0], "Herzl 1 Haifa, Israel");
        assert_eq!(queries[1], "Herzl 1 Haifa, Israel");
    }

    #[test]
    fn test_empty_result_is_none() {
        let backend = FakeBackend::default();
        backend.push(Ok(vec![]));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);
        assert!(client.geocode_address("nowhere").is_none());
    }

    #[test]
    fn test_failures_are_none_without_retry() {
        let backend = FakeBackend::default();
        backend.push(Err(LocationError::Network("connection reset".into())));
        backend.push(Err(LocationError::Http { status: 500 }));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);
        assert!(client.geocode_address("a").is_none());
        assert!(client.geocode_address("b").is_none());
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn test_unparsable_coordinates_is_none() {
        let backend = FakeBackend::default();
        backend.push(Ok(vec![place("abc", "34.7", "Broken", 0.9, "city")]));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);
        assert!(client.geocode_address("broken").is_none());
    }

    #[test]
    fn test_retry_transient_failure() {
        let backend = FakeBackend::default();
        backend.push(Err(LocationError::Http { status: 503 }));
        backend.push(Ok(vec![place("31.7683", "35.2137", "Jerusalem", 0.8, "city")]));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock).with_max_retries(2);

        let result = client.geocode_address("Jerusalem").unwrap();
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(backend.calls(), 2);
        // Retry still waits out the full interval.
        assert!(clock.total_slept() >= MIN_REQUEST_INTERVAL);
    }

    #[test]
    fn test_no_retry_on_client_error() {
        let backend = FakeBackend::default();
        backend.push(Err(LocationError::Http { status: 400 }));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock).with_max_retries(3);
        assert!(client.geocode_address("x").is_none());
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn test_consecutive_calls_throttled() {
        let backend = FakeBackend::default();
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);
        client.geocode_address("one");
        client.geocode_address("two");
        client.geocode_address("three");
        assert_eq!(clock.total_slept(), MIN_REQUEST_INTERVAL * 2);
    }

    #[test]
    fn test_reference_with_coordinates_skips_network() {
        let backend = FakeBackend::default();
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);

        let result = client
            .geocode_reference("https://waze.com/ul?ll=32.0853,34.7818&q=Rothschild%2010")
            .unwrap();
        assert_eq!(result.coordinates, Coordinates { lat: 32.0853, lng: 34.7818 });
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.address, "Rothschild 10");
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_reference_address_geocoded() {
        let backend = FakeBackend::default();
        backend.push(Ok(vec![place("32.08", "34.78", "Tel Aviv Center", 0.2, "neighbourhood")]));
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);

        let result = client
            .geocode_reference("https://www.waze.com/live-map/directions/to/tel-aviv-center")
            .unwrap();
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(backend.queries.borrow()[0], "tel aviv center");
    }

    #[test]
    fn test_reference_foreign_host() {
        let backend = FakeBackend::default();
        let clock = ManualClock::default();
        let mut client = client(&backend, &clock);
        assert!(client.geocode_reference("https://example.com/ul?ll=1,2").is_none());
        assert_eq!(backend.calls(), 0);
    }
}
