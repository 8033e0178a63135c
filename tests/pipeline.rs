//! End-to-end: listing file → batch enhancement → reload → proximity search.
//!
//! The geocoder runs against a scripted backend and a manual clock, so no
//! network traffic is made and no test really sleeps.

use serde_json::json;
use std::cell::RefCell;
use tempfile::TempDir;

use listing_locator::listing::{
    search, BatchSummary, JsonStore, ListingStore, LocationEnhancementPipeline, SearchQuery,
};
use listing_locator::location::throttle::MIN_REQUEST_INTERVAL;
use listing_locator::location::{
    Confidence, Coordinates, GeocodeBackend, GeocodingClient, LocationError, LocationType,
    ManualClock, NominatimPlace, ReferenceParser, RequestThrottle,
};
use listing_locator::map::{DeviceKind, MapEffect, MapEvent, MapInteractionController};

const TEL_AVIV: Coordinates = Coordinates { lat: 32.0853, lng: 34.7818 };

/// Answers Dizengoff Center queries, misses everything else.
#[derive(Default)]
struct ScriptedBackend {
    queries: RefCell<Vec<String>>,
}

impl GeocodeBackend for ScriptedBackend {
    fn search(&self, query: &str) -> Result<Vec<NominatimPlace>, LocationError> {
        self.queries.borrow_mut().push(query.to_string());
        if !query.to_lowercase().contains("dizengoff") {
            return Ok(vec![]);
        }
        Ok(vec![NominatimPlace {
            lat: "32.0775".into(),
            lon: "34.7748".into(),
            display_name: "Dizengoff Center, Tel Aviv-Yafo, Israel".into(),
            importance: Some(0.41),
            place_type: Some("mall".into()),
            place_class: Some("shop".into()),
        }])
    }
}

fn write_listings(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("businesses.json");
    let listings = json!([
        {
            "id": "b1", "name": "Rothschild Roasters", "createdAt": "2024-01-10T09:00:00Z",
            "category": "Food", "tags": ["coffee", "kosher"],
            "locationLink": "https://waze.com/ul?ll=32.0636,34.7745&navigate=yes"
        },
        {
            "id": "b2", "name": "Center Bookshop", "createdAt": "2024-02-10T09:00:00Z",
            "category": "Retail", "tags": ["books"],
            "locationLink": "https://www.waze.com/live-map/directions/to/dizengoff-center"
        },
        {
            "id": "b3", "name": "Carmel Plumbing", "createdAt": "2024-03-10T09:00:00Z",
            "category": "Services", "serviceAreas": ["Haifa", "Galilee"]
        },
        {
            "id": "b4", "name": "Atlantis Tours", "createdAt": "2024-04-10T09:00:00Z",
            "serviceAreas": ["Atlantis"]
        },
        { "id": "b5", "name": "No Address Crafts", "createdAt": "2024-05-10T09:00:00Z" }
    ]);
    std::fs::write(&path, serde_json::to_string_pretty(&listings).unwrap()).unwrap();
    path
}

fn pipeline<'a>(
    backend: &'a ScriptedBackend,
    clock: &'a ManualClock,
) -> LocationEnhancementPipeline<&'a ScriptedBackend, &'a ManualClock> {
    LocationEnhancementPipeline::new(
        GeocodingClient::new(
            backend,
            RequestThrottle::with_clock(clock, MIN_REQUEST_INTERVAL),
            ReferenceParser::default(),
        )
        .with_country_suffix("Israel"),
    )
}

#[test]
fn batch_enhances_persists_and_feeds_search() {
    let dir = TempDir::new().unwrap();
    let path = write_listings(&dir);
    let backend = ScriptedBackend::default();
    let clock = ManualClock::default();

    let mut store = JsonStore::load_from(&path).unwrap();
    let summary = pipeline(&backend, &clock).enhance_all(&mut store);

    assert_eq!(summary, BatchSummary { success: 3, failed: 0, skipped: 2 });
    assert_eq!(summary.total(), 5);
    // One geocoder call; the explicit coordinates and the gazetteer stay offline.
    assert_eq!(*backend.queries.borrow(), vec!["dizengoff center, Israel".to_string()]);
    // Paced between every pair of items.
    assert_eq!(clock.total_slept(), MIN_REQUEST_INTERVAL * 4);

    let reloaded = JsonStore::load_from(&path).unwrap();
    let b1 = reloaded.get("b1").unwrap().location.unwrap();
    assert_eq!(b1.location_type, LocationType::Specific);
    assert_eq!(b1.confidence, Some(Confidence::High));
    let b2 = reloaded.get("b2").unwrap().location.unwrap();
    assert_eq!(b2.coordinates, Some(Coordinates { lat: 32.0775, lng: 34.7748 }));
    let b3 = reloaded.get("b3").unwrap().location.unwrap();
    assert_eq!(b3.location_type, LocationType::ServiceAreas);
    assert_eq!(b3.search_radius_km, Some(12.0));
    assert!(reloaded.get("b4").unwrap().location.is_none());
    assert!(reloaded.get("b5").unwrap().location.is_none());

    let query = SearchQuery {
        center: Some(TEL_AVIV),
        radius_km: Some(5.0),
        ..Default::default()
    };
    let results = search(&reloaded.all(), &query);
    let ids: Vec<&str> = results.iter().map(|r| r.business.id.as_str()).collect();
    assert_eq!(ids, vec!["b2", "b1"]);
    approx::assert_abs_diff_eq!(results[0].distance_km.unwrap(), 1.09, epsilon = 0.1);

    let kosher = SearchQuery {
        tags: vec!["kosher".into()],
        ..query
    };
    let results = search(&reloaded.all(), &kosher);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].business.id, "b1");
}

#[test]
fn rerunning_the_batch_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_listings(&dir);
    let backend = ScriptedBackend::default();
    let clock = ManualClock::default();

    let mut store = JsonStore::load_from(&path).unwrap();
    pipeline(&backend, &clock).enhance_all(&mut store);
    let first = JsonStore::load_from(&path).unwrap().all();

    let mut store = JsonStore::load_from(&path).unwrap();
    let summary = pipeline(&backend, &clock).enhance_all(&mut store);
    let second = JsonStore::load_from(&path).unwrap().all();

    assert_eq!(summary.success, 3);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.id, b.id);
        match (&a.location, &b.location) {
            (Some(x), Some(y)) => assert!(x.same_location(y), "{} moved", a.id),
            (None, None) => {}
            _ => panic!("{} changed resolution state", a.id),
        }
    }
}

#[test]
fn touch_map_over_search_results() {
    let dir = TempDir::new().unwrap();
    let path = write_listings(&dir);
    let backend = ScriptedBackend::default();
    let clock = ManualClock::default();
    let mut store = JsonStore::load_from(&path).unwrap();
    pipeline(&backend, &clock).enhance_all(&mut store);

    let results = search(
        &store.all(),
        &SearchQuery {
            center: Some(TEL_AVIV),
            radius_km: Some(5.0),
            ..Default::default()
        },
    );
    let ids: Vec<String> = results.into_iter().map(|r| r.business.id).collect();

    let mut map = MapInteractionController::new(DeviceKind::Touch);
    assert_eq!(
        map.handle(MapEvent::Tap { id: ids[0].clone() }),
        vec![MapEffect::OpenOverlay { id: ids[0].clone() }]
    );
    map.handle(MapEvent::Tap { id: ids[1].clone() });
    assert_eq!(map.open_marker(), Some(&ids[1]));
    let effects = map.handle(MapEvent::Tap { id: ids[1].clone() });
    assert_eq!(effects.last(), Some(&MapEffect::Navigate { id: ids[1].clone() }));
    assert!(map.open_marker().is_none());
}
