//! Core types for the location subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the globe in decimal degrees.
///
/// Deserialization goes through [`Coordinates::new`], so out-of-range pairs
/// are rejected when a store or request body is read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = LocationError;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.lat, raw.lng)
    }
}

impl Coordinates {
    /// Build a coordinate pair, rejecting values outside the valid ranges.
    pub fn new(lat: f64, lng: f64) -> Result<Self, LocationError> {
        if lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
        {
            Ok(Self { lat, lng })
        } else {
            Err(LocationError::InvalidCoordinates { lat, lng })
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Fields recovered from a deep-link reference. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReference {
    pub address: Option<String>,
    pub place: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl ParsedReference {
    /// The explicit coordinate pair, when both halves are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
            _ => None,
        }
    }

    /// The best human-readable query: decoded address first, then place name.
    pub fn query(&self) -> Option<&str> {
        self.address.as_deref().or(self.place.as_deref())
    }
}

/// How precisely a resolved coordinate represents the intended location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Which resolution tier produced a location record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Specific,
    ServiceAreas,
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific => write!(f, "specific"),
            Self::ServiceAreas => write!(f, "service_areas"),
        }
    }
}

/// The enhancement output attached to a business.
///
/// Serialized in the persisted shape: `searchRadius`, `locationType`,
/// `locationConfidence`, and an ISO-8601 `lastUpdated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, rename = "searchRadius", skip_serializing_if = "Option::is_none")]
    pub search_radius_km: Option<f64>,
    pub location_type: LocationType,
    #[serde(default, rename = "locationConfidence", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(rename = "lastUpdated")]
    pub last_updated_at: DateTime<Utc>,
}

impl LocationRecord {
    /// Equality ignoring the timestamp; two runs over unchanged input must agree.
    pub fn same_location(&self, other: &LocationRecord) -> bool {
        self.coordinates == other.coordinates
            && self.search_radius_km == other.search_radius_km
            && self.location_type == other.location_type
            && self.confidence == other.confidence
    }
}

/// A geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodingResult {
    pub coordinates: Coordinates,
    pub address: String,
    pub confidence: Confidence,
}

/// Location subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Geocoder responded with HTTP {status}")]
    Http { status: u16 },
    #[error("Invalid geocoder response: {0}")]
    InvalidResponse(String),
    #[error("Location not found: '{0}'")]
    NotFound(String),
    #[error("Invalid coordinates {lat}, {lng}. Lat: -90..90, Lng: -180..180")]
    InvalidCoordinates { lat: f64, lng: f64 },
    #[error("Business store error: {0}")]
    Store(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LocationError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_range() {
        assert!(Coordinates::new(32.0853, 34.7818).is_ok());
        assert!(Coordinates::new(90.0, -180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, 180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinates_deserialize_validated() {
        let ok: Coordinates = serde_json::from_str(r#"{"lat": 31.25, "lng": 34.79}"#).unwrap();
        assert_eq!(ok, Coordinates { lat: 31.25, lng: 34.79 });

        let err = serde_json::from_str::<Coordinates>(r#"{"lat": 200.0, "lng": 34.79}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid coordinates"));
        assert!(serde_json::from_str::<Coordinates>(r#"{"lat": 31.25, "lng": -181}"#).is_err());
    }

    #[test]
    fn test_parsed_reference_query_prefers_address() {
        let parsed = ParsedReference {
            address: Some("tel aviv center".into()),
            place: Some("Dizengoff".into()),
            ..Default::default()
        };
        assert_eq!(parsed.query(), Some("tel aviv center"));
        assert!(parsed.coordinates().is_none());
    }

    #[test]
    fn test_record_persisted_shape() {
        let record = LocationRecord {
            coordinates: Some(Coordinates { lat: 32.0853, lng: 34.7818 }),
            search_radius_km: Some(5.0),
            location_type: LocationType::Specific,
            confidence: Some(Confidence::High),
            last_updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["locationType"], "specific");
        assert_eq!(json["locationConfidence"], "high");
        assert_eq!(json["searchRadius"], 5.0);
        assert!(json["lastUpdated"].is_string());
    }

    #[test]
    fn test_record_absent_fields_omitted() {
        let record = LocationRecord {
            coordinates: None,
            search_radius_km: None,
            location_type: LocationType::ServiceAreas,
            confidence: None,
            last_updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("coordinates").is_none());
        assert!(json.get("locationConfidence").is_none());
        assert_eq!(json["locationType"], "service_areas");
    }

    #[test]
    fn test_transient_errors() {
        assert!(LocationError::Network("reset".into()).is_transient());
        assert!(LocationError::Http { status: 429 }.is_transient());
        assert!(LocationError::Http { status: 503 }.is_transient());
        assert!(!LocationError::Http { status: 404 }.is_transient());
        assert!(!LocationError::NotFound("x".into()).is_transient());
    }
}
