//! The business record as seen by the location core.

use crate::location::{Coordinates, LocationRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A community business listing. Owner-editable fields are read-only here;
/// only `location` is written by the enhancement pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Deep link to a specific map location.
    #[serde(default)]
    pub location_link: Option<String>,
    /// Named service areas, in the owner's order.
    #[serde(default)]
    pub service_areas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationRecord>,
}

impl Business {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: None,
            tags: Vec::new(),
            created_at: Utc::now(),
            location_link: None,
            service_areas: Vec::new(),
            location: None,
        }
    }

    /// Resolved coordinates, if the business has been enhanced.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.as_ref().and_then(|l| l.coordinates)
    }

    /// Whether the owner supplied any location signal at all.
    pub fn has_location_reference(&self) -> bool {
        self.location_link
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty())
            || !self.service_areas.is_empty()
    }
}
