//! Service-area gazetteer: a fixed table of named regions.
//!
//! Lookups are exact and case-sensitive. Names come from the same listing
//! the owner picks from, so there is nothing to normalise.

use super::distance::distance_km;
use super::types::Coordinates;
use serde::Serialize;
use std::fmt;

/// Precision tier of a service area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AreaTier {
    /// Single city, small radius.
    City = 1,
    /// Sub-national region.
    Region = 2,
    /// Country or mega-region catch-all.
    Country = 3,
}

impl AreaTier {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Region => "region",
            Self::Country => "nationwide",
        }
    }
}

impl fmt::Display for AreaTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A named service area.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAreaEntry {
    pub name: &'static str,
    pub center: Coordinates,
    pub radius_km: f64,
    pub tier: AreaTier,
}

const fn area(name: &'static str, lat: f64, lng: f64, radius_km: f64, tier: AreaTier) -> ServiceAreaEntry {
    ServiceAreaEntry {
        name,
        center: Coordinates { lat, lng },
        radius_km,
        tier,
    }
}

const SERVICE_AREAS: &[ServiceAreaEntry] = &[
    // Tier 1: cities
    area("Tel Aviv", 32.0853, 34.7818, 10.0, AreaTier::City),
    area("Jerusalem", 31.7683, 35.2137, 12.0, AreaTier::City),
    area("Haifa", 32.7940, 34.9896, 12.0, AreaTier::City),
    area("Beer Sheva", 31.2520, 34.7915, 12.0, AreaTier::City),
    area("Rishon LeZion", 31.9730, 34.7925, 8.0, AreaTier::City),
    area("Petah Tikva", 32.0840, 34.8878, 8.0, AreaTier::City),
    area("Netanya", 32.3215, 34.8532, 8.0, AreaTier::City),
    area("Ashdod", 31.8044, 34.6553, 8.0, AreaTier::City),
    area("Herzliya", 32.1624, 34.8447, 6.0, AreaTier::City),
    area("Ra'anana", 32.1848, 34.8713, 6.0, AreaTier::City),
    area("Modiin", 31.8980, 35.0104, 8.0, AreaTier::City),
    area("Eilat", 29.5577, 34.9519, 10.0, AreaTier::City),
    // Tier 2: regions
    area("Gush Dan", 32.0700, 34.8200, 25.0, AreaTier::Region),
    area("Sharon", 32.2800, 34.8800, 25.0, AreaTier::Region),
    area("Shfela", 31.8000, 34.8000, 30.0, AreaTier::Region),
    area("Jerusalem Area", 31.7700, 35.1500, 30.0, AreaTier::Region),
    area("Haifa Bay Area", 32.8000, 35.0500, 25.0, AreaTier::Region),
    area("Galilee", 32.9000, 35.4000, 45.0, AreaTier::Region),
    area("Golan Heights", 33.0000, 35.7500, 35.0, AreaTier::Region),
    area("Negev", 30.8000, 34.8000, 100.0, AreaTier::Region),
    area("Arava", 30.3000, 35.1500, 90.0, AreaTier::Region),
    // Tier 3: catch-alls
    area("Central Israel", 32.0000, 34.8500, 60.0, AreaTier::Country),
    area("Northern Israel", 32.9000, 35.3000, 90.0, AreaTier::Country),
    area("Southern Israel", 30.6000, 34.8000, 180.0, AreaTier::Country),
    area("Nationwide", 31.4000, 35.0000, 250.0, AreaTier::Country),
];

/// Exact, case-sensitive lookup.
pub fn lookup(name: &str) -> Option<&'static ServiceAreaEntry> {
    SERVICE_AREAS.iter().find(|a| a.name == name)
}

/// All entries in table order.
pub fn entries() -> &'static [ServiceAreaEntry] {
    SERVICE_AREAS
}

/// A service area entry for the public listing API.
#[derive(Debug, Clone, Serialize)]
pub struct AreaInfo {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
    pub tier: u8,
    pub tier_label: String,
}

impl From<&ServiceAreaEntry> for AreaInfo {
    fn from(a: &ServiceAreaEntry) -> Self {
        Self {
            name: a.name.to_string(),
            lat: a.center.lat,
            lng: a.center.lng,
            radius_km: a.radius_km,
            tier: a.tier.number(),
            tier_label: a.tier.label().to_string(),
        }
    }
}

/// Return the full area list annotated with tier (for the owner's picker).
pub fn area_list() -> Vec<AreaInfo> {
    SERVICE_AREAS.iter().map(AreaInfo::from).collect()
}

/// Area list grouped by tier, most precise first.
pub fn areas_by_tier() -> Vec<(AreaTier, Vec<AreaInfo>)> {
    [AreaTier::City, AreaTier::Region, AreaTier::Country]
        .into_iter()
        .map(|tier| {
            let infos = SERVICE_AREAS
                .iter()
                .filter(|a| a.tier == tier)
                .map(AreaInfo::from)
                .collect();
            (tier, infos)
        })
        .collect()
}

/// Smallest circle around the areas' centroid that contains every area.
///
/// Returns `None` for an empty slice.
pub fn covering_circle(areas: &[&ServiceAreaEntry]) -> Option<(Coordinates, f64)> {
    if areas.is_empty() {
        return None;
    }
    let n = areas.len() as f64;
    let center = Coordinates {
        lat: areas.iter().map(|a| a.center.lat).sum::<f64>() / n,
        lng: areas.iter().map(|a| a.center.lng).sum::<f64>() / n,
    };
    let radius = areas
        .iter()
        .map(|a| distance_km(&center, &a.center) + a.radius_km)
        .fold(0.0, f64::max);
    Some((center, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_exact() {
        let ta = lookup("Tel Aviv").unwrap();
        assert_eq!(ta.tier, AreaTier::City);
        assert!((ta.center.lat - 32.0853).abs() < 1e-9);
        assert_eq!(ta.radius_km, 10.0);
    }

    #[test]
    fn test_lookup_case_sensitive() {
        assert!(lookup("tel aviv").is_none());
        assert!(lookup("Tel Aviv ").is_none());
        assert!(lookup("Atlantis").is_none());
    }

    #[test]
    fn test_names_unique() {
        let names: HashSet<_> = entries().iter().map(|a| a.name).collect();
        assert_eq!(names.len(), entries().len());
    }

    #[test]
    fn test_every_tier_present() {
        let groups = areas_by_tier();
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|(_, list)| !list.is_empty()));
        assert_eq!(groups[0].1[0].tier, 1);
        assert_eq!(groups[2].1[0].tier_label, "nationwide");
    }

    #[test]
    fn test_area_list_matches_table() {
        let list = area_list();
        assert_eq!(list.len(), entries().len());
        let haifa = list.iter().find(|a| a.name == "Haifa").unwrap();
        assert_eq!(haifa.tier, 1);
    }

    #[test]
    fn test_covering_circle_single() {
        let ta = lookup("Tel Aviv").unwrap();
        let (center, radius) = covering_circle(&[ta]).unwrap();
        assert_eq!(center, ta.center);
        assert!((radius - ta.radius_km).abs() < 1e-9);
    }

    #[test]
    fn test_covering_circle_contains_all() {
        let ta = lookup("Tel Aviv").unwrap();
        let jlm = lookup("Jerusalem").unwrap();
        let (center, radius) = covering_circle(&[ta, jlm]).unwrap();
        for a in [ta, jlm] {
            assert!(distance_km(&center, &a.center) + a.radius_km <= radius + 1e-9);
        }
        assert!(covering_circle(&[]).is_none());
    }
}
