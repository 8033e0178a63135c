//! Proximity search over enhanced listings.
//!
//! All active predicates are ANDed: distance (when a center is set), free
//! text, category, and tags.

use super::business::Business;
use crate::location::{distance_km, format_distance, Coordinates};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Nearest first. Falls back to name order without a center.
    #[default]
    Distance,
    Name,
    /// Most recently created first.
    Newest,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distance" | "nearest" => Ok(Self::Distance),
            "name" | "alpha" => Ok(Self::Name),
            "newest" | "recent" => Ok(Self::Newest),
            _ => Err(format!("Unknown sort '{}'. Use 'distance', 'name' or 'newest'.", s)),
        }
    }
}

/// A proximity search request. Empty fields are inactive predicates.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub center: Option<Coordinates>,
    pub radius_km: Option<f64>,
    pub text: Option<String>,
    /// Business category must be one of these.
    pub categories: Vec<String>,
    /// Business must carry every one of these tags.
    pub tags: Vec<String>,
    pub sort: SortOrder,
}

/// A listing annotated with its distance to the query center.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessWithDistance {
    #[serde(flatten)]
    pub business: Business,
    #[serde(rename = "distanceKm", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl BusinessWithDistance {
    pub fn distance_label(&self) -> Option<String> {
        self.distance_km.map(format_distance)
    }
}

/// Filter and sort `businesses` for `query`.
pub fn search(businesses: &[Business], query: &SearchQuery) -> Vec<BusinessWithDistance> {
    let text = query
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);

    let mut results: Vec<BusinessWithDistance> = businesses
        .iter()
        .filter(|b| text.as_deref().map_or(true, |t| matches_text(b, t)))
        .filter(|b| matches_category(b, &query.categories))
        .filter(|b| has_all_tags(b, &query.tags))
        .filter_map(|b| {
            let distance = match query.center {
                Some(center) => {
                    let d = distance_km(&center, &b.coordinates()?);
                    if query.radius_km.is_some_and(|r| d > r) {
                        return None;
                    }
                    Some(d)
                }
                None => None,
            };
            Some(BusinessWithDistance {
                business: b.clone(),
                distance_km: distance,
            })
        })
        .collect();

    sort_results(&mut results, query.sort);
    results
}

fn matches_text(business: &Business, needle: &str) -> bool {
    business.name.to_lowercase().contains(needle)
        || business.description.to_lowercase().contains(needle)
        || business
            .category
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
        || business.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

fn matches_category(business: &Business, categories: &[String]) -> bool {
    categories.is_empty()
        || business
            .category
            .as_deref()
            .is_some_and(|c| categories.iter().any(|wanted| wanted.eq_ignore_ascii_case(c)))
}

fn has_all_tags(business: &Business, tags: &[String]) -> bool {
    tags.iter()
        .all(|wanted| business.tags.iter().any(|t| t.eq_ignore_ascii_case(wanted)))
}

/// Case-folded comparison with a raw tiebreak so equal keys stay deterministic.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn sort_results(results: &mut [BusinessWithDistance], order: SortOrder) {
    let by_name = |a: &BusinessWithDistance, b: &BusinessWithDistance| {
        compare_names(&a.business.name, &b.business.name)
    };
    match order {
        SortOrder::Distance => results.sort_by(|a, b| {
            let da = a.distance_km.unwrap_or(f64::INFINITY);
            let db = b.distance_km.unwrap_or(f64::INFINITY);
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_name(a, b))
        }),
        SortOrder::Name => results.sort_by(by_name),
        SortOrder::Newest => results.sort_by(|a, b| {
            b.business
                .created_at
                .cmp(&a.business.created_at)
                .then_with(|| by_name(a, b))
        }),
    }
}
