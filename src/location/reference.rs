//! Deep-link reference parsing.
//!
//! Accepted shapes, all on one of the configured navigation hosts:
//!
//! - `https://waze.com/ul?ll=<lat>,<lng>`: explicit coordinate pair
//! - `https://waze.com/ul?q=<percent-encoded place>`: place name
//! - `https://waze.com/live-map/directions/to/<slug>`: hyphenated address slug
//!
//! A link from any other host is not an error, just not ours.

use super::types::{Coordinates, ParsedReference};
use percent_encoding::percent_decode_str;
use url::Url;

/// Hosts recognised when no explicit list is configured.
pub const DEFAULT_LINK_HOSTS: &[&str] = &["waze.com", "www.waze.com", "ul.waze.com"];

/// Parses deep links of one mapping-application family.
#[derive(Debug, Clone)]
pub struct ReferenceParser {
    hosts: Vec<String>,
}

impl Default for ReferenceParser {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_HOSTS.iter().map(|h| h.to_string()).collect())
    }
}

impl ReferenceParser {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    /// Extract whatever location signal the link carries.
    ///
    /// Returns `None` for foreign hosts, malformed URLs, and links that carry
    /// nothing usable.
    pub fn parse(&self, link: &str) -> Option<ParsedReference> {
        let url = parse_lenient(link)?;
        let host = url.host_str()?.to_lowercase();
        if !self.accepts_host(&host) {
            log::debug!("Ignoring reference from foreign host '{}'", host);
            return None;
        }

        let mut parsed = ParsedReference::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "ll" => {
                    if let Some(c) = parse_lat_lng(&value) {
                        parsed.lat = Some(c.lat);
                        parsed.lng = Some(c.lng);
                    }
                }
                // live-map style: to=ll.<lat>,<lng>
                "to" => {
                    if let Some(c) = value.strip_prefix("ll.").and_then(parse_lat_lng) {
                        parsed.lat = Some(c.lat);
                        parsed.lng = Some(c.lng);
                    }
                }
                "q" => {
                    let place = value.trim();
                    if !place.is_empty() {
                        parsed.place = Some(place.to_string());
                    }
                }
                _ => {}
            }
        }

        if let Some(address) = directions_slug(&url) {
            parsed.address = Some(address);
        }

        if parsed == ParsedReference::default() {
            log::debug!("Reference '{}' carries no location signal", link);
            return None;
        }
        Some(parsed)
    }

    fn accepts_host(&self, host: &str) -> bool {
        self.hosts
            .iter()
            .any(|h| host == h || host.ends_with(&format!(".{}", h)))
    }
}

/// Parse with the default host list.
pub fn parse_reference(link: &str) -> Option<ParsedReference> {
    ReferenceParser::default().parse(link)
}

/// Navigation deep link for a resolved point, used by the map overlay.
pub fn navigation_link(coordinates: &Coordinates) -> String {
    format!(
        "https://waze.com/ul?ll={},{}&navigate=yes",
        coordinates.lat, coordinates.lng
    )
}

/// Accept links pasted without a scheme.
fn parse_lenient(link: &str) -> Option<Url> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }
    match Url::parse(link) {
        Ok(url) if url.has_host() => Some(url),
        _ => Url::parse(&format!("https://{}", link)).ok(),
    }
}

/// "32.0853,34.7818" → coordinates, if both halves parse and are in range.
fn parse_lat_lng(value: &str) -> Option<Coordinates> {
    let (lat, lng) = value.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    Coordinates::new(lat, lng).ok()
}

/// `.../directions/to/<slug>` → slug with hyphens turned into spaces.
fn directions_slug(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    let pos = segments
        .windows(2)
        .position(|w| w[0] == "directions" && w[1] == "to")?;
    let slug = segments.get(pos + 2)?;
    let decoded = percent_decode_str(slug).decode_utf8().ok()?;
    let address = decoded
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}
