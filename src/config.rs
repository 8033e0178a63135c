//! Runtime configuration, read from `~/.locator/config.json`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! A file that exists but does not parse is an error.

use crate::location::reference::DEFAULT_LINK_HOSTS;
use crate::location::LocationError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Nominatim-compatible search endpoint.
    pub geocoder_url: String,
    /// `countrycodes` filter sent upstream.
    pub country_codes: String,
    /// `accept-language` preference sent upstream.
    pub language: String,
    /// Appended to free-text queries for country bias. Empty disables.
    pub country_suffix: String,
    pub user_agent: String,
    /// Clamped up to the one-second policy floor.
    pub min_request_interval_ms: u64,
    pub request_timeout_secs: u64,
    /// Retries for transient geocoder failures. 0 disables retrying.
    pub max_retries: u32,
    /// Radius attached to records resolved from a specific link.
    pub default_search_radius_km: f64,
    pub store_path: PathBuf,
    /// Deep-link hosts the reference parser accepts.
    pub link_hosts: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder_url: NOMINATIM_SEARCH_URL.to_string(),
            country_codes: "il".to_string(),
            language: "he,en".to_string(),
            country_suffix: "Israel".to_string(),
            user_agent: format!("ListingLocator/{} (community-listings)", env!("CARGO_PKG_VERSION")),
            min_request_interval_ms: 1000,
            request_timeout_secs: 10,
            max_retries: 0,
            default_search_radius_km: 5.0,
            store_path: data_dir().join("businesses.json"),
            link_hosts: DEFAULT_LINK_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, LocationError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, LocationError> {
        let mut config = match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| LocationError::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Config::default()
            }
            Err(e) => return Err(LocationError::Config(format!("{}: {}", path.display(), e))),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        data_dir().join("config.json")
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("LOCATOR_GEOCODER_URL") {
            self.geocoder_url = url;
        }
        if let Some(store) = var("LOCATOR_STORE") {
            self.store_path = PathBuf::from(store);
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".locator")
}
