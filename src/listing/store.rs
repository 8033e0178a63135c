//! Business record storage.
//!
//! The real record store lives outside this crate; `ListingStore` is the
//! seam. `JsonStore` keeps listings in a single JSON array on disk, which is
//! enough for the CLI and the bundled server.

use super::business::Business;
use crate::location::{LocationError, LocationRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Read access to listings plus the single write the location core performs.
pub trait ListingStore {
    /// Snapshot of every listing, in store order.
    fn all(&self) -> Vec<Business>;

    fn get(&self, id: &str) -> Option<Business>;

    /// Replace (never append) the location metadata of one listing.
    fn set_location(&mut self, id: &str, record: LocationRecord) -> Result<(), LocationError>;
}

/// JSON-file backed store. Without a path it lives only in memory.
#[derive(Debug, Default)]
pub struct JsonStore {
    path: Option<PathBuf>,
    entries: Vec<Business>,
}

impl JsonStore {
    /// Load listings from a file. A missing file is an empty store.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, LocationError> {
        let path = path.into();
        let entries = Self::read_file(&path)?;
        log::debug!("Loaded {} listings from {}", entries.len(), path.display());
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Store over an in-memory list (nothing is written to disk).
    pub fn in_memory(entries: Vec<Business>) -> Self {
        Self { path: None, entries }
    }

    fn read_file(path: &Path) -> Result<Vec<Business>, LocationError> {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| LocationError::Store(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(LocationError::Store(format!("{}: {}", path.display(), e))),
        }
    }

    fn persist(&self) -> Result<(), LocationError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LocationError::Store(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| LocationError::Store(e.to_string()))?;
        fs::write(path, json).map_err(|e| LocationError::Store(format!("{}: {}", path.display(), e)))
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ListingStore for JsonStore {
    fn all(&self) -> Vec<Business> {
        self.entries.clone()
    }

    fn get(&self, id: &str) -> Option<Business> {
        self.entries.iter().find(|b| b.id == id).cloned()
    }

    fn set_location(&mut self, id: &str, record: LocationRecord) -> Result<(), LocationError> {
        let business = self
            .entries
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| LocationError::Store(format!("no listing with id '{}'", id)))?;
        business.location = Some(record);
        self.persist()
    }
}
