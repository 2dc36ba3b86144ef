//! Config entry stores.
//!
//! The host owns persistence; `EntryStore` is the seam the wizard uses to
//! reject duplicates and commit new entries. Two implementations are
//! provided: an in-memory map and a JSON file.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::UniqueId;

use super::entry::ConfigEntry;
use super::error::StoreError;

/// Persisted config entries, keyed by unique id.
pub trait EntryStore: Send + Sync {
    /// Whether an entry with this id exists.
    fn contains(&self, id: &UniqueId) -> impl Future<Output = bool> + Send;

    /// Add an entry. Fails with `Duplicate` if its id is taken.
    fn insert(&self, entry: ConfigEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All entries, ordered by unique id.
    fn entries(&self) -> impl Future<Output = Vec<ConfigEntry>> + Send;
}

/// In-memory entry store.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: RwLock<BTreeMap<UniqueId, ConfigEntry>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries (later duplicates win).
    pub fn with_entries(entries: impl IntoIterator<Item = ConfigEntry>) -> Self {
        let map = entries.into_iter().map(|e| (e.unique_id(), e)).collect();
        Self {
            entries: RwLock::new(map),
        }
    }
}

impl EntryStore for MemoryEntryStore {
    async fn contains(&self, id: &UniqueId) -> bool {
        self.entries.read().await.contains_key(id)
    }

    async fn insert(&self, entry: ConfigEntry) -> Result<(), StoreError> {
        let id = entry.unique_id();
        let mut guard = self.entries.write().await;
        if guard.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        guard.insert(id, entry);
        Ok(())
    }

    async fn entries(&self) -> Vec<ConfigEntry> {
        self.entries.read().await.values().cloned().collect()
    }
}

/// On-disk format.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntries {
    entries: Vec<ConfigEntry>,
}

/// Entry store backed by a JSON file.
///
/// The file is read once at open and rewritten in full after every insert.
#[derive(Debug)]
pub struct FileEntryStore {
    path: PathBuf,
    inner: MemoryEntryStore,
}

impl FileEntryStore {
    /// Open a store, loading existing entries. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let stored: StoredEntries =
                    serde_json::from_str(&contents).map_err(|e| StoreError::Json {
                        message: format!("failed to parse {}: {}", path.display(), e),
                    })?;
                stored.entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(StoreError::Io {
                    message: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        Ok(Self {
            path,
            inner: MemoryEntryStore::with_entries(entries),
        })
    }

    /// Get the store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeMap<UniqueId, ConfigEntry>) -> Result<(), StoreError> {
        let stored = StoredEntries {
            entries: entries.values().cloned().collect(),
        };

        // Create parent directories if needed
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                message: format!("failed to create store directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(&stored).map_err(|e| StoreError::Json {
            message: format!("failed to serialize entries: {}", e),
        })?;

        std::fs::write(&self.path, json).map_err(|e| StoreError::Io {
            message: format!("failed to write store file: {}", e),
        })
    }
}

impl EntryStore for FileEntryStore {
    async fn contains(&self, id: &UniqueId) -> bool {
        self.inner.contains(id).await
    }

    async fn insert(&self, entry: ConfigEntry) -> Result<(), StoreError> {
        let id = entry.unique_id();
        let mut guard = self.inner.entries.write().await;
        if guard.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }

        guard.insert(id.clone(), entry);
        if let Err(e) = self.save(&guard) {
            guard.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    async fn entries(&self) -> Vec<ConfigEntry> {
        self.inner.entries().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApiKey, DestinationFilter, GtfsId, RouteFilter, Stop};
    use tempfile::tempdir;

    fn entry(route: &str) -> ConfigEntry {
        ConfigEntry::new(
            &Stop::new(GtfsId::parse("HSL:1303298").unwrap(), "Kuusisaarentie", "H1415"),
            RouteFilter::parse(route),
            DestinationFilter::All,
            ApiKey::parse("k").unwrap(),
        )
    }

    #[tokio::test]
    async fn memory_store_rejects_duplicates() {
        let store = MemoryEntryStore::new();
        store.insert(entry("550")).await.unwrap();

        assert!(store.contains(&entry("550").unique_id()).await);
        assert!(matches!(
            store.insert(entry("550")).await,
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn file_store_persists_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entries.json");

        let store = FileEntryStore::open(&path).unwrap();
        store.insert(entry("550")).await.unwrap();
        store.insert(entry("ALL")).await.unwrap();

        let reopened = FileEntryStore::open(&path).unwrap();
        let entries = reopened.entries().await;
        assert_eq!(entries.len(), 2);
        assert!(reopened.contains(&entry("550").unique_id()).await);
    }

    #[tokio::test]
    async fn file_store_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("entries.json");

        let store = FileEntryStore::open(&path).unwrap();
        store.insert(entry("550")).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = FileEntryStore::open(dir.path().join("none.json"));
        assert!(store.is_ok());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entries.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileEntryStore::open(&path),
            Err(StoreError::Json { .. })
        ));
    }
}
