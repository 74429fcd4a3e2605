//! In-memory object store
//!
//! Suitable for testing, simulation, and demos. Create-if-absent goes
//! through the DashMap entry API, so two racing creates of the same name
//! resolve to exactly one winner.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use vellum_core::{ObjectEntry, ObjectStore, StoreError};

use crate::normalize_folder;

/// Default scheme prefix for links handed out by the in-memory store
const DEFAULT_LINK_BASE: &str = "memory://";

#[derive(Debug, Clone)]
struct StoredObject {
    content: Bytes,
    created_at: DateTime<Utc>,
}

impl StoredObject {
    fn entry(&self, name: &str) -> ObjectEntry {
        ObjectEntry::new(name, self.content.len() as u64, self.created_at)
    }
}

/// In-memory implementation of [`ObjectStore`]
///
/// Folders must be created explicitly (or implicitly by [`seed`](Self::seed))
/// before they can be listed or written to.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    /// Folder path -> (entry name -> object)
    folders: DashMap<String, DashMap<String, StoredObject>>,
    /// Prefix for generated links
    link_base: String,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_link_base(DEFAULT_LINK_BASE)
    }

    /// Create an empty store whose links start with `link_base`
    pub fn with_link_base(link_base: impl Into<String>) -> Self {
        Self {
            folders: DashMap::new(),
            link_base: link_base.into(),
        }
    }

    /// Make sure a folder exists
    pub fn create_folder(&self, folder: &str) {
        self.folders.entry(normalize_folder(folder)).or_default();
    }

    /// Place an object directly, creating its folder if needed
    ///
    /// Setup helper for tests and demos; replaces any existing object of the
    /// same name, which the [`ObjectStore`] surface never does.
    pub fn seed(&self, folder: &str, name: &str, content: impl Into<Bytes>) {
        let folder = normalize_folder(folder);
        let object = StoredObject {
            content: content.into(),
            created_at: Utc::now(),
        };
        self.folders
            .entry(folder)
            .or_default()
            .insert(name.to_string(), object);
    }

    /// Number of folders
    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    /// Total number of objects across all folders
    pub fn object_count(&self) -> usize {
        self.folders.iter().map(|f| f.value().len()).sum()
    }

    fn link_for(&self, folder: &str, name: &str) -> String {
        format!("{}{}{}", self.link_base, folder, name)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self, folder: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let key = normalize_folder(folder);
        let objects = self
            .folders
            .get(&key)
            .ok_or_else(|| StoreError::not_found(key.clone()))?;

        let mut entries: Vec<ObjectEntry> = objects
            .iter()
            .map(|item| item.value().entry(item.key()))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        trace!(folder = %key, count = entries.len(), "Listed folder");
        Ok(entries)
    }

    async fn read(&self, folder: &str, name: &str) -> Result<Bytes, StoreError> {
        let key = normalize_folder(folder);
        let objects = self
            .folders
            .get(&key)
            .ok_or_else(|| StoreError::not_found(key.clone()))?;
        let object = objects
            .get(name)
            .ok_or_else(|| StoreError::not_found(format!("{key}{name}")))?;
        Ok(object.content.clone())
    }

    async fn link(&self, folder: &str, name: &str) -> Result<String, StoreError> {
        let key = normalize_folder(folder);
        let objects = self
            .folders
            .get(&key)
            .ok_or_else(|| StoreError::not_found(key.clone()))?;
        if !objects.contains_key(name) {
            return Err(StoreError::not_found(format!("{key}{name}")));
        }
        Ok(self.link_for(&key, name))
    }

    async fn create(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
    ) -> Result<ObjectEntry, StoreError> {
        let key = normalize_folder(folder);
        let objects = self
            .folders
            .get(&key)
            .ok_or_else(|| StoreError::not_found(key.clone()))?;

        match objects.entry(name.to_string()) {
            Entry::Occupied(_) => {
                debug!(folder = %key, name, "Create refused, name taken");
                Err(StoreError::already_exists(format!("{key}{name}")))
            }
            Entry::Vacant(slot) => {
                let object = StoredObject {
                    content,
                    created_at: Utc::now(),
                };
                let entry = object.entry(name);
                slot.insert(object);
                debug!(folder = %key, name, size = entry.size, "Created object");
                Ok(entry)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const FOLDER: &str = "ActiGraph/PID001/output_PID001/results/";

    #[tokio::test]
    async fn test_list_missing_folder_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.list(FOLDER).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_read_and_list() {
        let store = InMemoryObjectStore::new();
        store.create_folder(FOLDER);

        let entry = store
            .create(FOLDER, "b.csv", Bytes::from_static(b"x,y\n1,2\n"))
            .await
            .unwrap();
        assert_eq!(entry.size, 8);
        store.seed(FOLDER, "a.pdf", &b"%PDF"[..]);

        let names: Vec<_> = store
            .list(FOLDER)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.csv"]);

        let content = store.read(FOLDER, "b.csv").await.unwrap();
        assert_eq!(&content[..], b"x,y\n1,2\n");
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let store = InMemoryObjectStore::new();
        store.seed(FOLDER, "data.csv", &b"original"[..]);

        let err = store
            .create(FOLDER, "data.csv", Bytes::from_static(b"clobber"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let content = store.read(FOLDER, "data.csv").await.unwrap();
        assert_eq!(&content[..], b"original");
    }

    #[tokio::test]
    async fn test_create_requires_folder() {
        let store = InMemoryObjectStore::new();
        let err = store
            .create(FOLDER, "data.csv", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.folder_count(), 0);
    }

    #[tokio::test]
    async fn test_links() {
        let store = InMemoryObjectStore::with_link_base("https://drive.test/");
        store.seed(FOLDER, "visualisation_sleep.pdf", &b"%PDF"[..]);

        let link = store.link(FOLDER, "visualisation_sleep.pdf").await.unwrap();
        assert_eq!(
            link,
            "https://drive.test/ActiGraph/PID001/output_PID001/results/visualisation_sleep.pdf"
        );
        assert!(store.link(FOLDER, "missing.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_racing_creates_have_one_winner() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.create_folder(FOLDER);

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(FOLDER, "data_v1.csv", Bytes::from(vec![i]))
                    .await
                    .is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.object_count(), 1);
    }
}
