//! Filesystem-backed object store
//!
//! Folders map to directories under a root. New objects are written to a
//! temporary file in the target directory and then hard-linked to their
//! final name: the link fails atomically if the name exists, so readers
//! never observe a partially written object and nothing is ever overwritten.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use vellum_core::{ObjectEntry, ObjectStore, StoreError};

use crate::normalize_folder;

/// Prefix of in-flight temporary files; never listed
const TEMP_PREFIX: &str = ".vellum-tmp-";

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        let root = fs::canonicalize(&root).await?;

        info!(path = %root.display(), "Filesystem object store initialized");

        Ok(Self { root })
    }

    /// The canonical root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a folder (and its parents); test and provisioning helper
    pub async fn create_folder(&self, folder: &str) -> Result<(), StoreError> {
        let dir = self.folder_path(folder)?;
        fs::create_dir_all(&dir).await?;
        Ok(())
    }

    /// Map a folder path to a directory, refusing anything that could escape the root
    fn folder_path(&self, folder: &str) -> Result<PathBuf, StoreError> {
        let folder = normalize_folder(folder);
        let mut dir = self.root.clone();
        for segment in folder.split('/').filter(|s| !s.is_empty()) {
            check_segment(segment)?;
            dir.push(segment);
        }
        Ok(dir)
    }

    fn object_path(&self, folder: &str, name: &str) -> Result<PathBuf, StoreError> {
        check_segment(name)?;
        Ok(self.folder_path(folder)?.join(name))
    }

    async fn require_dir(&self, dir: &Path, folder: &str) -> Result<(), StoreError> {
        match fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::not_found(folder)),
            Err(e) if is_missing(&e) => Err(StoreError::not_found(folder)),
            Err(e) => Err(StoreError::io(e.to_string())),
        }
    }
}

/// A single path segment must be a plain name
fn check_segment(segment: &str) -> Result<(), StoreError> {
    let mut components = Path::new(segment).components();
    let plain = matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
    if !plain
        || segment.contains(['/', '\\'])
        || segment.chars().any(char::is_control)
        || segment.starts_with(TEMP_PREFIX)
    {
        return Err(StoreError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

/// A path component is absent, or one of the folder segments is a plain file
fn is_missing(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

fn to_utc(time: std::io::Result<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    #[instrument(skip(self))]
    async fn list(&self, folder: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        let dir = self.folder_path(folder)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if is_missing(&e) => {
                return Err(StoreError::not_found(normalize_folder(folder)));
            }
            Err(e) => return Err(StoreError::io(e.to_string())),
        };

        let mut listed = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(e.to_string()))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| StoreError::io(e.to_string()))?;
            if !meta.is_file() {
                continue;
            }
            let created_at = to_utc(meta.created().or_else(|_| meta.modified()));
            listed.push(ObjectEntry::new(name, meta.len(), created_at));
        }

        listed.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = listed.len(), "Listed folder");
        Ok(listed)
    }

    async fn read(&self, folder: &str, name: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(folder, name)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if is_missing(&e) => Err(StoreError::not_found(format!(
                "{}{name}",
                normalize_folder(folder)
            ))),
            Err(e) => Err(StoreError::io(e.to_string())),
        }
    }

    async fn link(&self, folder: &str, name: &str) -> Result<String, StoreError> {
        let path = self.object_path(folder, name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(format!("file://{}", path.display())),
            Ok(_) => Err(StoreError::not_found(name)),
            Err(e) if is_missing(&e) => Err(StoreError::not_found(format!(
                "{}{name}",
                normalize_folder(folder)
            ))),
            Err(e) => Err(StoreError::io(e.to_string())),
        }
    }

    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn create(
        &self,
        folder: &str,
        name: &str,
        content: Bytes,
    ) -> Result<ObjectEntry, StoreError> {
        let dir = self.folder_path(folder)?;
        let path = self.object_path(folder, name)?;
        self.require_dir(&dir, folder).await?;

        // Cheap early refusal; the hard link below is the real guard
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::already_exists(name));
        }

        let temp_path = dir.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
        let write_result = async {
            let mut file = File::create(&temp_path).await?;
            file.write_all(&content).await?;
            file.sync_all().await?;
            fs::hard_link(&temp_path, &path).await
        }
        .await;

        if let Err(e) = fs::remove_file(&temp_path).await
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }

        match write_result {
            Ok(()) => {
                debug!(name, "Created object");
                Ok(ObjectEntry::new(name, content.len() as u64, Utc::now()))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(name, "Create refused, name taken");
                Err(StoreError::already_exists(name))
            }
            Err(e) => Err(StoreError::io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FOLDER: &str = "ActiGraph/PID001/output_PID001/results/";

    async fn create_test_store() -> (FsObjectStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path().join("store")).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (store, _temp) = create_test_store().await;
        store.create_folder(FOLDER).await.unwrap();

        let entry = store
            .create(FOLDER, "data_v1.csv", Bytes::from_static(b"a,b\n1,2\n"))
            .await
            .unwrap();
        assert_eq!(entry.size, 8);

        let data = store.read(FOLDER, "data_v1.csv").await.unwrap();
        assert_eq!(&data[..], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let (store, _temp) = create_test_store().await;
        store.create_folder(FOLDER).await.unwrap();

        store
            .create(FOLDER, "data.csv", Bytes::from_static(b"original"))
            .await
            .unwrap();
        let err = store
            .create(FOLDER, "data.csv", Bytes::from_static(b"clobber"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let data = store.read(FOLDER, "data.csv").await.unwrap();
        assert_eq!(&data[..], b"original");
    }

    #[tokio::test]
    async fn test_list_skips_dirs_and_temp_files() {
        let (store, _temp) = create_test_store().await;
        store.create_folder(FOLDER).await.unwrap();
        store.create_folder(&format!("{FOLDER}nested/")).await.unwrap();
        store
            .create(FOLDER, "b.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        fs::write(store.root().join(FOLDER).join(".vellum-tmp-stale"), b"junk")
            .await
            .unwrap();

        let names: Vec<_> = store
            .list(FOLDER)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["b.pdf"]);
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let (store, _temp) = create_test_store().await;
        assert!(matches!(
            store.list(FOLDER).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.create(FOLDER, "x.csv", Bytes::new()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_file_in_place_of_folder_is_not_found() {
        let (store, _temp) = create_test_store().await;
        store.create_folder("ActiGraph/").await.unwrap();
        store
            .create("ActiGraph/", "PID001", Bytes::from_static(b"stray"))
            .await
            .unwrap();

        let err = store.list(FOLDER).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!err.is_transient());
        assert!(matches!(
            store.read(FOLDER, "data.csv").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.link(FOLDER, "data.csv").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_refuses_escaping_paths() {
        let (store, _temp) = create_test_store().await;
        for folder in ["../outside/", "a/../../b/", "./a/"] {
            assert!(
                matches!(store.list(folder).await, Err(StoreError::InvalidPath(_))),
                "folder {folder:?} should be refused"
            );
        }
        store.create_folder("a/").await.unwrap();
        assert!(matches!(
            store.read("a/", "..").await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_link_points_at_file() {
        let (store, _temp) = create_test_store().await;
        store.create_folder(FOLDER).await.unwrap();
        store
            .create(FOLDER, "visualisation_data.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();

        let link = store.link(FOLDER, "visualisation_data.pdf").await.unwrap();
        assert!(link.starts_with("file://"));
        assert!(link.ends_with("results/visualisation_data.pdf"));
        assert!(store.link(FOLDER, "missing.pdf").await.is_err());
    }
}
