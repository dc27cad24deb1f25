use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::path::{join_path, normalize_path};
use crate::traits::{BlobEntry, BlobStore};

/// Filesystem-backed blob store.
///
/// Logical paths map onto files below `root`; intermediate directories are
/// created on write. Write messages are logged but not persisted.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StoreResult<(String, PathBuf)> {
        let logical = normalize_path(path)?;
        let mut fs_path = self.root.clone();
        fs_path.extend(logical.split('/').filter(|c| !c.is_empty()));
        Ok((logical, fs_path))
    }
}

fn io_error(path: &str, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_string(),
        source,
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let (logical, fs_path) = self.resolve(path)?;
        match tokio::fs::read(&fs_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&logical, e)),
        }
    }

    async fn write(&self, path: &str, data: &[u8], message: Option<&str>) -> StoreResult<()> {
        let (logical, fs_path) = self.resolve(path)?;
        if logical.is_empty() {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: "cannot write to the root".into(),
            });
        }
        if let Some(parent) = fs_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(&logical, e))?;
        }
        tokio::fs::write(&fs_path, data)
            .await
            .map_err(|e| io_error(&logical, e))?;
        debug!(path = %logical, len = data.len(), message = message.unwrap_or(""), "blob written");
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<bool> {
        let (logical, fs_path) = self.resolve(path)?;
        match tokio::fs::remove_file(&fs_path).await {
            Ok(()) => {
                debug!(path = %logical, "blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&logical, e)),
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<BlobEntry>> {
        let (logical, dir) = self.resolve(prefix)?;
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&logical, e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_error(&logical, e))?
        {
            let metadata = entry.metadata().await.map_err(|e| io_error(&logical, e))?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            entries.push(BlobEntry {
                path: join_path([logical.as_str(), name.as_str()]),
                name,
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn write_creates_directories() {
        let (dir, store) = temp_store();
        store.write("db/users/a.json", b"{}", Some("put users/a")).await.unwrap();
        assert!(dir.path().join("db").join("users").join("a.json").is_file());
        assert_eq!(store.read("db/users/a.json").await.unwrap().unwrap(), b"{}");
    }

    #[tokio::test]
    async fn read_and_delete_missing() {
        let (_dir, store) = temp_store();
        assert!(store.read("db/none.json").await.unwrap().is_none());
        assert!(!store.delete("db/none.json").await.unwrap());
    }

    #[tokio::test]
    async fn delete_existing() {
        let (_dir, store) = temp_store();
        store.write("x/y", b"1", None).await.unwrap();
        assert!(store.delete("x/y").await.unwrap());
        assert!(!store.exists("x/y").await.unwrap());
    }

    #[tokio::test]
    async fn list_skips_directories_and_sorts() {
        let (_dir, store) = temp_store();
        store.write("db/c/b.json", b"22", None).await.unwrap();
        store.write("db/c/a.json", b"1", None).await.unwrap();
        store.write("db/c/.placeholder", b"", None).await.unwrap();
        store.write("db/c/sub/z.json", b"", None).await.unwrap();

        let entries = store.list("db/c").await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["db/c/.placeholder", "db/c/a.json", "db/c/b.json"]);
        assert_eq!(entries[2].size, 2);
    }

    #[tokio::test]
    async fn list_missing_directory_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.list("nothing/here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let (_dir, store) = temp_store();
        let err = store.write("../escape", b"x", None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
    }
}
