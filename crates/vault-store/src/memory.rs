use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::path::normalize_path;
use crate::traits::{BlobEntry, BlobStore};

#[derive(Clone, Debug)]
struct StoredBlob {
    data: Vec<u8>,
    message: Option<String>,
}

/// In-memory, `BTreeMap`-based blob store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` and
/// cloned on read/write. The last write message per path is retained for
/// inspection.
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(BTreeMap::new()),
        }
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, StoredBlob>>> {
        self.blobs
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, StoredBlob>>> {
        self.blobs
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.read_lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.read_lock()
            .map(|m| m.values().map(|b| b.data.len() as u64).sum())
            .unwrap_or(0)
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.read_lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// The message recorded with the most recent write to `path`.
    pub fn last_message(&self, path: &str) -> Option<String> {
        let path = normalize_path(path).ok()?;
        self.read_lock().ok()?.get(&path)?.message.clone()
    }

    /// Remove all blobs from the store.
    pub fn clear(&self) {
        if let Ok(mut map) = self.write_lock() {
            map.clear();
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = normalize_path(path)?;
        let map = self.read_lock()?;
        Ok(map.get(&path).map(|b| b.data.clone()))
    }

    async fn write(&self, path: &str, data: &[u8], message: Option<&str>) -> StoreResult<()> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Err(StoreError::InvalidPath {
                path,
                reason: "cannot write to the root".into(),
            });
        }
        let mut map = self.write_lock()?;
        map.insert(
            path,
            StoredBlob {
                data: data.to_vec(),
                message: message.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<bool> {
        let path = normalize_path(path)?;
        let mut map = self.write_lock()?;
        Ok(map.remove(&path).is_some())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<BlobEntry>> {
        let prefix = normalize_path(prefix)?;
        let dir = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let map = self.read_lock()?;
        let entries = map
            .range(dir.clone()..)
            .take_while(|(path, _)| path.starts_with(&dir))
            .filter_map(|(path, blob)| {
                let name = &path[dir.len()..];
                if name.contains('/') {
                    return None;
                }
                Some(BlobEntry {
                    name: name.to_string(),
                    path: path.clone(),
                    size: blob.data.len() as u64,
                })
            })
            .collect();
        Ok(entries)
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
