use async_trait::async_trait;

use crate::error::StoreResult;

/// One entry returned by [`BlobStore::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobEntry {
    /// Final path component.
    pub name: String,
    /// Full normalized path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// Path-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - `write` is create-or-replace. Concurrent writers race; the last write
///   the backend observes wins.
/// - `read` of a missing path returns `Ok(None)`.
/// - `delete` of a missing path returns `Ok(false)`.
/// - `list(prefix)` returns direct children of `prefix`, sorted by path.
/// - Cancellation, retries and rate limiting are the backend's concern.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, path: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a blob. `message` is a human-readable description of the change
    /// (a commit message on version-controlled backends); backends without
    /// such a concept may ignore it.
    async fn write(&self, path: &str, data: &[u8], message: Option<&str>) -> StoreResult<()>;

    /// Delete a blob. Returns `true` if it existed.
    async fn delete(&self, path: &str) -> StoreResult<bool>;

    async fn list(&self, prefix: &str) -> StoreResult<Vec<BlobEntry>>;

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.read(path).await?.is_some())
    }
}
