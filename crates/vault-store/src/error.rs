/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path cannot be mapped onto the backend.
    #[error("invalid blob path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure (poisoned lock, remote rejection, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
