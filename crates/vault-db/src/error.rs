use vault_crypto::CryptoError;
use vault_query::QueryError;
use vault_store::StoreError;
use vault_types::TypeError;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No blob exists for the document.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// The stored envelope could not be authenticated or decoded.
    #[error("cannot decrypt {collection}/{id}: {source}")]
    Decryption {
        collection: String,
        id: String,
        #[source]
        source: CryptoError,
    },

    #[error("cannot encrypt {collection}/{id}: {source}")]
    Encryption {
        collection: String,
        id: String,
        #[source]
        source: CryptoError,
    },

    /// Decrypted bytes are not a JSON object.
    #[error("malformed document {collection}/{id}: {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    /// Written data violates the collection schema. Raised before any write.
    #[error("schema violation for {collection}/{id}: {reason}")]
    SchemaViolation {
        collection: String,
        id: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// Failure reported by the blob store.
    #[error("storage {op} failed on {path}: {source}")]
    Storage {
        op: &'static str,
        path: String,
        #[source]
        source: StoreError,
    },

    /// Operation `index` of `total` failed during commit. Earlier operations
    /// remain applied.
    #[error("transaction failed at operation {index} of {total}: {source}")]
    Transaction {
        index: usize,
        total: usize,
        #[source]
        source: Box<DbError>,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A background task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl DbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption { .. })
    }

    pub(crate) fn storage(op: &'static str, path: &str, source: StoreError) -> Self {
        Self::Storage {
            op,
            path: path.to_string(),
            source,
        }
    }
}

/// Result alias for document store operations.
pub type DbResult<T> = Result<T, DbError>;
