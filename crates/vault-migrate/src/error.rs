use vault_db::DbError;

/// Errors from migration runs.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A step's `apply` returned an error.
    #[error("migration {id} failed: {source}")]
    Step {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Two steps in one run share an id. Nothing was applied.
    #[error("duplicate migration id {0}")]
    DuplicateStep(String),

    /// The stored ledger could not be decoded.
    #[error("corrupt migration ledger: {0}")]
    CorruptLedger(String),

    /// Reading or writing the ledger failed.
    #[error(transparent)]
    Store(#[from] DbError),
}

/// Result alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;
