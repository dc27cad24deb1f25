use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vault_crypto::{Algorithm, DEFAULT_ITERATIONS, MAX_ITERATIONS};
use vault_store::normalize_path;
use vault_types::validate_collection_name;

use crate::error::{DbError, DbResult};
use crate::schema::Schema;

/// Configuration for a [`DocumentStore`](crate::DocumentStore).
///
/// The passphrase is not part of the config; it is handed to the store at
/// construction and never serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Blob path prefix under which every collection lives.
    pub base_path: String,
    /// Algorithm for newly written documents. `none` stores plaintext JSON.
    pub algorithm: Algorithm,
    /// PBKDF2 iterations for newly written documents.
    pub kdf_iterations: u32,
    /// Maximum in-flight fetches during scans and bulk reads.
    pub bulk_concurrency: usize,
    /// Attach a message such as `put users/alice` to every blob write.
    pub commit_messages: bool,
    /// Field contracts keyed by collection name.
    pub schemas: BTreeMap<String, Schema>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_path: "db".into(),
            algorithm: Algorithm::AesGcm256,
            kdf_iterations: DEFAULT_ITERATIONS,
            bulk_concurrency: 8,
            commit_messages: true,
            schemas: BTreeMap::new(),
        }
    }
}

impl VaultConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(source: &str) -> DbResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| DbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&source)
    }

    pub fn to_toml(&self) -> DbResult<String> {
        toml::to_string(self).map_err(|e| DbError::Config(e.to_string()))
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.bulk_concurrency == 0 {
            return Err(DbError::Config("bulk_concurrency must be at least 1".into()));
        }
        if self.kdf_iterations == 0 {
            return Err(DbError::Config("kdf_iterations must be at least 1".into()));
        }
        if self.kdf_iterations > MAX_ITERATIONS {
            return Err(DbError::Config(format!(
                "kdf_iterations must not exceed {MAX_ITERATIONS}"
            )));
        }
        normalize_path(&self.base_path)
            .map_err(|e| DbError::Config(format!("base_path: {e}")))?;
        for collection in self.schemas.keys() {
            validate_collection_name(collection)?;
        }
        Ok(())
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    pub fn with_bulk_concurrency(mut self, concurrency: usize) -> Self {
        self.bulk_concurrency = concurrency;
        self
    }

    pub fn with_schema(mut self, collection: impl Into<String>, schema: Schema) -> Self {
        self.schemas.insert(collection.into(), schema);
        self
    }
}
