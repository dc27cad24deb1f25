use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vault_db::DocumentStore;
use vault_types::Value;

use crate::error::{MigrateError, MigrateResult};

/// Collection holding store metadata.
pub const LEDGER_COLLECTION: &str = "_meta";
/// Document id of the migration ledger within [`LEDGER_COLLECTION`].
pub const LEDGER_ID: &str = "migrations";

/// Append-only record of applied migration ids.
///
/// Persisted as the document `_meta/migrations`:
/// `{"applied": [...], "lastAppliedAt": "<RFC 3339>"}`. It is encrypted like
/// any other document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationLedger {
    #[serde(default)]
    applied: Vec<String>,
    #[serde(default)]
    last_applied_at: Option<DateTime<Utc>>,
}

impl MigrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applied ids in application order.
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    pub fn contains(&self, id: &str) -> bool {
        self.applied.iter().any(|a| a == id)
    }

    pub fn last_applied_at(&self) -> Option<DateTime<Utc>> {
        self.last_applied_at
    }

    /// Append `id`. Returns `false`, leaving the ledger untouched, if it is
    /// already present.
    pub fn record(&mut self, id: impl Into<String>, at: DateTime<Utc>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.applied.push(id);
        self.last_applied_at = Some(at);
        true
    }

    /// Load the ledger, or an empty one if none has been written yet.
    pub async fn load(store: &DocumentStore) -> MigrateResult<Self> {
        let Some(doc) = store.find(LEDGER_COLLECTION, LEDGER_ID).await? else {
            return Ok(Self::default());
        };
        serde_json::from_value(serde_json::Value::from(doc.data))
            .map_err(|e| MigrateError::CorruptLedger(e.to_string()))
    }

    pub async fn save(&self, store: &DocumentStore) -> MigrateResult<()> {
        let json = serde_json::to_value(self)
            .map_err(|e| MigrateError::CorruptLedger(e.to_string()))?;
        store
            .put(LEDGER_COLLECTION, LEDGER_ID, Value::from(json))
            .await?;
        Ok(())
    }
}
