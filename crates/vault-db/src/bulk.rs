use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use vault_types::{validate_collection_name, Document};

use crate::error::{DbError, DbResult};
use crate::store::DocumentStore;

/// A document left out of a scan or bulk fetch, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub id: String,
    pub reason: String,
}

/// Documents read by a scan or bulk fetch, plus the ones that could not be
/// read. A non-empty `skipped` list usually means corruption or a
/// passphrase mismatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedDocument>,
}

impl ScanOutcome {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Semaphore-gated concurrent fetch of many documents.
///
/// At most `concurrency` fetch+decrypt operations are in flight at once.
/// A failure on one document is recorded in [`ScanOutcome::skipped`] and
/// never aborts the batch. Result order follows completion order, not
/// input order.
#[derive(Clone, Debug)]
pub struct BulkFetcher {
    store: DocumentStore,
    concurrency: usize,
}

impl BulkFetcher {
    pub fn new(store: DocumentStore) -> Self {
        let concurrency = store.config().bulk_concurrency;
        Self { store, concurrency }
    }

    /// Override the in-flight limit. Zero is raised to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetch `ids` from `collection`. Only an invalid collection name fails
    /// the whole call.
    pub async fn fetch<I, S>(&self, collection: &str, ids: I) -> DbResult<ScanOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_collection_name(collection)?;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        for id in ids {
            let id: String = id.into();
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| DbError::Task(e.to_string()))?;
            let store = self.store.clone();
            let collection = collection.to_string();
            let task_id = id.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                let result = store.get(&collection, &task_id).await;
                (task_id, result)
            });
            pending.insert(handle.id(), id);
        }

        let mut outcome = ScanOutcome::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task, (_, Ok(doc)))) => {
                    pending.remove(&task);
                    outcome.documents.push(doc);
                }
                Ok((task, (id, Err(e)))) => {
                    pending.remove(&task);
                    warn!(collection, id = %id, error = %e, "skipping unreadable document");
                    outcome.skipped.push(SkippedDocument {
                        id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    let id = pending.remove(&e.id()).unwrap_or_default();
                    warn!(collection, id = %id, error = %e, "fetch task failed");
                    outcome.skipped.push(SkippedDocument {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            collection,
            fetched = outcome.documents.len(),
            skipped = outcome.skipped.len(),
            concurrency = self.concurrency,
            "bulk fetch complete"
        );
        Ok(outcome)
    }
}
