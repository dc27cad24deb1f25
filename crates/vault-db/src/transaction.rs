use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use vault_types::Value;

use crate::error::{DbError, DbResult};
use crate::store::DocumentStore;

/// Re-runnable document transform used by [`Operation::Update`].
pub type Updater = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// A queued mutation.
#[derive(Clone)]
pub enum Operation {
    Put {
        collection: String,
        id: String,
        data: Value,
    },
    Update {
        collection: String,
        id: String,
        updater: Updater,
    },
    Delete {
        collection: String,
        id: String,
    },
    CreateCollection {
        collection: String,
    },
    DropCollection {
        collection: String,
    },
}

impl Operation {
    pub fn collection(&self) -> &str {
        match self {
            Self::Put { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. }
            | Self::CreateCollection { collection }
            | Self::DropCollection { collection } => collection,
        }
    }

    async fn apply(&self, store: &DocumentStore) -> DbResult<()> {
        match self {
            Self::Put {
                collection,
                id,
                data,
            } => store.put(collection, id, data.clone()).await,
            Self::Update {
                collection,
                id,
                updater,
            } => store
                .update(collection, id, |v| updater(v))
                .await
                .map(|_| ()),
            Self::Delete { collection, id } => store.delete(collection, id).await.map(|_| ()),
            Self::CreateCollection { collection } => store.create_collection(collection).await,
            Self::DropCollection { collection } => {
                store.drop_collection(collection).await.map(|_| ())
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put { collection, id, .. } => write!(f, "put {collection}/{id}"),
            Self::Update { collection, id, .. } => write!(f, "update {collection}/{id}"),
            Self::Delete { collection, id } => write!(f, "delete {collection}/{id}"),
            Self::CreateCollection { collection } => write!(f, "create collection {collection}"),
            Self::DropCollection { collection } => write!(f, "drop collection {collection}"),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operation({self})")
    }
}

/// Ordered queue of mutations executed one at a time by [`commit`].
///
/// Not atomic and not compensating. If operation `k` fails, operations
/// before it stay applied, the rest are not attempted, and the queue keeps
/// every operation so the caller can inspect or resubmit it. The queue is
/// only emptied by a fully successful commit or by [`clear`].
///
/// [`commit`]: TransactionQueue::commit
/// [`clear`]: TransactionQueue::clear
#[derive(Clone, Debug)]
pub struct TransactionQueue {
    store: DocumentStore,
    operations: Vec<Operation>,
}

impl TransactionQueue {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            operations: Vec::new(),
        }
    }

    pub fn push(&mut self, operation: Operation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    pub fn put(&mut self, collection: impl Into<String>, id: impl Into<String>, data: Value) -> &mut Self {
        self.push(Operation::Put {
            collection: collection.into(),
            id: id.into(),
            data,
        })
    }

    pub fn update<F>(&mut self, collection: impl Into<String>, id: impl Into<String>, updater: F) -> &mut Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.push(Operation::Update {
            collection: collection.into(),
            id: id.into(),
            updater: Arc::new(updater),
        })
    }

    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) -> &mut Self {
        self.push(Operation::Delete {
            collection: collection.into(),
            id: id.into(),
        })
    }

    pub fn create_collection(&mut self, collection: impl Into<String>) -> &mut Self {
        self.push(Operation::CreateCollection {
            collection: collection.into(),
        })
    }

    pub fn drop_collection(&mut self, collection: impl Into<String>) -> &mut Self {
        self.push(Operation::DropCollection {
            collection: collection.into(),
        })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Run every queued operation in order. Returns how many ran.
    pub async fn commit(&mut self) -> DbResult<usize> {
        let total = self.operations.len();
        for (index, operation) in self.operations.iter().enumerate() {
            if let Err(e) = operation.apply(&self.store).await {
                warn!(index, total, operation = %operation, error = %e, "transaction aborted");
                return Err(DbError::Transaction {
                    index,
                    total,
                    source: Box::new(e),
                });
            }
            debug!(index, operation = %operation, "transaction step applied");
        }
        self.operations.clear();
        debug!(total, "transaction committed");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use serde_json::json;

    fn store() -> DocumentStore {
        DocumentStore::in_memory("pw", VaultConfig::default().with_kdf_iterations(10)).unwrap()
    }

    fn bump(v: Value) -> Value {
        let mut v = v;
        let next = v.get("n").and_then(Value::as_f64).unwrap_or(0.0) + 1.0;
        if let Some(map) = v.as_object_mut() {
            map.insert("n".into(), Value::from(next));
        }
        v
    }

    #[tokio::test]
    async fn commit_runs_in_order_and_clears() {
        let store = store();
        let mut tx = store.transaction();
        tx.create_collection("c")
            .put("c", "a", Value::from(json!({"n": 1})))
            .update("c", "a", bump)
            .put("c", "b", Value::object())
            .delete("c", "b");
        assert_eq!(tx.len(), 5);

        assert_eq!(tx.commit().await.unwrap(), 5);
        assert!(tx.is_empty());
        assert_eq!(store.get("c", "a").await.unwrap().get("n"), Some(&Value::from(2)));
        assert!(!store.exists("c", "b").await.unwrap());
    }

    #[tokio::test]
    async fn failure_keeps_prior_effects_and_queue() {
        let store = store();
        let mut tx = store.transaction();
        tx.put("c", "first", Value::object())
            .update("c", "missing", bump)
            .put("c", "never", Value::object());

        let err = tx.commit().await.unwrap_err();
        match &err {
            DbError::Transaction { index, total, source } => {
                assert_eq!((*index, *total), (1, 3));
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.exists("c", "first").await.unwrap());
        assert!(!store.exists("c", "never").await.unwrap());
        assert_eq!(tx.len(), 3);
    }

    #[tokio::test]
    async fn resubmit_after_fixing_cause() {
        let store = store();
        let mut tx = store.transaction();
        tx.put("c", "x", Value::object()).update("c", "y", bump);
        assert!(tx.commit().await.is_err());

        store.put("c", "y", Value::from(json!({"n": 10}))).await.unwrap();
        assert_eq!(tx.commit().await.unwrap(), 2);
        assert_eq!(store.get("c", "y").await.unwrap().get("n"), Some(&Value::from(11)));
    }

    #[tokio::test]
    async fn empty_commit_is_noop() {
        let mut tx = store().transaction();
        assert_eq!(tx.commit().await.unwrap(), 0);
    }

    #[test]
    fn clear_and_describe() {
        let mut tx = store().transaction();
        tx.drop_collection("old").delete("c", "z");
        let names: Vec<String> = tx.operations().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["drop collection old", "delete c/z"]);
        assert_eq!(tx.operations()[1].collection(), "c");
        tx.clear();
        assert!(tx.is_empty());
    }
}
