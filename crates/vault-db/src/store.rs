use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;
use vault_crypto::{Algorithm, Sealer};
use vault_query::Query;
use vault_store::{join_path, BlobStore, InMemoryBlobStore};
use vault_types::{validate_collection_name, validate_document_id, Document, Value};

use crate::bulk::{BulkFetcher, ScanOutcome};
use crate::config::VaultConfig;
use crate::error::{DbError, DbResult};
use crate::schema::Schema;
use crate::transaction::TransactionQueue;

/// File extension for plaintext documents.
pub const PLAINTEXT_EXT: &str = "json";
/// File extension for encrypted documents.
pub const ENCRYPTED_EXT: &str = "json.enc";
/// Zero-length blob that marks an otherwise empty collection.
pub const PLACEHOLDER: &str = ".placeholder";

/// Result of [`DocumentStore::query`].
pub type QueryOutcome = ScanOutcome;

/// Encrypted document store over a [`BlobStore`].
///
/// Documents live at `<base_path>/<collection>/<id>.<ext>`, one blob per
/// document. Writes are last-write-wins: there is no version check, and
/// [`update`](Self::update) is a plain read-modify-write. The blob store is
/// the only synchronization point between concurrent writers.
///
/// Cloning is cheap; clones share the blob store and key material.
#[derive(Clone)]
pub struct DocumentStore {
    blobs: Arc<dyn BlobStore>,
    sealer: Sealer,
    config: Arc<VaultConfig>,
}

impl DocumentStore {
    /// Open a store. Fails if `config` does not validate.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        passphrase: impl Into<String>,
        config: VaultConfig,
    ) -> DbResult<Self> {
        config.validate()?;
        let sealer = Sealer::new(passphrase, config.algorithm).with_iterations(config.kdf_iterations);
        info!(
            base_path = %config.base_path,
            algorithm = %config.algorithm,
            "document store opened"
        );
        Ok(Self {
            blobs,
            sealer,
            config: Arc::new(config),
        })
    }

    /// A store over a fresh [`InMemoryBlobStore`].
    pub fn in_memory(passphrase: impl Into<String>, config: VaultConfig) -> DbResult<Self> {
        Self::new(Arc::new(InMemoryBlobStore::new()), passphrase, config)
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn algorithm(&self) -> Algorithm {
        self.sealer.algorithm()
    }

    pub fn is_encrypted(&self) -> bool {
        self.algorithm().is_encrypted()
    }

    pub fn extension(&self) -> &'static str {
        if self.is_encrypted() {
            ENCRYPTED_EXT
        } else {
            PLAINTEXT_EXT
        }
    }

    pub fn schema(&self, collection: &str) -> Option<&Schema> {
        self.config.schemas.get(collection)
    }

    /// Blob prefix holding every document of `collection`.
    pub fn collection_path(&self, collection: &str) -> DbResult<String> {
        validate_collection_name(collection)?;
        Ok(join_path([self.config.base_path.as_str(), collection]))
    }

    /// Blob path of a single document.
    pub fn document_path(&self, collection: &str, id: &str) -> DbResult<String> {
        let prefix = self.collection_path(collection)?;
        validate_document_id(id)?;
        Ok(format!("{prefix}/{id}.{}", self.extension()))
    }

    /// Start an empty transaction queue bound to this store.
    pub fn transaction(&self) -> TransactionQueue {
        TransactionQueue::new(self.clone())
    }

    /// A bulk fetcher using the configured concurrency.
    pub fn bulk(&self) -> BulkFetcher {
        BulkFetcher::new(self.clone())
    }

    fn message(&self, make: impl FnOnce() -> String) -> Option<String> {
        self.config.commit_messages.then(make)
    }

    // -----------------------------------------------------------------------
    // Single-document operations
    // -----------------------------------------------------------------------

    /// Write `data` as document `id`, replacing any previous content.
    #[instrument(skip(self, data), level = "debug")]
    pub async fn put(&self, collection: &str, id: &str, data: Value) -> DbResult<()> {
        let path = self.document_path(collection, id)?;
        self.check_schema(collection, id, &data)?;
        let bytes = self.encode(collection, id, &data).await?;
        let message = self.message(|| format!("put {collection}/{id}"));
        self.blobs
            .write(&path, &bytes, message.as_deref())
            .await
            .map_err(|e| DbError::storage("write", &path, e))?;
        debug!(collection, id, len = bytes.len(), "document written");
        Ok(())
    }

    /// Write `data` under a freshly generated time-ordered id.
    pub async fn add(&self, collection: &str, data: Value) -> DbResult<String> {
        let id = Uuid::now_v7().to_string();
        self.put(collection, &id, data).await?;
        Ok(id)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, collection: &str, id: &str) -> DbResult<Document> {
        let path = self.document_path(collection, id)?;
        let bytes = self
            .blobs
            .read(&path)
            .await
            .map_err(|e| DbError::storage("read", &path, e))?
            .ok_or_else(|| DbError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let data = self.decode(collection, id, bytes).await?;
        Ok(Document {
            id: id.to_string(),
            data,
        })
    }

    /// Like [`get`](Self::get), but a missing document is `Ok(None)`.
    pub async fn find(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        match self.get(collection, id).await {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self, collection: &str, id: &str) -> DbResult<bool> {
        let path = self.document_path(collection, id)?;
        self.blobs
            .exists(&path)
            .await
            .map_err(|e| DbError::storage("read", &path, e))
    }

    /// Read-modify-write. Not atomic: a concurrent write between the read
    /// and the write is overwritten.
    pub async fn update<F>(&self, collection: &str, id: &str, updater: F) -> DbResult<Document>
    where
        F: FnOnce(Value) -> Value,
    {
        let current = self.get(collection, id).await?;
        let data = updater(current.data);
        self.put(collection, id, data.clone()).await?;
        Ok(Document {
            id: id.to_string(),
            data,
        })
    }

    /// Remove a document. Returns whether a blob was present.
    pub async fn delete(&self, collection: &str, id: &str) -> DbResult<bool> {
        let path = self.document_path(collection, id)?;
        let removed = self
            .blobs
            .delete(&path)
            .await
            .map_err(|e| DbError::storage("delete", &path, e))?;
        debug!(collection, id, removed, "document deleted");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    /// Materialize an empty collection by writing its placeholder blob.
    pub async fn create_collection(&self, collection: &str) -> DbResult<()> {
        let path = join_path([self.collection_path(collection)?.as_str(), PLACEHOLDER]);
        let message = self.message(|| format!("create collection {collection}"));
        self.blobs
            .write(&path, &[], message.as_deref())
            .await
            .map_err(|e| DbError::storage("write", &path, e))?;
        info!(collection, "collection created");
        Ok(())
    }

    /// Delete every blob under the collection prefix, placeholder included.
    ///
    /// Not transactional: a failure part-way leaves the collection partly
    /// emptied. Returns the number of blobs removed.
    pub async fn drop_collection(&self, collection: &str) -> DbResult<usize> {
        let prefix = self.collection_path(collection)?;
        let entries = self
            .blobs
            .list(&prefix)
            .await
            .map_err(|e| DbError::storage("list", &prefix, e))?;
        let mut removed = 0;
        for entry in entries {
            if self
                .blobs
                .delete(&entry.path)
                .await
                .map_err(|e| DbError::storage("delete", &entry.path, e))?
            {
                removed += 1;
            }
        }
        info!(collection, removed, "collection dropped");
        Ok(removed)
    }

    /// Ids of every document in the collection, sorted. Blobs with another
    /// extension (including the placeholder) are ignored.
    pub async fn list_ids(&self, collection: &str) -> DbResult<Vec<String>> {
        let prefix = self.collection_path(collection)?;
        let suffix = format!(".{}", self.extension());
        let entries = self
            .blobs
            .list(&prefix)
            .await
            .map_err(|e| DbError::storage("list", &prefix, e))?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.name.strip_suffix(&suffix).map(str::to_string))
            .filter(|id| !id.is_empty())
            .collect())
    }

    pub async fn count(&self, collection: &str) -> DbResult<usize> {
        Ok(self.list_ids(collection).await?.len())
    }

    /// Fetch every readable document in the collection, sorted by id.
    /// Unreadable documents are reported in `skipped` instead of failing
    /// the scan.
    pub async fn scan_all(&self, collection: &str) -> DbResult<ScanOutcome> {
        let ids = self.list_ids(collection).await?;
        let mut outcome = self.bulk().fetch(collection, ids).await?;
        outcome.documents.sort_by(|a, b| a.id.cmp(&b.id));
        outcome.skipped.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(outcome)
    }

    /// Full scan followed by the query pipeline.
    pub async fn query(&self, collection: &str, query: &Query) -> DbResult<QueryOutcome> {
        let ScanOutcome { documents, skipped } = self.scan_all(collection).await?;
        let scanned = documents.len();
        let documents = query.apply(documents);
        debug!(collection, scanned, matched = documents.len(), "query evaluated");
        Ok(QueryOutcome { documents, skipped })
    }

    /// First result of `query`, honouring its ordering and offset.
    pub async fn find_one(&self, collection: &str, query: &Query) -> DbResult<Option<Document>> {
        let limited = query.clone().with_limit(1);
        Ok(self.query(collection, &limited).await?.documents.into_iter().next())
    }

    /// Fetch specific ids with bounded concurrency. Unreadable or missing
    /// ids are reported in `skipped`.
    pub async fn get_many<I, S>(&self, collection: &str, ids: I) -> DbResult<ScanOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bulk().fetch(collection, ids).await
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    fn check_schema(&self, collection: &str, id: &str, data: &Value) -> DbResult<()> {
        let violation = |reason: String| DbError::SchemaViolation {
            collection: collection.to_string(),
            id: id.to_string(),
            reason,
        };
        if !matches!(data, Value::Object(_)) {
            return Err(violation(format!(
                "document data must be an object, found {}",
                data.kind()
            )));
        }
        match self.schema(collection) {
            Some(schema) => schema.check(data).map_err(violation),
            None => Ok(()),
        }
    }

    async fn encode(&self, collection: &str, id: &str, data: &Value) -> DbResult<Vec<u8>> {
        let plaintext = serde_json::to_vec(data).map_err(|e| DbError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        if !self.is_encrypted() {
            return Ok(plaintext);
        }
        let sealer = self.sealer.clone();
        tokio::task::spawn_blocking(move || sealer.seal(&plaintext))
            .await
            .map_err(|e| DbError::Task(e.to_string()))?
            .map_err(|source| DbError::Encryption {
                collection: collection.to_string(),
                id: id.to_string(),
                source,
            })
    }

    async fn decode(&self, collection: &str, id: &str, bytes: Vec<u8>) -> DbResult<Value> {
        let plaintext = if self.is_encrypted() {
            let sealer = self.sealer.clone();
            tokio::task::spawn_blocking(move || sealer.open(&bytes))
                .await
                .map_err(|e| DbError::Task(e.to_string()))?
                .map_err(|source| DbError::Decryption {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    source,
                })?
        } else {
            bytes
        };
        let malformed = |reason: String| DbError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason,
        };
        let data: Value = serde_json::from_slice(&plaintext).map_err(|e| malformed(e.to_string()))?;
        if !matches!(data, Value::Object(_)) {
            return Err(malformed(format!("expected an object, found {}", data.kind())));
        }
        Ok(data)
    }
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("base_path", &self.config.base_path)
            .field("algorithm", &self.sealer.algorithm())
            .field(
                "schemas",
                &self.config.schemas.keys().collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vault_query::{Filter, SortOrder};
    use vault_types::ValueKind;

    fn config() -> VaultConfig {
        VaultConfig::default().with_kdf_iterations(10)
    }

    fn store() -> (Arc<InMemoryBlobStore>, DocumentStore) {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = DocumentStore::new(blobs.clone(), "correct horse", config()).unwrap();
        (blobs, store)
    }

    fn obj(v: serde_json::Value) -> Value {
        Value::from(v)
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    #[test]
    fn path_layout() {
        let (_, s) = store();
        assert_eq!(s.document_path("users", "alice").unwrap(), "db/users/alice.json.enc");

        let plain =
            DocumentStore::in_memory("x", config().with_algorithm(Algorithm::None)).unwrap();
        assert_eq!(plain.document_path("users", "alice").unwrap(), "db/users/alice.json");
    }

    #[test]
    fn invalid_names_rejected() {
        let (_, s) = store();
        assert!(matches!(s.document_path("../x", "a"), Err(DbError::InvalidName(_))));
        assert!(matches!(s.document_path("users", "a/b"), Err(DbError::InvalidName(_))));
        assert!(matches!(s.document_path("users", "a.json"), Err(DbError::InvalidName(_))));
    }

    #[test]
    fn invalid_config_rejected() {
        let err = DocumentStore::in_memory("x", config().with_bulk_concurrency(0)).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_get_roundtrip_is_encrypted_at_rest() {
        let (blobs, s) = store();
        s.put("users", "alice", obj(json!({"name": "Alice", "age": 30})))
            .await
            .unwrap();

        let doc = s.get("users", "alice").await.unwrap();
        assert_eq!(doc.id, "alice");
        assert_eq!(doc.get("age"), Some(&Value::from(30)));

        let raw = blobs.read("db/users/alice.json.enc").await.unwrap().unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(!raw.contains("Alice"));
        assert!(raw.contains("\"alg\":\"AES-GCM-256\""));
        assert_eq!(
            blobs.last_message("db/users/alice.json.enc").as_deref(),
            Some("put users/alice")
        );
    }

    #[tokio::test]
    async fn plaintext_mode_writes_raw_json() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let s = DocumentStore::new(blobs.clone(), "", config().with_algorithm(Algorithm::None))
            .unwrap();
        s.put("notes", "n1", obj(json!({"text": "hi"}))).await.unwrap();
        let raw = blobs.read("db/notes/n1.json").await.unwrap().unwrap();
        assert_eq!(raw, br#"{"text":"hi"}"#);
        assert_eq!(s.get("notes", "n1").await.unwrap().data, obj(json!({"text": "hi"})));
    }

    #[tokio::test]
    async fn commit_messages_can_be_disabled() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let mut cfg = config();
        cfg.commit_messages = false;
        let s = DocumentStore::new(blobs.clone(), "pw", cfg).unwrap();
        s.put("c", "d", Value::object()).await.unwrap();
        assert_eq!(blobs.last_message("db/c/d.json.enc"), None);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_, s) = store();
        let err = s.get("users", "ghost").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(s.find("users", "ghost").await.unwrap().is_none());
        assert!(!s.exists("users", "ghost").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_passphrase_is_decryption_error() {
        let (blobs, s) = store();
        s.put("users", "a", obj(json!({"x": 1}))).await.unwrap();
        let other = DocumentStore::new(blobs, "wrong", config()).unwrap();
        let err = other.get("users", "a").await.unwrap_err();
        assert!(err.is_decryption());
        assert!(err.to_string().contains("users/a"));
    }

    #[tokio::test]
    async fn non_object_rejected_before_write() {
        let (blobs, s) = store();
        let err = s.put("users", "a", Value::from(5)).await.unwrap_err();
        assert!(matches!(err, DbError::SchemaViolation { .. }));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn schema_enforced_on_write() {
        let cfg = config().with_schema("users", Schema::new().required("name", ValueKind::String));
        let s = DocumentStore::in_memory("pw", cfg).unwrap();
        assert!(s.put("users", "a", obj(json!({"name": "A"}))).await.is_ok());
        let err = s.put("users", "b", obj(json!({"name": 1}))).await.unwrap_err();
        assert!(matches!(err, DbError::SchemaViolation { .. }));
        assert!(!s.exists("users", "b").await.unwrap());
        // Other collections are unconstrained.
        assert!(s.put("pets", "p", obj(json!({"name": 1}))).await.is_ok());
    }

    #[tokio::test]
    async fn update_applies_transform() {
        let (_, s) = store();
        s.put("users", "a", obj(json!({"visits": 1}))).await.unwrap();
        let updated = s
            .update("users", "a", |mut v| {
                if let Some(map) = v.as_object_mut() {
                    map.insert("visits".into(), Value::from(2));
                }
                v
            })
            .await
            .unwrap();
        assert_eq!(updated.get("visits"), Some(&Value::from(2)));
        assert_eq!(s.get("users", "a").await.unwrap().data, updated.data);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let (_, s) = store();
        let err = s.update("users", "none", |v| v).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_, s) = store();
        s.put("users", "a", Value::object()).await.unwrap();
        assert!(s.delete("users", "a").await.unwrap());
        assert!(!s.delete("users", "a").await.unwrap());
    }

    #[tokio::test]
    async fn add_generates_unique_ids() {
        let (_, s) = store();
        let a = s.add("logs", obj(json!({"n": 1}))).await.unwrap();
        let b = s.add("logs", obj(json!({"n": 2}))).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(s.count("logs").await.unwrap(), 2);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    // -----------------------------------------------------------------------
    // Collections and scans
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_and_drop_collection() {
        let (blobs, s) = store();
        s.create_collection("empty").await.unwrap();
        assert!(blobs.exists("db/empty/.placeholder").await.unwrap());
        assert!(s.list_ids("empty").await.unwrap().is_empty());

        s.put("empty", "a", Value::object()).await.unwrap();
        s.put("empty", "b", Value::object()).await.unwrap();
        assert_eq!(s.drop_collection("empty").await.unwrap(), 3);
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn list_ids_strips_extension() {
        let (blobs, s) = store();
        s.put("c", "b", Value::object()).await.unwrap();
        s.put("c", "a", Value::object()).await.unwrap();
        blobs.write("db/c/stray.txt", b"", None).await.unwrap();
        assert_eq!(s.list_ids("c").await.unwrap(), ["a", "b"]);
    }

    #[tokio::test]
    async fn scan_reports_unreadable_documents() {
        let (blobs, s) = store();
        s.put("c", "good", obj(json!({"ok": true}))).await.unwrap();
        blobs.write("db/c/bad.json.enc", b"not an envelope", None).await.unwrap();

        let outcome = s.scan_all("c").await.unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "good");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].id, "bad");
    }

    #[tokio::test]
    async fn undecodable_plaintext_is_malformed() {
        let (blobs, s) = store();
        let sealer = Sealer::new("correct horse", Algorithm::AesGcm256).with_iterations(10);
        s.put("c", "ok", obj(json!({"n": 1}))).await.unwrap();
        blobs
            .write("db/c/text.json.enc", &sealer.seal(b"not json").unwrap(), None)
            .await
            .unwrap();
        blobs
            .write("db/c/list.json.enc", &sealer.seal(b"[1]").unwrap(), None)
            .await
            .unwrap();

        for bad in ["text", "list"] {
            match s.get("c", bad).await.unwrap_err() {
                DbError::Malformed { collection, id, .. } => {
                    assert_eq!(collection, "c");
                    assert_eq!(id, bad);
                }
                other => panic!("unexpected error for {bad}: {other}"),
            }
        }

        let outcome = s.scan_all("c").await.unwrap();
        assert_eq!(outcome.documents.len(), 1);
        let skipped: Vec<&str> = outcome.skipped.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(skipped, ["list", "text"]);
    }

    #[tokio::test]
    async fn garbage_plaintext_blob_is_malformed() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let s = DocumentStore::new(blobs.clone(), "", config().with_algorithm(Algorithm::None))
            .unwrap();
        blobs.write("db/notes/junk.json", b"\xff{oops", None).await.unwrap();

        let err = s.get("notes", "junk").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Malformed { ref collection, ref id, .. } if collection == "notes" && id == "junk"
        ));
        let outcome = s.scan_all("notes").await.unwrap();
        assert!(outcome.documents.is_empty());
        assert_eq!(outcome.skipped[0].id, "junk");
    }

    #[tokio::test]
    async fn query_and_find_one() {
        let (_, s) = store();
        for (id, age) in [("a", 20), ("b", 30), ("c", 40)] {
            s.put("people", id, obj(json!({"age": age}))).await.unwrap();
        }
        let query = Query::builder()
            .filter(Filter::gte("age", 20))
            .order_by("age", SortOrder::Descending)
            .offset(1)
            .limit(1)
            .build();
        let outcome = s.query("people", &query).await.unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].id, "b");

        let youngest = Query::builder().order_by("age", SortOrder::Ascending).build();
        let first = s.find_one("people", &youngest).await.unwrap().unwrap();
        assert_eq!(first.id, "a");

        let none = Query::builder().filter(Filter::gt("age", 99)).build();
        assert!(s.find_one("people", &none).await.unwrap().is_none());
    }

    #[test]
    fn debug_hides_secrets() {
        let (_, s) = store();
        let debug = format!("{s:?}");
        assert!(debug.contains("DocumentStore"));
        assert!(!debug.contains("correct horse"));
    }
}
