//! Encrypted, queryable document store.
//!
//! [`DocumentStore`] maps `(collection, id)` pairs onto blobs in any
//! [`BlobStore`](vault_store::BlobStore), sealing each document in a
//! self-describing envelope before it leaves the process. Collections are
//! path prefixes; there is no index, so queries are a full scan followed by
//! the filter → sort → offset → limit pipeline from `vault-query`.
//!
//! # Guarantees and gaps
//!
//! - Every document is authenticated on read; a wrong passphrase or a
//!   tampered blob is a [`DbError::Decryption`], never garbage data.
//! - Writes are last-write-wins with no version check.
//! - Scans and bulk fetches tolerate unreadable documents and report them
//!   in [`ScanOutcome::skipped`].
//! - [`TransactionQueue`] runs mutations in order but does not roll back.
//!
//! ```no_run
//! use serde_json::json;
//! use vault_db::{DocumentStore, VaultConfig};
//! use vault_query::{Filter, Query};
//!
//! # async fn demo() -> vault_db::DbResult<()> {
//! let store = DocumentStore::in_memory("passphrase", VaultConfig::default())?;
//! store.put("users", "ada", json!({"age": 36}).into()).await?;
//!
//! let adults = Query::builder().filter(Filter::gte("age", 18)).build();
//! let outcome = store.query("users", &adults).await?;
//! assert_eq!(outcome.documents.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;
pub mod transaction;

pub use bulk::{BulkFetcher, ScanOutcome, SkippedDocument};
pub use config::VaultConfig;
pub use error::{DbError, DbResult};
pub use schema::{FieldRule, Schema};
pub use store::{DocumentStore, QueryOutcome, ENCRYPTED_EXT, PLACEHOLDER, PLAINTEXT_EXT};
pub use transaction::{Operation, TransactionQueue, Updater};
