//! Path-addressed blob storage for Vault.
//!
//! The document store never talks to a storage service directly; it goes
//! through the [`BlobStore`] trait, which models an append/overwrite blob
//! substrate addressed by `/`-separated string paths.
//!
//! # Storage Backends
//!
//! - [`InMemoryBlobStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- maps logical paths onto files under a root directory
//!
//! # Design Rules
//!
//! 1. Writes are create-or-replace; there is no version check.
//! 2. Reading a missing blob is `Ok(None)`, not an error.
//! 3. Deleting a missing blob is `Ok(false)`, not an error.
//! 4. `list` returns direct children of a prefix only, sorted by path.
//! 5. The store never interprets blob contents.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod path;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use path::{join_path, normalize_path};
pub use traits::{BlobEntry, BlobStore};
