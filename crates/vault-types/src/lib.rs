//! Foundation types for Vault.
//!
//! This crate provides the value model shared by the query engine and the
//! document store. Every other Vault crate that touches document content
//! depends on `vault-types`.
//!
//! # Key Types
//!
//! - [`Value`]: Closed tagged value (null/bool/number/string/array/object)
//! - [`Number`]: JSON number that compares numerically across int/float
//! - [`FieldPath`]: Dotted path into nested objects (`"profile.address.city"`)
//! - [`Document`]: An `(id, object)` pair owned by a collection
//!
//! Missing keys and present-but-null values are distinct: [`Value::resolve`]
//! returns `None` for the former and `Some(&Value::Null)` for the latter.

pub mod document;
pub mod error;
pub mod names;
pub mod path;
pub mod value;

pub use document::Document;
pub use error::TypeError;
pub use names::{validate_collection_name, validate_document_id};
pub use path::FieldPath;
pub use value::{Number, Value, ValueKind};
