use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::path::FieldPath;
use crate::value::Value;

/// A document: an object value identified by `id` within its collection.
///
/// The owning collection is not recorded here; identity is the pair
/// (collection, id) and is enforced by the store's path layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Create a document, rejecting non-object data.
    pub fn new(id: impl Into<String>, data: Value) -> Result<Self, TypeError> {
        if !matches!(data, Value::Object(_)) {
            return Err(TypeError::NotAnObject { found: data.kind() });
        }
        Ok(Self {
            id: id.into(),
            data,
        })
    }

    /// Resolve a dotted field path against the document data.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.data.resolve(&FieldPath::from(path))
    }
}
