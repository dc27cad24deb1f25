use thiserror::Error;

use crate::value::ValueKind;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("document data must be an object, found {found}")]
    NotAnObject { found: ValueKind },

    #[error("cannot descend into {found} at segment {segment:?} of path {path:?}")]
    PathConflict {
        path: String,
        segment: String,
        found: ValueKind,
    },

    #[error("field path must not be empty")]
    EmptyPath,
}
