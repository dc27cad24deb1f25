//! Collection and document-id validation.
//!
//! Names become path segments in the blob store, so they follow the same
//! conservative rules everywhere:
//! - Must be non-empty
//! - Must not contain `/`, `\`, whitespace other than a plain space, or
//!   control characters
//! - Must not contain `..`
//! - Must not start with `.` (reserved for placeholders)
//!
//! Document ids additionally must not end with the store's own extensions
//! (`.json`, `.enc`), which would make the id ambiguous when listing.

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\t', '\n', '\r'];

/// Suffixes owned by the store's path layout.
const RESERVED_SUFFIXES: &[&str] = &[".json", ".enc"];

fn validate_name(kind: &'static str, name: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty".into()));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(format!("contains forbidden character: {ch:?}")));
        }
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(invalid(format!("contains control character: {ch:?}")));
    }

    if name.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }

    if name.starts_with('.') {
        return Err(invalid("must not start with '.'".into()));
    }

    Ok(())
}

/// Validate a collection name.
///
/// ```
/// use vault_types::validate_collection_name;
///
/// assert!(validate_collection_name("users").is_ok());
/// assert!(validate_collection_name("_meta").is_ok());
/// assert!(validate_collection_name("a/b").is_err());
/// ```
pub fn validate_collection_name(name: &str) -> Result<(), TypeError> {
    validate_name("collection", name)
}

/// Validate a document id.
pub fn validate_document_id(id: &str) -> Result<(), TypeError> {
    validate_name("document id", id)?;
    for suffix in RESERVED_SUFFIXES {
        if id.ends_with(suffix) {
            return Err(TypeError::InvalidName {
                kind: "document id",
                name: id.to_string(),
                reason: format!("must not end with {suffix:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_collection_name("users").is_ok());
        assert!(validate_collection_name("audit-log_2025").is_ok());
        assert!(validate_document_id("0192f7c4-8a1e-7b3c").is_ok());
        assert!(validate_document_id("alice smith").is_ok());
        assert!(validate_document_id("v1.0").is_ok());
    }

    #[test]
    fn reject_empty() {
        assert!(validate_collection_name("").is_err());
        assert!(validate_document_id("").is_err());
    }

    #[test]
    fn reject_separators() {
        assert!(validate_collection_name("a/b").is_err());
        assert!(validate_document_id("a\\b").is_err());
    }

    #[test]
    fn reject_traversal_and_hidden() {
        assert!(validate_document_id("..").is_err());
        assert!(validate_document_id("a..b").is_err());
        assert!(validate_collection_name(".placeholder").is_err());
    }

    #[test]
    fn reject_control_characters() {
        assert!(validate_document_id("a\u{0}b").is_err());
        assert!(validate_document_id("line\nbreak").is_err());
    }

    #[test]
    fn reject_store_extensions_in_ids() {
        assert!(validate_document_id("doc.json").is_err());
        assert!(validate_document_id("doc.json.enc").is_err());
        // Collections may carry any suffix.
        assert!(validate_collection_name("exports.json").is_ok());
    }

    #[test]
    fn error_names_kind() {
        let err = validate_document_id("").unwrap_err();
        assert!(err.to_string().starts_with("invalid document id name"));
    }
}
