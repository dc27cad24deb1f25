use crate::error::{StoreError, StoreResult};

/// Normalize a logical blob path.
///
/// Leading and trailing `/` are stripped. Empty components (`a//b`) and
/// relative components (`.`, `..`) are rejected. The empty path is allowed
/// and denotes the root prefix.
pub fn normalize_path(path: &str) -> StoreResult<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    for component in trimmed.split('/') {
        let reason = match component {
            "" => "empty path component",
            "." | ".." => "relative path component",
            _ => continue,
        };
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        });
    }
    Ok(trimmed.to_string())
}

/// Join path segments with `/`, skipping empty segments.
pub fn join_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_slashes() {
        assert_eq!(normalize_path("/db/users/").unwrap(), "db/users");
        assert_eq!(normalize_path("").unwrap(), "");
        assert_eq!(normalize_path("/").unwrap(), "");
    }

    #[test]
    fn rejects_bad_components() {
        assert!(normalize_path("a//b").is_err());
        assert!(normalize_path("a/../b").is_err());
        assert!(normalize_path("./a").is_err());
    }

    #[test]
    fn hidden_names_are_fine() {
        assert_eq!(normalize_path("db/users/.placeholder").unwrap(), "db/users/.placeholder");
    }

    #[test]
    fn join_skips_empty() {
        assert_eq!(join_path(["", "users", "a.json"]), "users/a.json");
        assert_eq!(join_path(["db/", "/users"]), "db/users");
    }
}
