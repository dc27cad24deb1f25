use std::fmt;

use serde::{Deserialize, Serialize};

/// A dotted path into nested objects, e.g. `"profile.address.city"`.
///
/// Paths are split on `.` once at construction. An empty string yields a
/// path with no segments, which never resolves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Self {
        let segments = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split('.').map(str::to_string).collect()
        };
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for FieldPath {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_dots() {
        let path = FieldPath::parse("a.b.c");
        assert_eq!(path.segments(), ["a", "b", "c"]);
        assert_eq!(path.to_string(), "a.b.c");
    }

    #[test]
    fn empty_string_has_no_segments() {
        assert!(FieldPath::parse("").is_empty());
    }

    #[test]
    fn serializes_as_plain_string() {
        let path = FieldPath::from("user.age");
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"user.age\"");
        let back: FieldPath = serde_json::from_str("\"user.age\"").unwrap();
        assert_eq!(back, path);
    }
}
