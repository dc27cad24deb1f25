use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vault_types::{FieldPath, Value, ValueKind};

/// Expected shape of a single field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub kind: ValueKind,
    #[serde(default)]
    pub required: bool,
    /// Accept an explicit `null` in place of `kind`.
    #[serde(default)]
    pub nullable: bool,
}

/// Optional per-collection field contract, checked before every write.
///
/// Fields not named in the schema are unconstrained.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    fields: BTreeMap<String, FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field.
    pub fn required(mut self, path: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(
            path.into(),
            FieldRule {
                kind,
                required: true,
                nullable: false,
            },
        );
        self
    }

    /// Declare a field that may be absent.
    pub fn optional(mut self, path: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(
            path.into(),
            FieldRule {
                kind,
                required: false,
                nullable: false,
            },
        );
        self
    }

    pub fn rule(mut self, path: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(path.into(), rule);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(path, rule)| (path.as_str(), rule))
    }

    /// Check `data` against every declared field. Returns the first
    /// violation found, in field-path order.
    pub fn check(&self, data: &Value) -> Result<(), String> {
        for (path, rule) in &self.fields {
            match data.resolve(&FieldPath::parse(path)) {
                None if rule.required => {
                    return Err(format!("missing required field {path:?}"));
                }
                None => {}
                Some(value) if value.is_null() && rule.nullable => {}
                Some(value) if value.kind() != rule.kind => {
                    return Err(format!(
                        "field {path:?} must be {}, found {}",
                        rule.kind,
                        value.kind()
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
