use std::cmp::Ordering;

use regex::Regex;
use tracing::warn;
use vault_types::{FieldPath, Value};

use crate::error::{QueryError, QueryResult};
use crate::operator::Operator;

/// A single predicate over one field of a document.
///
/// Immutable once built. For [`Operator::RegexMatch`] the pattern is
/// compiled at construction; an uncompilable pattern makes the filter
/// match nothing.
#[derive(Clone, Debug)]
pub struct Filter {
    path: FieldPath,
    operator: Operator,
    operand: Option<Value>,
    pattern: Option<Regex>,
}

impl Filter {
    /// Build a binary filter. Regex operands that fail to compile are
    /// logged and fail closed; use [`Filter::regex`] to surface the error.
    pub fn new(path: impl Into<FieldPath>, operator: Operator, operand: impl Into<Value>) -> Self {
        let path = path.into();
        let operand = operand.into();
        let pattern = if operator == Operator::RegexMatch {
            compile_operand(&path, &operand)
        } else {
            None
        };
        Self {
            path,
            operator,
            operand: Some(operand),
            pattern,
        }
    }

    /// Build an operand-less filter (exists, isNull, isEmpty, ...).
    pub fn unary(path: impl Into<FieldPath>, operator: Operator) -> Self {
        Self {
            path: path.into(),
            operator,
            operand: None,
            pattern: None,
        }
    }

    /// Build a regex filter, rejecting invalid patterns.
    pub fn regex(path: impl Into<FieldPath>, pattern: &str) -> QueryResult<Self> {
        let compiled = Regex::new(pattern).map_err(|e| QueryError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::with_regex(path, compiled))
    }

    /// Build a regex filter from an already compiled pattern.
    pub fn with_regex(path: impl Into<FieldPath>, pattern: Regex) -> Self {
        Self {
            path: path.into(),
            operator: Operator::RegexMatch,
            operand: Some(Value::from(pattern.as_str())),
            pattern: Some(pattern),
        }
    }

    pub fn eq(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::Equal, value)
    }

    pub fn ne(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::NotEqual, value)
    }

    pub fn gt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::GreaterThan, value)
    }

    pub fn gte(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::GreaterThanOrEqual, value)
    }

    pub fn lt(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::LessThan, value)
    }

    pub fn lte(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::LessThanOrEqual, value)
    }

    pub fn between(path: impl Into<FieldPath>, lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self::new(path, Operator::Between, Value::Array(vec![lo.into(), hi.into()]))
    }

    pub fn is_in(path: impl Into<FieldPath>, values: Vec<Value>) -> Self {
        Self::new(path, Operator::In, Value::Array(values))
    }

    pub fn array_contains(path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Self::new(path, Operator::ArrayContains, value)
    }

    pub fn exists(path: impl Into<FieldPath>) -> Self {
        Self::unary(path, Operator::Exists)
    }

    pub fn is_null(path: impl Into<FieldPath>) -> Self {
        Self::unary(path, Operator::IsNull)
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand(&self) -> Option<&Value> {
        self.operand.as_ref()
    }

    /// Reject filters that can never match because they are malformed: a
    /// binary operator without an operand, or an uncompilable pattern.
    pub fn validate(&self) -> QueryResult<()> {
        if !self.operator.is_unary() && self.operand.is_none() {
            return Err(QueryError::MissingOperand {
                operator: self.operator,
            });
        }
        if self.operator == Operator::RegexMatch && self.pattern.is_none() {
            let pattern = self.operand.as_ref().map(Value::to_string).unwrap_or_default();
            return Err(QueryError::InvalidPattern {
                pattern,
                reason: "pattern did not compile".into(),
            });
        }
        Ok(())
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Value) -> bool {
        let resolved = doc.resolve(&self.path);
        let operand = self.operand.as_ref();

        match self.operator {
            Operator::Exists => resolved.is_some(),
            Operator::NotExists => resolved.is_none(),
            Operator::IsNull => resolved.is_some_and(Value::is_null),
            Operator::IsNotNull => resolved.is_some_and(|v| !v.is_null()),
            Operator::IsEmpty => resolved
                .and_then(Value::collection_len)
                .is_some_and(|len| len == 0),
            Operator::IsNotEmpty => resolved
                .and_then(Value::collection_len)
                .is_some_and(|len| len > 0),

            // A missing field is not equal to, and not a member of, anything.
            Operator::NotEqual => match (resolved, operand) {
                (Some(left), Some(right)) => left != right,
                (None, Some(_)) => true,
                (_, None) => false,
            },
            Operator::NotIn => match (resolved, operand.and_then(Value::as_array)) {
                (Some(left), Some(items)) => !items.contains(left),
                (None, Some(_)) => true,
                (_, None) => false,
            },

            _ => match (resolved, operand) {
                (Some(left), Some(right)) => self.matches_binary(left, right),
                _ => false,
            },
        }
    }

    fn matches_binary(&self, left: &Value, right: &Value) -> bool {
        match self.operator {
            Operator::Equal => left == right,
            Operator::GreaterThan => left.compare(right) == Some(Ordering::Greater),
            Operator::GreaterThanOrEqual => {
                matches!(left.compare(right), Some(Ordering::Greater | Ordering::Equal))
            }
            Operator::LessThan => left.compare(right) == Some(Ordering::Less),
            Operator::LessThanOrEqual => {
                matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal))
            }
            Operator::ArrayContains => left.as_array().is_some_and(|items| items.contains(right)),
            Operator::ArrayContainsAny => match (left.as_array(), right.as_array()) {
                (Some(items), Some(wanted)) => wanted.iter().any(|w| items.contains(w)),
                _ => false,
            },
            Operator::ContainsAll => match (left.as_array(), right.as_array()) {
                (Some(items), Some(wanted)) => wanted.iter().all(|w| items.contains(w)),
                _ => false,
            },
            Operator::In => right.as_array().is_some_and(|items| items.contains(left)),
            Operator::StartsWith => str_pair(left, right).is_some_and(|(l, r)| l.starts_with(r)),
            Operator::EndsWith => str_pair(left, right).is_some_and(|(l, r)| l.ends_with(r)),
            Operator::StringContains => str_pair(left, right).is_some_and(|(l, r)| l.contains(r)),
            Operator::RegexMatch => match (left.as_str(), &self.pattern) {
                (Some(text), Some(pattern)) => pattern.is_match(text),
                _ => false,
            },
            Operator::Between => match right.as_array() {
                Some([lo, hi]) => {
                    matches!(left.compare(lo), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(left.compare(hi), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
            // Handled in `matches`.
            Operator::NotEqual
            | Operator::NotIn
            | Operator::Exists
            | Operator::NotExists
            | Operator::IsNull
            | Operator::IsNotNull
            | Operator::IsEmpty
            | Operator::IsNotEmpty => false,
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.operator == other.operator && self.operand == other.operand
    }
}

fn str_pair<'a>(left: &'a Value, right: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((left.as_str()?, right.as_str()?))
}

fn compile_operand(path: &FieldPath, operand: &Value) -> Option<Regex> {
    let Some(source) = operand.as_str() else {
        warn!(path = %path, "regexMatch operand is not a string; filter matches nothing");
        return None;
    };
    match Regex::new(source) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(path = %path, pattern = source, error = %e, "invalid regex; filter matches nothing");
            None
        }
    }
}
