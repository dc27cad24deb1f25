use thiserror::Error;

use crate::operator::Operator;

/// Errors raised while building queries.
///
/// Evaluation itself never fails; only construction-time validation does.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid regex pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("operator {operator} requires an operand")]
    MissingOperand { operator: Operator },
}

pub type QueryResult<T> = Result<T, QueryError>;
