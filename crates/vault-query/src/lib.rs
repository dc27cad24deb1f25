//! Filter evaluation and query pipelines for Vault.
//!
//! A [`Filter`] is a single predicate `(field path, operator, operand)`
//! evaluated against a document's [`Value`](vault_types::Value). Type
//! mismatches fail closed: the predicate is `false`, never an error, so a
//! heterogeneous collection stays queryable.
//!
//! A [`Query`] AND-combines filters and adds ordering, offset and limit.
//! Evaluation order is fixed: filter → sort → offset → limit.

pub mod error;
pub mod filter;
pub mod operator;
pub mod query;

pub use error::{QueryError, QueryResult};
pub use filter::Filter;
pub use operator::Operator;
pub use query::{Query, QueryBuilder, SortOrder};
