use std::cmp::Ordering;

use vault_types::{Document, FieldPath, Value};

use crate::error::QueryResult;
use crate::filter::Filter;
use crate::operator::Operator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A conjunction of filters plus ordering and pagination.
///
/// An empty filter list matches every document. A `limit` of `Some(0)` is
/// treated as unbounded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order_by: Option<FieldPath>,
    order: SortOrder,
    offset: usize,
    limit: Option<usize>,
}

impl Query {
    /// A query with no filters, ordering or pagination.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order_by(&self) -> Option<&FieldPath> {
        self.order_by.as_ref()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Effective limit; `None` means unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }

    /// Replace the limit, keeping filters, ordering and offset.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validate every filter.
    pub fn validate(&self) -> QueryResult<()> {
        self.filters.iter().try_for_each(Filter::validate)
    }

    /// True when every filter matches `data`.
    pub fn matches(&self, data: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(data))
    }

    /// Run the pipeline: filter, then sort, then offset, then limit.
    pub fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(&doc.data))
            .collect();

        if let Some(path) = &self.order_by {
            let order = self.order;
            merge_sort_by(&mut matched, &|a: &Document, b: &Document| {
                let ordering = sort_key_cmp(a.data.resolve(path), b.data.resolve(path));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        let paged = matched.into_iter().skip(self.offset);
        match self.limit() {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        }
    }
}

/// Incomparable keys (missing, mixed types, booleans) compare as equal so
/// their relative input order is kept.
fn sort_key_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

/// Stable top-down merge sort.
///
/// The key comparator is not a total order, which `slice::sort_by` is
/// allowed to panic on.
fn merge_sort_by<T, F>(items: &mut Vec<T>, cmp: &F)
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return;
    }
    let mut right = items.split_off(items.len() / 2);
    merge_sort_by(items, cmp);
    merge_sort_by(&mut right, cmp);

    let left = std::mem::take(items);
    items.reserve(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        items.extend(next);
    }
}

/// Fluent builder for [`Query`].
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query.filters.push(filter);
        self
    }

    pub fn where_op(self, path: impl Into<FieldPath>, op: Operator, operand: impl Into<Value>) -> Self {
        self.filter(Filter::new(path, op, operand))
    }

    pub fn where_unary(self, path: impl Into<FieldPath>, op: Operator) -> Self {
        self.filter(Filter::unary(path, op))
    }

    pub fn order_by(mut self, path: impl Into<FieldPath>, order: SortOrder) -> Self {
        self.query.order_by = Some(path.into());
        self.query.order = order;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(id: &str, data: serde_json::Value) -> Document {
        Document::new(id, Value::from(data)).unwrap()
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    fn people() -> Vec<Document> {
        vec![
            doc("a", json!({"age": 20})),
            doc("b", json!({"age": 30})),
            doc("c", json!({"age": 25})),
            doc("d", json!({"age": 40})),
        ]
    }

    #[test]
    fn empty_query_matches_everything() {
        let result = Query::all().apply(people());
        assert_eq!(ids(&result), ["a", "b", "c", "d"]);
    }

    #[test]
    fn pipeline_order_is_filter_sort_offset_limit() {
        let query = Query::builder()
            .where_op("age", Operator::GreaterThan, 18)
            .order_by("age", SortOrder::Descending)
            .offset(1)
            .limit(1)
            .build();
        let result = query.apply(vec![
            doc("x", json!({"age": 20})),
            doc("y", json!({"age": 30})),
            doc("z", json!({"age": 40})),
        ]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].data, Value::from(json!({"age": 30})));
    }

    #[test]
    fn filters_are_conjunctive() {
        let query = Query::builder()
            .filter(Filter::gte("age", 25))
            .filter(Filter::lt("age", 40))
            .build();
        assert_eq!(ids(&query.apply(people())), ["b", "c"]);
    }

    #[test]
    fn ascending_sort() {
        let query = Query::builder().order_by("age", SortOrder::Ascending).build();
        assert_eq!(ids(&query.apply(people())), ["a", "c", "b", "d"]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let docs = vec![
            doc("1", json!({"k": 1, "n": "first"})),
            doc("2", json!({"k": 0})),
            doc("3", json!({"k": 1, "n": "second"})),
            doc("4", json!({"k": 1, "n": "third"})),
        ];
        let query = Query::builder().order_by("k", SortOrder::Descending).build();
        assert_eq!(ids(&query.apply(docs)), ["1", "3", "4", "2"]);
    }

    #[test]
    fn incomparable_keys_keep_input_order() {
        let docs = vec![
            doc("str", json!({"k": "x"})),
            doc("none", json!({})),
            doc("num", json!({"k": 1})),
            doc("bool", json!({"k": true})),
        ];
        let query = Query::builder().order_by("k", SortOrder::Ascending).build();
        assert_eq!(ids(&query.apply(docs)), ["str", "none", "num", "bool"]);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let query = Query::builder().offset(10).build();
        assert!(query.apply(people()).is_empty());
    }

    #[test]
    fn zero_limit_is_unbounded() {
        let query = Query::builder().limit(0).build();
        assert_eq!(query.limit(), None);
        assert_eq!(query.apply(people()).len(), 4);
    }

    #[test]
    fn validate_propagates_filter_errors() {
        let ok = Query::builder().where_op("a", Operator::Equal, 1).build();
        assert!(ok.validate().is_ok());
        let bad = Query::builder().where_unary("a", Operator::LessThan).build();
        assert!(bad.validate().is_err());
    }

    proptest! {
        #[test]
        fn merge_sort_matches_stable_std_sort(values in proptest::collection::vec(0i32..8, 0..64)) {
            let mut tagged: Vec<(i32, usize)> = values.iter().copied().zip(0..).collect();
            let mut expected = tagged.clone();
            expected.sort_by_key(|(v, _)| *v);
            merge_sort_by(&mut tagged, &|a: &(i32, usize), b: &(i32, usize)| a.0.cmp(&b.0));
            prop_assert_eq!(tagged, expected);
        }

        #[test]
        fn limit_bounds_result(limit in 1usize..6, offset in 0usize..6) {
            let query = Query::builder().offset(offset).limit(limit).build();
            let result = query.apply(people());
            prop_assert!(result.len() <= limit);
            prop_assert_eq!(result.len(), people().len().saturating_sub(offset).min(limit));
        }
    }
}
