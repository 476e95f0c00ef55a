//! Query Executor
//!
//! Walks the PathTree read-only along a key pattern and aggregates the samples
//! of each key node it reaches.
//!
//! # Execution
//!
//! ```text
//! literal   → follow one child, absent if missing
//! *         → key node with samples: aggregate here
//!             otherwise: expand every child, keep non-absent results
//! (end)     → aggregate the key node's samples
//! ```
//!
//! Aggregation reports counters as a rate, `sum / (samples × interval)`, and
//! concatenates series in ascending timestamp order.

use std::collections::BTreeMap;

use crate::query::ast::{Query, Segment, TimestampFilter};
use crate::query::error::{QueryError, QueryResult};
use crate::query::result::QueryValue;
use crate::storage::{NodeId, PathTree, Value};

/// Executes queries against a borrowed tree.
///
/// The caller holds whatever lock guards the tree for the executor's lifetime.
pub struct QueryExecutor<'a> {
    tree: &'a PathTree,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(tree: &'a PathTree) -> Self {
        Self { tree }
    }

    /// Run a query; `Ok(None)` means nothing matched
    pub fn execute(&self, query: &Query) -> QueryResult<Option<QueryValue>> {
        query.validate()?;
        let mut path = Vec::new();
        self.resolve(self.tree.root(), query.pattern.segments(), query, &mut path)
    }

    fn resolve(
        &self,
        node: NodeId,
        remaining: &[Segment],
        query: &Query,
        path: &mut Vec<String>,
    ) -> QueryResult<Option<QueryValue>> {
        let Some((segment, rest)) = remaining.split_first() else {
            return self.aggregate(node, &query.filter, query.interval_secs, path);
        };

        match segment {
            Segment::Literal(name) => match self.tree.child(node, name) {
                Some(child) => {
                    path.push(name.clone());
                    let result = self.resolve(child, rest, query, path);
                    path.pop();
                    result
                }
                None => Ok(None),
            },
            Segment::Wildcard => {
                // A wildcard spans exactly one level: stop at the key node
                if self.tree.has_samples(node) {
                    return self.aggregate(node, &query.filter, query.interval_secs, path);
                }

                let mut branches = BTreeMap::new();
                for (name, child) in self.tree.children(node) {
                    path.push(name.to_string());
                    let result = self.resolve(child, rest, query, path);
                    path.pop();
                    if let Some(value) = result? {
                        branches.insert(name.to_string(), value);
                    }
                }

                if branches.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(QueryValue::Tree(branches)))
                }
            }
        }
    }

    fn aggregate(
        &self,
        node: NodeId,
        filter: &TimestampFilter,
        interval_secs: f64,
        path: &[String],
    ) -> QueryResult<Option<QueryValue>> {
        let mut samples: Vec<_> = self
            .tree
            .samples(node)
            .filter(|(timestamp, _)| filter.admits(*timestamp))
            .collect();

        samples.sort_by_key(|(timestamp, _)| *timestamp);
        let Some((_, first)) = samples.first() else {
            return Ok(None);
        };

        let conflict = || QueryError::TypeConflict {
            path: path.join("."),
        };

        match first {
            Value::Counter(_) => {
                let mut total: i64 = 0;
                for (_, value) in &samples {
                    match value {
                        Value::Counter(n) => total = total.saturating_add(*n),
                        Value::Series(_) => return Err(conflict()),
                    }
                }
                let rate = total as f64 / (samples.len() as f64 * interval_secs);
                Ok(Some(QueryValue::Rate(rate)))
            }
            Value::Series(_) => {
                let mut items = Vec::new();
                for (_, value) in &samples {
                    match value {
                        Value::Series(chunk) => items.extend(chunk.iter().cloned()),
                        Value::Counter(_) => return Err(conflict()),
                    }
                }
                Ok(Some(QueryValue::Series(items)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Timestamp;
    use serde_json::json;

    fn put(tree: &mut PathTree, key: &str, ts: i64, value: Value) {
        let segments: Vec<&str> = key.split('.').collect();
        let node = tree.ensure_path(&segments).unwrap();
        tree.upsert_sample(node, key, Timestamp::new(ts), value).unwrap();
    }

    fn run(tree: &PathTree, query: Query) -> Option<QueryValue> {
        QueryExecutor::new(tree).execute(&query).unwrap()
    }

    #[test]
    fn test_counter_rate() {
        let mut tree = PathTree::new();
        put(&mut tree, "k", 100, Value::counter(2));
        put(&mut tree, "k", 100, Value::counter(3));

        let result = run(&tree, Query::parse("k").unwrap().interval(1.0));
        assert_eq!(result, Some(QueryValue::Rate(5.0)));
    }

    #[test]
    fn test_counter_rate_averages_over_samples() {
        let mut tree = PathTree::new();
        put(&mut tree, "k", 100, Value::counter(4));
        put(&mut tree, "k", 105, Value::counter(6));

        let result = run(&tree, Query::parse("k").unwrap().interval(2.0));
        assert_eq!(result, Some(QueryValue::Rate(2.5)));
    }

    #[test]
    fn test_series_concatenated_by_timestamp() {
        let mut tree = PathTree::new();
        put(&mut tree, "s", 1_000_000_010, Value::series([json!(3)]));
        put(&mut tree, "s", 999_999_995, Value::series([json!(1)]));
        put(&mut tree, "s", 1_000_000_000, Value::series([json!(2)]));

        let result = run(&tree, Query::parse("s").unwrap());
        assert_eq!(
            result,
            Some(QueryValue::Series(vec![json!(1), json!(2), json!(3)]))
        );
    }

    #[test]
    fn test_timestamp_filter() {
        let mut tree = PathTree::new();
        put(&mut tree, "s", 100, Value::series([json!(1)]));
        put(&mut tree, "s", 101, Value::series([json!(2)]));

        let query = Query::parse("s")
            .unwrap()
            .filter(TimestampFilter::only([Timestamp::new(100)]));
        assert_eq!(run(&tree, query), Some(QueryValue::Series(vec![json!(1)])));

        let query = Query::parse("s")
            .unwrap()
            .filter(TimestampFilter::only([Timestamp::new(200)]));
        assert_eq!(run(&tree, query), None);
    }

    #[test]
    fn test_wildcard_expands_one_level() {
        let mut tree = PathTree::new();
        put(&mut tree, "cart.veg.basket1", 100, Value::counter(10));
        put(&mut tree, "cart.fruit.basket1", 100, Value::counter(20));
        put(&mut tree, "cart.fruit.basket2", 100, Value::counter(30));

        let result = run(&tree, Query::parse("cart.*.basket1").unwrap().interval(1.0)).unwrap();
        assert_eq!(result.get("veg").and_then(QueryValue::as_rate), Some(10.0));
        assert_eq!(result.get("fruit").and_then(QueryValue::as_rate), Some(20.0));

        let result = run(&tree, Query::parse("cart.fruit.*").unwrap().interval(1.0)).unwrap();
        assert_eq!(result.get("basket2").and_then(QueryValue::as_rate), Some(30.0));
    }

    #[test]
    fn test_wildcard_at_key_node_aggregates() {
        let mut tree = PathTree::new();
        put(&mut tree, "k", 100, Value::counter(4));

        let result = run(&tree, Query::parse("k.*").unwrap().interval(1.0));
        assert_eq!(result, Some(QueryValue::Rate(4.0)));
    }

    #[test]
    fn test_missing_paths_are_absent() {
        let mut tree = PathTree::new();
        put(&mut tree, "a.b", 100, Value::counter(1));

        assert_eq!(run(&tree, Query::parse("x").unwrap()), None);
        assert_eq!(run(&tree, Query::parse("a.b.c.d").unwrap()), None);
        assert_eq!(run(&tree, Query::parse("x.*").unwrap()), None);
        assert_eq!(run(&tree, Query::parse("a.*.zzz").unwrap()), None);
        // Intermediate node without samples
        assert_eq!(run(&tree, Query::parse("a").unwrap()), None);
    }

    #[test]
    fn test_mixed_kinds_conflict() {
        let mut tree = PathTree::new();
        put(&mut tree, "m.k", 100, Value::counter(1));
        put(&mut tree, "m.k", 105, Value::series([json!(1)]));

        let err = QueryExecutor::new(&tree)
            .execute(&Query::parse("m.k").unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::TypeConflict {
                path: "m.k".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let tree = PathTree::new();
        let err = QueryExecutor::new(&tree)
            .execute(&Query::parse("k").unwrap().interval(0.0))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidInterval(_)));
    }
}
