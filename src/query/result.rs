//! Query results
//!
//! A leaf query yields a scalar rate or a flat series; a wildcard query yields
//! a tree of those keyed by the names the wildcard expanded to.

use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregated value returned by a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// Counter total divided by (samples × interval)
    Rate(f64),
    /// Series samples concatenated in ascending timestamp order
    Series(Vec<serde_json::Value>),
    /// Wildcard expansion: child name → sub-result
    Tree(BTreeMap<String, QueryValue>),
}

impl QueryValue {
    pub fn as_rate(&self) -> Option<f64> {
        match self {
            QueryValue::Rate(rate) => Some(*rate),
            _ => None,
        }
    }

    /// Sub-result under `name` of a wildcard expansion
    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        match self {
            QueryValue::Tree(branches) => branches.get(name),
            _ => None,
        }
    }
}
