//! Core data types for the tas storage engine
//!
//! - `Timestamp`: the Unix-second label a sample is filed under
//! - `Value`: a sample payload, either an accumulating counter or an append-only series
//! - `ValueKind`: the tag of a `Value`, used in conflict reporting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::storage::error::StorageError;

/// Unix time in seconds, the bucket label of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn new(secs: i64) -> Self {
        Self(secs)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub const fn as_secs(self) -> i64 {
        self.0
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Timestamp {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| StorageError::InvalidTimestamp(s.to_string()))
    }
}

/// Tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Counter,
    Series,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Counter => write!(f, "counter"),
            ValueKind::Series => write!(f, "series"),
        }
    }
}

/// Payload of one (key, timestamp) sample
///
/// Serializes untagged: a counter is a JSON integer, a series a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Created by INCR; merges by summing
    Counter(i64),
    /// Created by APPEND; merges by concatenating in arrival order
    Series(Vec<serde_json::Value>),
}

/// Kinds of two values that cannot be merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMismatch {
    pub existing: ValueKind,
    pub incoming: ValueKind,
}

impl Value {
    pub fn counter(delta: i64) -> Self {
        Value::Counter(delta)
    }

    pub fn series(items: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Value::Series(items.into_iter().collect())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Counter(_) => ValueKind::Counter,
            Value::Series(_) => ValueKind::Series,
        }
    }

    /// Merge `incoming` into this value in place.
    ///
    /// On a kind mismatch nothing is modified.
    pub fn merge(&mut self, incoming: Value) -> Result<(), KindMismatch> {
        match (self, incoming) {
            (Value::Counter(total), Value::Counter(delta)) => {
                *total = total.saturating_add(delta);
                Ok(())
            }
            (Value::Series(items), Value::Series(more)) => {
                items.extend(more);
                Ok(())
            }
            (existing, incoming) => Err(KindMismatch {
                existing: existing.kind(),
                incoming: incoming.kind(),
            }),
        }
    }
}
