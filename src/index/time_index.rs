//! Time Index - bucket → key → sample locator
//!
//! Secondary two-level structure over the PathTree. The outer level is an
//! ordered map of timestamp buckets, the inner level maps the full dotted key
//! to the [`NodeId`] of the sample node written for that (key, bucket).
//!
//! The index never owns values. Its only job is to answer "which sample nodes
//! belong to bucket T" without scanning the tree.
//!
//! # Performance
//! - Record: O(log b) where b = live buckets
//! - Bucket enumeration: O(k) where k = keys written in the bucket
//! - Expired-bucket search: O(log b + e) where e = expired buckets

use std::collections::{BTreeMap, HashMap};

use crate::index::BucketCount;
use crate::storage::{NodeId, Timestamp};

/// Ordered bucket index holding non-owning sample locators
#[derive(Debug, Default)]
pub struct TimeIndex {
    buckets: BTreeMap<Timestamp, HashMap<String, NodeId>>,
    entries: usize,
}

impl TimeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `target` is the sample node for (`key`, `bucket`).
    ///
    /// Re-recording the same pair overwrites the locator.
    pub fn record(&mut self, bucket: Timestamp, key: &str, target: NodeId) {
        let keys = self.buckets.entry(bucket).or_default();
        if keys.insert(key.to_string(), target).is_none() {
            self.entries += 1;
        }
    }

    /// All (key, locator) pairs recorded for a bucket; empty if absent
    pub fn bucket_keys(&self, bucket: Timestamp) -> Vec<(String, NodeId)> {
        self.buckets
            .get(&bucket)
            .map(|keys| keys.iter().map(|(k, id)| (k.clone(), *id)).collect())
            .unwrap_or_default()
    }

    /// Drop a bucket and every entry in it. Returns the number of entries removed.
    pub fn remove_bucket(&mut self, bucket: Timestamp) -> usize {
        let removed = self.buckets.remove(&bucket).map_or(0, |keys| keys.len());
        self.entries -= removed;
        removed
    }

    pub fn contains(&self, bucket: Timestamp) -> bool {
        self.buckets.contains_key(&bucket)
    }

    /// Buckets strictly older than `boundary`, oldest first
    pub fn buckets_before(&self, boundary: Timestamp) -> Vec<Timestamp> {
        self.buckets.range(..boundary).map(|(ts, _)| *ts).collect()
    }

    pub fn oldest(&self) -> Option<Timestamp> {
        self.buckets.keys().next().copied()
    }

    pub fn newest(&self) -> Option<Timestamp> {
        self.buckets.keys().next_back().copied()
    }

    /// Total (key, bucket) entries, i.e. retained samples
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Per-bucket sample counts, oldest first
    pub fn counts(&self) -> Vec<BucketCount> {
        self.buckets
            .iter()
            .map(|(ts, keys)| BucketCount {
                timestamp: ts.as_secs(),
                count: keys.len(),
            })
            .collect()
    }
}
