//! tas Store
//!
//! The store composes the PathTree and the TimeIndex behind one lock:
//! - Write path: key → ensure_path → upsert sample → record in TimeIndex
//! - Read path: pattern → QueryExecutor over the tree
//! - Evict path: bucket → TimeIndex locators → delete samples → prune → drop bucket
//!
//! Thread-safe via Tokio's async RwLock. Writes and evictions take the write
//! lock; queries and diagnostic reads take the read lock, so no reader ever
//! sees one tree updated without the other.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::index::{BucketCount, TimeIndex};
use crate::query::{Query, QueryExecutor, QueryResult, QueryValue};
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::retention::{RetentionPolicy, SweepMode, SweepReport};
use crate::storage::tree::{PathTree, TreeSnapshot};
use crate::storage::types::{Timestamp, Value};

/// Both trees; only ever touched together under `Store::state`
#[derive(Debug, Default)]
struct StoreState {
    tree: PathTree,
    index: TimeIndex,
}

impl StoreState {
    /// Delete every sample filed under `bucket`. Returns the number removed.
    fn evict(&mut self, bucket: Timestamp) -> usize {
        let label = bucket.to_string();
        let mut removed = 0;

        for (key, target) in self.index.bucket_keys(bucket) {
            let Some(key_node) = self.tree.parent(target) else {
                tracing::warn!(%key, %bucket, "Stale index entry, skipping");
                continue;
            };
            if self.tree.delete_child(key_node, &label) {
                removed += 1;
            }
            self.tree.prune_empty_ancestors(key_node);
        }

        self.index.remove_bucket(bucket);
        removed
    }
}

/// In-memory dotted-key time-series store
pub struct Store {
    state: RwLock<StoreState>,
    retention: RetentionPolicy,
    clock: Arc<dyn Clock>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl Store {
    /// Create a store driven by the wall clock
    pub fn new(retention: RetentionPolicy) -> Self {
        Self::with_clock(retention, Arc::new(SystemClock))
    }

    pub fn with_clock(retention: RetentionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            retention,
            clock,
        }
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Merge `value` into the sample at (`key`, `timestamp`)
    pub async fn write(&self, key: &str, timestamp: Timestamp, value: Value) -> StorageResult<()> {
        let segments = split_key(key)?;

        let mut state = self.state.write().await;
        let key_node = state.tree.ensure_path(&segments)?;
        let sample = state.tree.upsert_sample(key_node, key, timestamp, value)?;
        state.index.record(timestamp, key, sample);

        Ok(())
    }

    /// Resolve a query; `Ok(None)` when nothing matched
    pub async fn query(&self, query: &Query) -> QueryResult<Option<QueryValue>> {
        query.validate()?;
        let state = self.state.read().await;
        QueryExecutor::new(&state.tree).execute(query)
    }

    /// Remove one bucket. Absent buckets are a no-op.
    pub async fn evict(&self, bucket: Timestamp) -> usize {
        let mut state = self.state.write().await;
        state.evict(bucket)
    }

    /// Run one retention sweep as of the store's clock
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(self.now()).await
    }

    /// Run one retention sweep as of `now`
    pub async fn sweep_at(&self, now: Timestamp) -> SweepReport {
        let boundary = self.retention.boundary(now);
        let mode = self.retention.sweep_mode(boundary);

        let mut state = self.state.write().await;
        let targets = match mode {
            SweepMode::Full => state.index.buckets_before(boundary),
            SweepMode::Targeted if state.index.contains(boundary) => vec![boundary],
            SweepMode::Targeted => Vec::new(),
        };

        let mut samples_evicted = 0;
        for bucket in &targets {
            samples_evicted += state.evict(*bucket);
        }

        SweepReport {
            boundary,
            mode,
            buckets_evicted: targets.len(),
            samples_evicted,
        }
    }

    /// False when a bucket older than the retention horizon plus slack is still held
    pub async fn is_healthy(&self) -> bool {
        self.is_healthy_at(self.now()).await
    }

    pub async fn is_healthy_at(&self, now: Timestamp) -> bool {
        let threshold = self.retention.health_threshold(now);
        let state = self.state.read().await;
        state.index.oldest().map_or(true, |oldest| oldest >= threshold)
    }

    /// Total number of retained (key, timestamp) samples
    pub async fn num_leafs(&self) -> usize {
        self.state.read().await.index.len()
    }

    pub async fn bucket_counts(&self) -> Vec<BucketCount> {
        self.state.read().await.index.counts()
    }

    pub async fn snapshot(&self) -> TreeSnapshot {
        self.state.read().await.tree.snapshot()
    }

    /// Diagnostic read, taken under one read lock
    pub async fn diagnostics(&self) -> Diagnostics {
        let now = self.now();
        let threshold = self.retention.health_threshold(now);
        let state = self.state.read().await;
        let oldest = state.index.oldest();

        Diagnostics {
            oldest_timestamp: oldest.map_or(0, Timestamp::as_secs),
            current_time: now.as_secs(),
            gc_running: oldest.map_or(true, |o| o >= threshold),
            num_leafs: state.index.len(),
            ts_counts: state.index.counts(),
        }
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            samples: state.index.len(),
            buckets: state.index.bucket_count(),
            tree_nodes: state.tree.len(),
            oldest_bucket: state.index.oldest().map(Timestamp::as_secs),
            newest_bucket: state.index.newest().map(Timestamp::as_secs),
        }
    }
}

/// Split and validate a dotted key
fn split_key(key: &str) -> StorageResult<Vec<&str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if key.is_empty() || segments.iter().any(|s| s.is_empty() || *s == "*") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

/// Snapshot returned by the diagnostic read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Oldest retained bucket, 0 when empty
    pub oldest_timestamp: i64,
    pub current_time: i64,
    /// Whether the evictor is keeping up
    pub gc_running: bool,
    pub num_leafs: usize,
    pub ts_counts: Vec<BucketCount>,
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub samples: usize,
    pub buckets: usize,
    pub tree_nodes: usize,
    pub oldest_bucket: Option<i64>,
    pub newest_bucket: Option<i64>,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Samples: {}, Buckets: {}, Nodes: {}",
            self.samples, self.buckets, self.tree_nodes
        )?;
        if let (Some(oldest), Some(newest)) = (self.oldest_bucket, self.newest_bucket) {
            write!(f, ", Range: {}..={}", oldest, newest)?;
        }
        Ok(())
    }
}
