//! tas Index Structures
//!
//! - **TimeIndex**: bucket → key → sample locator, used by eviction
//!
//! # Architecture
//!
//! ```text
//! Evict bucket 1700000000
//!        ↓
//! TimeIndex: bucket_keys(1700000000) → [("cart.veg", #12), ("cart.meat", #31)]
//!        ↓
//! PathTree: delete sample under parent(#12), parent(#31); prune empty ancestors
//!        ↓
//! TimeIndex: remove_bucket(1700000000)
//! ```

mod time_index;

pub use time_index::TimeIndex;

use serde::{Deserialize, Serialize};

/// Number of samples retained in one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub timestamp: i64,
    pub count: usize,
}
