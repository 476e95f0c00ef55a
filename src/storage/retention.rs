//! Retention policy
//!
//! Samples are filed under 5-second buckets and kept for a 60-second horizon.
//! Each sweep computes a boundary from the current time:
//!
//! ```text
//! boundary = floor(now / bucket_width) * bucket_width - horizon
//! ```
//!
//! and either evicts exactly the boundary bucket (targeted, the common case)
//! or, when the boundary is a multiple of `full_sweep_every`, every bucket
//! strictly older than it (full sweep, which picks up out-of-order stragglers).

use serde::Serialize;
use std::time::Duration;

use crate::config::RetentionConfig;
use crate::storage::types::Timestamp;

/// How a sweep chooses the buckets to evict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Only the bucket equal to the boundary
    Targeted,
    /// Every bucket older than the boundary
    Full,
}

/// Retention constants, all in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionPolicy {
    pub bucket_width: i64,
    pub horizon: i64,
    pub health_slack: i64,
    pub full_sweep_every: i64,
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            bucket_width: 5,
            horizon: 60,
            health_slack: 5,
            full_sweep_every: 8,
            sweep_interval: Duration::from_secs(4),
        }
    }
}

impl RetentionPolicy {
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            bucket_width: config.bucket_width_secs.max(1),
            horizon: config.horizon_secs,
            health_slack: config.health_slack_secs,
            full_sweep_every: config.full_sweep_every.max(1),
            sweep_interval: Duration::from_millis(config.sweep_interval_ms.max(1)),
        }
    }

    /// Oldest bucket that is still retained after a sweep at `now`
    pub fn boundary(&self, now: Timestamp) -> Timestamp {
        let quantized = now.as_secs().div_euclid(self.bucket_width) * self.bucket_width;
        Timestamp::new(quantized - self.horizon)
    }

    /// Buckets older than this mean the evictor has fallen behind
    pub fn health_threshold(&self, now: Timestamp) -> Timestamp {
        Timestamp::new(self.boundary(now).as_secs() - self.health_slack)
    }

    pub fn sweep_mode(&self, boundary: Timestamp) -> SweepMode {
        if boundary.as_secs().rem_euclid(self.full_sweep_every) == 0 {
            SweepMode::Full
        } else {
            SweepMode::Targeted
        }
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub boundary: Timestamp,
    pub mode: SweepMode,
    pub buckets_evicted: usize,
    pub samples_evicted: usize,
}
