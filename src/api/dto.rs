//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::ingest::IngestCounters;
use crate::storage::{Diagnostics, StoreStats};

// ============================================
// QUERY DTOs
// ============================================

/// Query string of `GET /GET`
#[derive(Debug, Default, Deserialize)]
pub struct GetParams {
    /// Dotted key pattern, `*` for one level
    pub key: Option<String>,
    /// Comma-separated timestamps; empty means all
    #[serde(default)]
    pub t: Option<String>,
    /// Rate divisor in seconds
    #[serde(default)]
    pub i: Option<String>,
}

// ============================================
// DIAGNOSTIC DTOs
// ============================================

/// `GET /DIAG` response
#[derive(Debug, Serialize)]
pub struct DiagResponse {
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
    /// Listener counters, absent when no listener is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestCounters>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy, degraded
    pub status: String,
    /// Evictor status: ok, stalled
    pub evictor: String,
    /// Retained samples
    pub samples: usize,
    /// Live buckets
    pub buckets: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}

impl HealthResponse {
    pub fn new(healthy: bool, stats: &StoreStats, uptime_seconds: u64) -> Self {
        Self {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            evictor: if healthy { "ok" } else { "stalled" }.to_string(),
            samples: stats.samples,
            buckets: stats.buckets,
            uptime_seconds,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
