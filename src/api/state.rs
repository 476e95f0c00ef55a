//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ApiConfig;
use crate::ingest::{IngestCounters, IngestStats};
use crate::storage::Store;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Store queried by every route
    pub store: Arc<Store>,
    /// Listener counters, when a listener is running
    pub ingest: Option<Arc<IngestStats>>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state without an attached ingest listener
    pub fn new(store: Arc<Store>, config: ApiConfig) -> Self {
        Self {
            store,
            ingest: None,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Report this listener's counters from `/DIAG`
    pub fn with_ingest(mut self, stats: Arc<IngestStats>) -> Self {
        self.ingest = Some(stats);
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn ingest_counters(&self) -> Option<IngestCounters> {
        self.ingest.as_ref().map(|stats| stats.snapshot())
    }
}
