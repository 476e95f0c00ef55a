//! Diagnostic Routes
//!
//! - GET /DIAG - Retention and listener diagnostics
//! - GET /TREE - JSON dump of the key tree
//! - GET /STATS - Per-bucket sample counts, oldest first

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::DiagResponse;
use crate::api::state::AppState;
use crate::index::BucketCount;
use crate::storage::TreeSnapshot;

/// GET /DIAG
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagResponse> {
    Json(DiagResponse {
        diagnostics: state.store.diagnostics().await,
        ingest: state.ingest_counters(),
    })
}

/// GET /TREE
pub async fn tree(State(state): State<Arc<AppState>>) -> Json<TreeSnapshot> {
    Json(state.store.snapshot().await)
}

/// GET /STATS
pub async fn bucket_stats(State(state): State<Arc<AppState>>) -> Json<Vec<BucketCount>> {
    Json(state.store.bucket_counts().await)
}
