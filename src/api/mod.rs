//! tas HTTP API
//!
//! Query and diagnostic endpoints, built with Axum.
//!
//! # Endpoints
//!
//! ## Query
//! - `GET /GET?key=<pattern>&t=<ts,ts>&i=<seconds>` - Aggregated value or wildcard tree
//!
//! ## Diagnostics
//! - `GET /DIAG` - Oldest bucket, health flag, sample and bucket counts
//! - `GET /TREE` - Key tree as JSON
//! - `GET /STATS` - Per-bucket sample counts
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use tas::api::{build_router, serve, AppState};
//! use tas::config::ApiConfig;
//! use tas::storage::{RetentionPolicy, Store};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Store::new(RetentionPolicy::default()));
//!     let config = ApiConfig::default();
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!
//!     serve(listener, AppState::new(store, config), tas::api::shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/GET", get(routes::query::get_value))
        .route("/DIAG", get(routes::diag::diagnostics))
        .route("/TREE", get(routes::diag::tree))
        .route("/STATS", get(routes::diag::bucket_stats))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Serve the API on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> ApiResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("tas API listening on {}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("tas API shut down gracefully");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::{ManualClock, RetentionPolicy, Store, Timestamp, Value};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value as Json};
    use tower::util::ServiceExt;

    const NOW: i64 = 1_000_060;

    async fn create_test_app() -> (Router, Arc<Store>) {
        let clock = Arc::new(ManualClock::new(Timestamp::new(NOW)));
        let store = Arc::new(Store::with_clock(RetentionPolicy::default(), clock));
        let state = AppState::new(Arc::clone(&store), ApiConfig::default());
        (build_router(state), store)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Json {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed(store: &Store) {
        let t = Timestamp::new(1_000_050);
        store.write("cart.veg.basket1", t, Value::counter(10)).await.unwrap();
        store.write("cart.meat.basket1", t, Value::counter(20)).await.unwrap();
        store
            .write("feed.posts", t, Value::series([json!("hi"), json!(2)]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _) = create_test_app().await;
        let response = get(app, "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_reflects_evictor() {
        let (app, store) = create_test_app().await;
        assert_eq!(get(app.clone(), "/health/ready").await.status(), StatusCode::OK);

        store
            .write("stale", Timestamp::new(999_000), Value::counter(1))
            .await
            .unwrap();
        let response = get(app.clone(), "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(get(app, "/health").await).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["evictor"], "stalled");
        assert_eq!(body["samples"], 1);
    }

    #[tokio::test]
    async fn test_get_leaf_rate() {
        let (app, store) = create_test_app().await;
        seed(&store).await;

        let response = get(app, "/GET?key=cart.veg.basket1&i=2").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!(5.0));
    }

    #[tokio::test]
    async fn test_get_wildcard_tree() {
        let (app, store) = create_test_app().await;
        seed(&store).await;

        let response = get(app, "/GET?key=cart.*.basket1&i=1").await;
        assert_eq!(
            body_json(response).await,
            json!({"veg": 10.0, "meat": 20.0})
        );
    }

    #[tokio::test]
    async fn test_get_series_with_filter() {
        let (app, store) = create_test_app().await;
        seed(&store).await;

        let response = get(app.clone(), "/GET?key=feed.posts&t=1000050").await;
        assert_eq!(body_json(response).await, json!(["hi", 2]));

        let response = get(app, "/GET?key=feed.posts&t=1000055").await;
        assert_eq!(body_json(response).await, Json::Null);
    }

    #[tokio::test]
    async fn test_get_absent_results() {
        let (app, _) = create_test_app().await;

        let response = get(app.clone(), "/GET?key=nothing.here").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Json::Null);

        let response = get(app, "/GET?key=nothing.*").await;
        assert_eq!(body_json(response).await, json!({}));
    }

    #[tokio::test]
    async fn test_get_bad_requests() {
        let (app, store) = create_test_app().await;

        let response = get(app.clone(), "/GET").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["request_id"].is_string());

        let response = get(app.clone(), "/GET?key=k&i=0").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let t = Timestamp::new(1_000_050);
        store.write("mixed", t, Value::counter(1)).await.unwrap();
        store
            .write("mixed", Timestamp::new(1_000_055), Value::series([json!(1)]))
            .await
            .unwrap();
        let response = get(app, "/GET?key=mixed").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["error"]["code"], "TYPE_CONFLICT");
    }

    #[tokio::test]
    async fn test_diag_and_stats() {
        let (app, store) = create_test_app().await;
        seed(&store).await;

        let body = body_json(get(app.clone(), "/DIAG").await).await;
        assert_eq!(body["oldest_timestamp"], 1_000_050);
        assert_eq!(body["current_time"], NOW);
        assert_eq!(body["gc_running"], true);
        assert_eq!(body["num_leafs"], 3);
        assert_eq!(body["ts_counts"], json!([{"timestamp": 1_000_050, "count": 3}]));
        assert!(body.get("ingest").is_none());

        let body = body_json(get(app, "/STATS").await).await;
        assert_eq!(body, json!([{"timestamp": 1_000_050, "count": 3}]));
    }

    #[tokio::test]
    async fn test_tree_dump() {
        let (app, store) = create_test_app().await;
        store
            .write("a.b", Timestamp::new(1_000_050), Value::counter(7))
            .await
            .unwrap();

        let body = body_json(get(app, "/TREE").await).await;
        assert_eq!(
            body,
            json!({
                "name": "dataroot",
                "children": [{
                    "name": "a",
                    "children": [{
                        "name": "b",
                        "children": [{"name": "1000050", "value": 7}]
                    }]
                }]
            })
        );
    }
}
