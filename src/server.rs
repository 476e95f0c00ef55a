//! Server lifecycle
//!
//! Wires a [`Store`] to its three activities: the ingest listener, the HTTP
//! API and the evictor. All of them stop on one shared watch signal.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{self, ApiError, ApiResult, AppState};
use crate::config::Config;
use crate::ingest::{IngestError, IngestListener};
use crate::storage::{Evictor, EvictorHandle, RetentionPolicy, Store};

/// Startup and shutdown failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Failed to bind API on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A running tas server
pub struct Server {
    store: Arc<Store>,
    shutdown: watch::Sender<bool>,
    evictor: EvictorHandle,
    ingest_task: JoinHandle<()>,
    api_task: JoinHandle<ApiResult<()>>,
    ingest_addr: SocketAddr,
    api_addr: SocketAddr,
}

impl Server {
    /// Bind both ports and start every background task
    pub async fn start(config: &Config) -> Result<Self, ServerError> {
        let store = Arc::new(Store::new(RetentionPolicy::from_config(&config.retention)));
        Self::start_with_store(config, store).await
    }

    pub async fn start_with_store(config: &Config, store: Arc<Store>) -> Result<Self, ServerError> {
        let (shutdown, _) = watch::channel(false);

        let listener = IngestListener::bind(&config.ingest, Arc::clone(&store)).await?;
        let ingest_addr = listener.local_addr()?;
        let ingest_stats = listener.stats();

        let api_bind = config.api.bind_addr();
        let api_listener = TcpListener::bind(&api_bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: api_bind.clone(),
                source,
            })?;
        let api_addr = api_listener
            .local_addr()
            .map_err(|source| ServerError::Bind {
                addr: api_bind,
                source,
            })?;

        let evictor = Evictor::spawn(Arc::clone(&store));
        let ingest_task = tokio::spawn(listener.run(shutdown.subscribe()));

        let state = AppState::new(Arc::clone(&store), config.api.clone()).with_ingest(ingest_stats);
        let mut api_shutdown = shutdown.subscribe();
        let api_task = tokio::spawn(api::serve(api_listener, state, async move {
            let _ = api_shutdown.changed().await;
        }));

        tracing::info!(%ingest_addr, %api_addr, "tas server started");

        Ok(Self {
            store,
            shutdown,
            evictor,
            ingest_task,
            api_task,
            ingest_addr,
            api_addr,
        })
    }

    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    pub fn ingest_addr(&self) -> SocketAddr {
        self.ingest_addr
    }

    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    /// Block until Ctrl+C or SIGTERM, then shut down
    pub async fn run_until_shutdown(self) -> Result<(), ServerError> {
        api::shutdown_signal().await;
        self.shutdown().await
    }

    /// Stop every task and wait for them to finish
    pub async fn shutdown(self) -> Result<(), ServerError> {
        tracing::info!("Stopping tas server");
        let _ = self.shutdown.send(true);

        self.evictor.stop().await;
        self.ingest_task.await?;
        self.api_task.await??;

        tracing::info!(stats = %self.store.stats().await, "tas server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, IngestConfig};
    use crate::storage::Timestamp;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    fn loopback_config() -> Config {
        Config {
            ingest: IngestConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                ..IngestConfig::default()
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                ..ApiConfig::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_then_query_over_http() {
        let server = Server::start(&loopback_config()).await.unwrap();
        let store = server.store();
        let ts = Timestamp::now();

        let mut client = TcpStream::connect(server.ingest_addr()).await.unwrap();
        let lines = format!("INCR {ts} shop.a 4\nINCR {ts} shop.b 6\nnonsense\n");
        client.write_all(lines.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        for _ in 0..200 {
            if store.num_leafs().await == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let base = format!("http://{}", server.api_addr());
        let http = reqwest::Client::new();

        let value: serde_json::Value = http
            .get(format!("{base}/GET?key=shop.*&i=1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"a": 4.0, "b": 6.0}));

        let diag: serde_json::Value = http
            .get(format!("{base}/DIAG"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(diag["num_leafs"], 2);
        assert_eq!(diag["ingest"]["accepted"], 2);
        assert_eq!(diag["ingest"]["rejected"], 1);

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = loopback_config();
        config.ingest.port = blocker.local_addr().unwrap().port();

        let err = Server::start(&config).await.err().unwrap();
        assert!(matches!(err, ServerError::Ingest(IngestError::Bind { .. })));
    }
}
