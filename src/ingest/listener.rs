//! TCP command listener
//!
//! Accepts newline-delimited commands, one task per connection. A bad line
//! (including one that is not UTF-8) is counted and skipped; the connection keeps reading. A line longer than
//! `max_line_bytes` closes that connection.

use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::config::IngestConfig;
use crate::ingest::command::Command;
use crate::storage::Store;

/// Listener errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Message counters shared with diagnostics
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    rejected: AtomicU64,
    connections: AtomicU64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestCounters {
        IngestCounters {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounters {
    pub accepted: u64,
    pub rejected: u64,
    pub connections: u64,
}

/// Bound command listener feeding a [`Store`]
pub struct IngestListener {
    listener: TcpListener,
    store: Arc<Store>,
    stats: Arc<IngestStats>,
    max_line_bytes: usize,
}

impl IngestListener {
    pub async fn bind(config: &IngestConfig, store: Arc<Store>) -> IngestResult<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| IngestError::Bind { addr, source })?;

        Ok(Self {
            listener,
            store,
            stats: Arc::new(IngestStats::default()),
            max_line_bytes: config.max_line_bytes,
        })
    }

    pub fn local_addr(&self) -> IngestResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Accept connections until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("tas ingest listening on {}", addr);
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        self.stats.connections.fetch_add(1, Ordering::Relaxed);
                        let connection = Connection {
                            store: Arc::clone(&self.store),
                            stats: Arc::clone(&self.stats),
                            max_line_bytes: self.max_line_bytes,
                        };
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            tracing::debug!(%peer, "Ingest connection opened");
                            if let Err(e) = connection.serve(socket, shutdown).await {
                                tracing::warn!(%peer, "Ingest connection failed: {}", e);
                            }
                            tracing::debug!(%peer, "Ingest connection closed");
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Ingest accept failed: {}", e);
                    }
                },
            }
            if *shutdown.borrow() {
                break;
            }
        }

        tracing::info!("tas ingest shut down");
    }
}

struct Connection {
    store: Arc<Store>,
    stats: Arc<IngestStats>,
    max_line_bytes: usize,
}

impl Connection {
    async fn serve(
        &self,
        socket: TcpStream,
        mut shutdown: watch::Receiver<bool>,
    ) -> IngestResult<()> {
        let mut reader = BufReader::new(socket);
        let mut buf = Vec::new();
        let limit = self.max_line_bytes as u64 + 1;

        loop {
            buf.clear();
            let mut limited = (&mut reader).take(limit);
            let read = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                read = limited.read_until(b'\n', &mut buf) => read?,
            };
            if read == 0 {
                return Ok(());
            }
            if buf.len() > self.max_line_bytes && buf.last() != Some(&b'\n') {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    limit = self.max_line_bytes,
                    "Command line too long, closing connection"
                );
                return Ok(());
            }

            match std::str::from_utf8(&buf) {
                Ok(line) => self.process(line).await,
                Err(e) => {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Rejected command, not UTF-8: {}", e);
                }
            }
        }
    }

    async fn process(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(line = %line.trim_end(), "Rejected command: {}", e);
                return;
            }
        };

        let (key, timestamp, value) = command.into_write();
        match self.store.write(&key, timestamp, value).await {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%key, %timestamp, "Write rejected: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, QueryValue};
    use crate::storage::RetentionPolicy;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    async fn start_listener(
        max_line_bytes: usize,
    ) -> (SocketAddr, Arc<Store>, Arc<IngestStats>, watch::Sender<bool>) {
        let store = Arc::new(Store::new(RetentionPolicy::default()));
        let config = IngestConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_line_bytes,
        };
        let listener = IngestListener::bind(&config, Arc::clone(&store)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = listener.stats();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(listener.run(rx));
        (addr, store, stats, tx)
    }

    async fn wait_for(stats: &IngestStats, total: u64) {
        for _ in 0..200 {
            let counters = stats.snapshot();
            if counters.accepted + counters.rejected >= total {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_ingest_over_tcp() {
        let (addr, store, stats, shutdown) = start_listener(1024).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(
                b"INCR 1700000000 cart.veg 2\n\
                  bogus line\n\
                  INCR 1700000000 cart.veg 3\r\n\
                  APPEND 1700000000 cart.veg [1]\n\
                  APPEND 1700000000 log [\"a\", \"b\"]\n",
            )
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        wait_for(&stats, 5).await;
        let counters = stats.snapshot();
        assert_eq!(counters.accepted, 3);
        // bad verb plus counter/series conflict
        assert_eq!(counters.rejected, 2);
        assert_eq!(counters.connections, 1);

        let rate = store
            .query(&Query::parse("cart.veg").unwrap().interval(1.0))
            .await
            .unwrap();
        assert_eq!(rate, Some(QueryValue::Rate(5.0)));

        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_oversized_line_closes_connection() {
        let (addr, store, stats, shutdown) = start_listener(16).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"APPEND 1700000000 k [1,2,3,4,5,6,7,8,9]\nINCR 1700000000 k 1\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        wait_for(&stats, 1).await;
        assert_eq!(stats.snapshot().rejected, 1);
        assert_eq!(store.num_leafs().await, 0);

        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_non_utf8_line_rejected() {
        let (addr, store, stats, shutdown) = start_listener(1024).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"INCR 100 bad\xff\xfekey 1\nINCR 100 good 1\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        wait_for(&stats, 2).await;
        let counters = stats.snapshot();
        assert_eq!(counters.rejected, 1);
        assert_eq!(counters.accepted, 1);
        assert_eq!(store.num_leafs().await, 1);
        let names: Vec<String> = store
            .snapshot()
            .await
            .children
            .into_iter()
            .map(|child| child.name)
            .collect();
        assert_eq!(names, vec!["good".to_string()]);

        shutdown.send(true).unwrap();
    }
}
