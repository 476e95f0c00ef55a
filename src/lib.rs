//! # tas
//!
//! In-memory time-series store for hierarchical dotted keys. Clients push
//! counters and series samples under keys like `cart.veg.basket1`, query them
//! back as rates or concatenated series with single-level `*` wildcards, and
//! the store forgets everything older than a short rolling horizon.
//!
//! ## Features
//!
//! - **Dual index**: key tree for queries, time buckets for eviction
//! - **Typed merge**: counters add, series append, mixing them is an error
//! - **Bounded eviction**: targeted single-bucket sweeps with periodic full sweeps
//! - **Plain wire protocol**: `INCR` / `APPEND` lines over TCP, JSON over HTTP
//!
//! ## Modules
//!
//! - [`storage`]: PathTree, Store, retention and the evictor
//! - [`index`]: TimeIndex of non-owning sample locators
//! - [`query`]: Key patterns and aggregation
//! - [`ingest`]: Command grammar and TCP listener
//! - [`api`]: HTTP server with Axum
//! - [`server`]: Lifecycle of all of the above
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tas::config::Config;
//! use tas::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::start(&Config::load_default()).await?;
//!     server.run_until_shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod index;
pub mod ingest;
pub mod query;
pub mod server;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Diagnostics, Evictor, EvictorHandle, RetentionPolicy, StorageError, StorageResult, Store,
    StoreStats, Timestamp, Value,
};

pub use index::{BucketCount, TimeIndex};

pub use query::{Query, QueryError, QueryExecutor, QueryValue, TimestampFilter};

pub use ingest::{Command, CommandError, IngestListener};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};

pub use server::{Server, ServerError};
