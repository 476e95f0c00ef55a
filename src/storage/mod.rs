//! tas Storage
//!
//! The in-memory core of the store:
//!
//! - **types**: `Timestamp`, the tagged `Value` and its merge rules
//! - **tree**: Arena-backed `PathTree` keyed by dotted segments
//! - **engine**: `Store`, both trees behind one RwLock
//! - **retention**: Boundary, sweep mode and health threshold
//! - **evictor**: Background sweep task with a stop handle
//! - **clock**: Wall and manual time sources
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   (key, ts, value) → PathTree sample (merge) → TimeIndex locator
//!
//! Read Path:
//!   pattern → PathTree walk → aggregate samples → QueryValue
//!
//! Evict Path:
//!   bucket → TimeIndex locators → delete samples → prune ancestors
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tas::query::Query;
//! use tas::storage::{Evictor, RetentionPolicy, Store, Timestamp, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Store::new(RetentionPolicy::default()));
//!     let evictor = Evictor::spawn(Arc::clone(&store));
//!
//!     store.write("cart.veg.basket1", Timestamp::now(), Value::counter(3)).await?;
//!     let rate = store.query(&Query::parse("cart.*.basket1")?).await?;
//!     println!("{:?}", rate);
//!
//!     evictor.stop().await;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod evictor;
pub mod retention;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Diagnostics, Store, StoreStats};
pub use error::{StorageError, StorageResult};
pub use evictor::{Evictor, EvictorHandle};
pub use retention::{RetentionPolicy, SweepMode, SweepReport};
pub use tree::{NodeId, PathTree, TreeSnapshot};
pub use types::{KindMismatch, Timestamp, Value, ValueKind};
