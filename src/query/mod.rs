//! Query Engine
//!
//! Resolves dotted key patterns against the PathTree:
//!
//! - **ast**: Key patterns, timestamp filters and the `Query` builder
//! - **executor**: Wildcard walk and rate/series aggregation
//! - **result**: The JSON-shaped `QueryValue`
//!
//! # Query Form
//!
//! ```text
//! key = segment(.segment)*      segment = name | *
//! t   = ts(,ts)*                empty means every retained timestamp
//! i   = seconds                 rate divisor, default 5.0
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tas::query::{Query, TimestampFilter};
//!
//! let query = Query::parse("cart.*.basket1")?
//!     .filter(TimestampFilter::parse_list("1700000000,1700000005")?)
//!     .interval(5.0);
//! let result = store.query(&query).await?;
//! ```

mod ast;
mod error;
mod executor;
mod result;

pub use ast::{KeyPattern, Query, Segment, TimestampFilter, DEFAULT_INTERVAL_SECS, WILDCARD};
pub use error::{QueryError, QueryResult};
pub use executor::QueryExecutor;
pub use result::QueryValue;
