//! Query error types
//!
//! Defines all error conditions that can occur during query parsing and execution.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Key pattern is empty or has an empty segment
    #[error("Invalid pattern: {0:?}")]
    InvalidPattern(String),

    /// Timestamp filter entry is not a decimal Unix time
    #[error("Invalid timestamp filter: {0:?}")]
    InvalidTimestamp(String),

    /// Interval divisor is not a positive finite number
    #[error("Invalid interval: {0} (must be a positive number of seconds)")]
    InvalidInterval(f64),

    /// Counter and series samples met under one key
    #[error("Type conflict: {path} holds both counter and series samples")]
    TypeConflict { path: String },
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
