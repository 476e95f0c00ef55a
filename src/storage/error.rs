//! Storage engine error types
//!
//! Defines all errors that can occur on the write path of the store.

use thiserror::Error;

use crate::storage::types::{Timestamp, ValueKind};

/// Errors that can occur in the storage engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Key is empty, has an empty segment, or uses the wildcard symbol
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Timestamp is not a decimal Unix time
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// A counter write met a series (or the reverse) at the same sample
    #[error("Type conflict at {key}@{timestamp}: stored {existing}, got {incoming}")]
    TypeConflict {
        key: String,
        timestamp: Timestamp,
        existing: ValueKind,
        incoming: ValueKind,
    },

    /// A key segment collides with a sample slot (or the reverse)
    #[error("Path conflict at {key}: segment {segment:?} is already used as a {occupied_by}")]
    PathConflict {
        key: String,
        segment: String,
        occupied_by: &'static str,
    },
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::InvalidKey("a..b".to_string());
        assert_eq!(err.to_string(), "Invalid key: \"a..b\"");

        let err = StorageError::TypeConflict {
            key: "cart.veg".to_string(),
            timestamp: Timestamp::new(1_700_000_000),
            existing: ValueKind::Counter,
            incoming: ValueKind::Series,
        };
        assert_eq!(
            err.to_string(),
            "Type conflict at cart.veg@1700000000: stored counter, got series"
        );
    }
}
