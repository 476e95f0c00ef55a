//! Query AST
//!
//! A query is a dotted key pattern plus a timestamp filter and a rate interval:
//!
//! ```text
//! cart.*.basket1   t=1700000000,1700000005   i=5
//! ```
//!
//! `*` matches exactly one level of the hierarchy.

use std::collections::HashSet;
use std::fmt;

use crate::query::error::{QueryError, QueryResult};
use crate::storage::Timestamp;

/// Wildcard symbol for a single key segment
pub const WILDCARD: &str = "*";

/// Rate divisor used when the caller does not supply one
pub const DEFAULT_INTERVAL_SECS: f64 = 5.0;

/// One segment of a key pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(name) => write!(f, "{}", name),
            Segment::Wildcard => write!(f, "{}", WILDCARD),
        }
    }
}

/// Parsed dotted key pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    segments: Vec<Segment>,
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> QueryResult<Self> {
        if pattern.is_empty() {
            return Err(QueryError::InvalidPattern(pattern.to_string()));
        }

        let segments = pattern
            .split('.')
            .map(|segment| match segment {
                "" => Err(QueryError::InvalidPattern(pattern.to_string())),
                WILDCARD => Ok(Segment::Wildcard),
                name => Ok(Segment::Literal(name.to_string())),
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Wildcard))
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// Set of timestamps a query aggregates over; empty admits everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampFilter {
    allowed: HashSet<Timestamp>,
}

impl TimestampFilter {
    /// Admit every retained timestamp
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(timestamps: impl IntoIterator<Item = Timestamp>) -> Self {
        Self {
            allowed: timestamps.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list; blank input admits everything
    pub fn parse_list(list: &str) -> QueryResult<Self> {
        let allowed = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Timestamp>()
                    .map_err(|_| QueryError::InvalidTimestamp(s.to_string()))
            })
            .collect::<QueryResult<HashSet<_>>>()?;
        Ok(Self { allowed })
    }

    pub fn admits(&self, timestamp: Timestamp) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&timestamp)
    }

    pub fn is_all(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// A complete query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub pattern: KeyPattern,
    pub filter: TimestampFilter,
    pub interval_secs: f64,
}

impl Query {
    pub fn new(pattern: KeyPattern) -> Self {
        Self {
            pattern,
            filter: TimestampFilter::all(),
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }

    /// Parse a dotted key pattern into a query with default filter and interval
    pub fn parse(pattern: &str) -> QueryResult<Self> {
        KeyPattern::parse(pattern).map(Self::new)
    }

    /// Builder method: restrict aggregation to these timestamps
    pub fn filter(mut self, filter: TimestampFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Builder method: set the rate divisor
    pub fn interval(mut self, secs: f64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn validate(&self) -> QueryResult<()> {
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(QueryError::InvalidInterval(self.interval_secs));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        let pattern = KeyPattern::parse("cart.*.basket1").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("cart".to_string()),
                Segment::Wildcard,
                Segment::Literal("basket1".to_string()),
            ]
        );
        assert!(pattern.has_wildcard());
        assert_eq!(pattern.to_string(), "cart.*.basket1");
    }

    #[test]
    fn test_parse_pattern_rejects_empty_segments() {
        assert!(KeyPattern::parse("").is_err());
        assert!(KeyPattern::parse("a..b").is_err());
        assert!(KeyPattern::parse("a.").is_err());
    }

    #[test]
    fn test_filter_parse() {
        let filter = TimestampFilter::parse_list("100, 105,").unwrap();
        assert!(filter.admits(Timestamp::new(100)));
        assert!(filter.admits(Timestamp::new(105)));
        assert!(!filter.admits(Timestamp::new(110)));

        assert!(TimestampFilter::parse_list("").unwrap().is_all());
        assert!(TimestampFilter::parse_list("abc").is_err());
    }

    #[test]
    fn test_validate_interval() {
        let query = Query::parse("k").unwrap();
        assert!(query.validate().is_ok());
        assert_eq!(query.interval_secs, DEFAULT_INTERVAL_SECS);

        assert!(query.clone().interval(0.0).validate().is_err());
        assert!(query.clone().interval(-1.0).validate().is_err());
        assert!(query.interval(f64::NAN).validate().is_err());
    }
}
