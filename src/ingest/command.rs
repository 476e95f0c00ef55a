//! Inbound command grammar
//!
//! ```text
//! INCR   <timestamp> <dotted-key> <integer>
//! APPEND <timestamp> <dotted-key> <json-array>
//! ```
//!
//! Fields are separated by single spaces; the payload is everything after the
//! third space, so JSON arrays may contain spaces.

use std::fmt;

use crate::storage::{Timestamp, Value};

/// Rejections raised while parsing a command line
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command verb: {0:?}")]
    UnknownVerb(String),

    #[error("Missing {0} field")]
    MissingField(&'static str),

    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("Invalid integer: {0:?}")]
    InvalidInteger(String),

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("APPEND payload must be a JSON array")]
    NotAnArray,
}

/// A parsed write command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Incr {
        timestamp: Timestamp,
        key: String,
        delta: i64,
    },
    Append {
        timestamp: Timestamp,
        key: String,
        items: Vec<serde_json::Value>,
    },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        let mut fields = line.splitn(4, ' ');
        let verb = fields.next().unwrap_or_default();
        if verb != "INCR" && verb != "APPEND" {
            return Err(CommandError::UnknownVerb(verb.to_string()));
        }

        let raw_ts = fields.next().ok_or(CommandError::MissingField("timestamp"))?;
        let key = fields.next().ok_or(CommandError::MissingField("key"))?;
        let payload = fields.next().ok_or(CommandError::MissingField("value"))?;

        let timestamp = raw_ts
            .parse::<Timestamp>()
            .map_err(|_| CommandError::InvalidTimestamp(raw_ts.to_string()))?;
        let key = key.to_string();

        if verb == "INCR" {
            let delta = payload
                .trim()
                .parse::<i64>()
                .map_err(|_| CommandError::InvalidInteger(payload.to_string()))?;
            return Ok(Command::Incr {
                timestamp,
                key,
                delta,
            });
        }

        match serde_json::from_str(payload) {
            Ok(serde_json::Value::Array(items)) => Ok(Command::Append {
                timestamp,
                key,
                items,
            }),
            Ok(_) => Err(CommandError::NotAnArray),
            Err(e) => Err(CommandError::InvalidJson(e.to_string())),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Command::Incr { key, .. } | Command::Append { key, .. } => key,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            Command::Incr { timestamp, .. } | Command::Append { timestamp, .. } => *timestamp,
        }
    }

    /// Split into the arguments of `Store::write`
    pub fn into_write(self) -> (String, Timestamp, Value) {
        match self {
            Command::Incr {
                timestamp,
                key,
                delta,
            } => (key, timestamp, Value::Counter(delta)),
            Command::Append {
                timestamp,
                key,
                items,
            } => (key, timestamp, Value::Series(items)),
        }
    }
}

/// Wire form, without the trailing newline
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Incr {
                timestamp,
                key,
                delta,
            } => write!(f, "INCR {} {} {}", timestamp, key, delta),
            Command::Append {
                timestamp,
                key,
                items,
            } => {
                let payload =
                    serde_json::to_string(items).map_err(|_| fmt::Error)?;
                write!(f, "APPEND {} {} {}", timestamp, key, payload)
            }
        }
    }
}
