//! tas Ingest
//!
//! Translates wire commands into `Store::write` calls:
//!
//! - **command**: `INCR` / `APPEND` line grammar
//! - **listener**: TCP accept loop, one task per connection
//!
//! Malformed lines never reach the store; they are logged and counted.

mod command;
mod listener;

pub use command::{Command, CommandError};
pub use listener::{IngestCounters, IngestError, IngestListener, IngestResult, IngestStats};
