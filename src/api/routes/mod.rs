//! API Routes
//!
//! Route handlers organized by functionality.

pub mod diag;
pub mod health;
pub mod query;
