//! Subwriter: records a user's region/sub-region subscriptions over HTTP.
//!
//! A single `POST /subscribeAll` request carries a mapping from region to a
//! list of sub-regions. Every pairing becomes one row, and all rows of one
//! request are written in a single SQLite transaction: either the whole batch
//! is committed or nothing is.
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`error`]: Request failure taxonomy and HTTP mapping
//! - [`model`]: Wire types, decoding and row flattening
//! - [`observability`]: Metrics and tracing setup
//! - [`server`]: Router construction and server lifecycle
//! - [`service`]: The subscribe handler and transactional batch writer
//! - [`storage`]: Store abstraction and the SQLite backend

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // storage::sqlite::SqliteStore is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes, // r#""# is fine for SQL
    clippy::struct_excessive_bools      // Config structs may have flags
)]

pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod server;
pub mod service;
pub mod storage;

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) request ID.
///
/// # Example
///
/// ```
/// let id = subwriter::generate_request_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}

/// Get the current Unix timestamp in milliseconds.
///
/// A clock set before the epoch yields 0 rather than panicking.
#[must_use]
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
