//! Storage layer for subscription rows.
//!
//! Provides:
//! - The [`SubscriptionStore`] / [`UnitOfWork`] seam the writer is generic over
//! - Schema initialization and connection pragmas
//! - A pooled SQLite implementation

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::model::SubscriptionRow;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to acquire connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A relational store that can open atomic units of work.
///
/// Shared across all concurrent requests; each request opens its own unit
/// of work and must not hold it past the request.
pub trait SubscriptionStore: Send + Sync + 'static {
    type UnitOfWork: UnitOfWork;

    /// Open a new unit of work (transaction).
    fn begin(&self) -> Result<Self::UnitOfWork, StoreError>;

    /// Readiness check.
    fn check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// An all-or-nothing group of row writes.
///
/// Implementations must roll back on drop if neither `commit` nor
/// `rollback` completed.
pub trait UnitOfWork {
    fn insert(&mut self, row: &SubscriptionRow) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>;

    fn rollback(self) -> Result<(), StoreError>;
}
