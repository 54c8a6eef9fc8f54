//! Pooled SQLite store.
//!
//! Uses r2d2 with r2d2_sqlite so concurrent requests each check out their own
//! connection. Every unit of work is a `BEGIN IMMEDIATE` transaction held on
//! one pooled connection until commit or rollback.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

use super::schema::{apply_pragmas, initialize_schema, INSERT_SUBSCRIPTION};
use super::{StoreError, SubscriptionStore, UnitOfWork};
use crate::model::SubscriptionRow;

/// SQLite-backed subscription store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the SQLite database file
    /// * `max_size` - Maximum number of connections in the pool
    /// * `busy_timeout` - How long a connection waits on a write lock
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        max_size: u32,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(db_path);

        let pool = Pool::builder()
            .max_size(max_size)
            .connection_customizer(Box::new(PragmaCustomizer { busy_timeout }))
            .build(manager)?;

        let conn = pool.get()?;
        initialize_schema(&conn)?;

        Ok(Self { pool })
    }

    /// Get a connection from the pool.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Total number of persisted subscription rows.
    pub fn count_rows(&self) -> Result<i64, StoreError> {
        let conn = self.connection()?;
        let count = conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// All rows recorded for `user_id`, oldest first.
    pub fn rows_for_user(&self, user_id: &str) -> Result<Vec<SubscriptionRow>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, county, town, created_at FROM subscriptions \
             WHERE user_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([user_id], |row| {
                Ok(SubscriptionRow {
                    user_id: row.get(0)?,
                    region: row.get(1)?,
                    sub_region: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl SubscriptionStore for SqliteStore {
    type UnitOfWork = SqliteUnitOfWork;

    fn begin(&self) -> Result<SqliteUnitOfWork, StoreError> {
        let conn = self.connection()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(SqliteUnitOfWork { conn })
    }

    fn check(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

/// An open SQLite transaction on a pooled connection.
///
/// Rolled back on drop if still open, so the connection never returns to
/// the pool mid-transaction.
pub struct SqliteUnitOfWork {
    conn: PooledConnection<SqliteConnectionManager>,
}

impl UnitOfWork for SqliteUnitOfWork {
    fn insert(&mut self, row: &SubscriptionRow) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare_cached(INSERT_SUBSCRIPTION)?;
        stmt.execute((&row.user_id, &row.region, &row.sub_region, row.created_at))?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if self.conn.is_autocommit() {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => tracing::debug!("Rolled back unfinished unit of work"),
            Err(e) => tracing::warn!(error = %e, "Failed to roll back unfinished unit of work"),
        }
    }
}

/// Connection customizer that applies pragmas on every new connection.
#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout: Duration,
}

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        apply_pragmas(conn, self.busy_timeout)
    }
}
