//! Schema and pragmas for the subscriptions database.

use rusqlite::Connection;
use std::time::Duration;

/// Append-only subscription table.
///
/// No unique constraint on `(user_id, county, town)`; repeated requests
/// accumulate rows.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS subscriptions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT    NOT NULL,
    county      TEXT    NOT NULL,
    town        TEXT    NOT NULL,
    created_at  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_user_id ON subscriptions(user_id);
"#;

pub const INSERT_SUBSCRIPTION: &str =
    "INSERT INTO subscriptions (user_id, county, town, created_at) VALUES (?1, ?2, ?3, ?4)";

/// Apply per-connection pragmas (WAL, `synchronous=FULL`, busy timeout).
pub fn apply_pragmas(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA foreign_keys = ON;
        "#,
    )
}

/// Create tables and indexes if they do not exist yet.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_duplicate_rows_are_allowed() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for _ in 0..2 {
            conn.execute(INSERT_SUBSCRIPTION, ("u1", "CountyA", "TownX", 1_i64))
                .unwrap();
        }

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM subscriptions WHERE user_id = 'u1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
