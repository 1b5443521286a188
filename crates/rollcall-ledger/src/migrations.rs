//! Schema migrations for the attendance database.

use rusqlite::Connection;

use crate::errors::Result;

/// Current schema version.
const SCHEMA_VERSION: i64 = 1;

/// Run all pending migrations.
///
/// `AUTOINCREMENT` on `seq` guarantees strictly increasing, never-reused
/// sequence ids — the total order every read path relies on.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS attendance_events (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                label       TEXT NOT NULL,
                date        TEXT NOT NULL,
                time        TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_attendance_date_label
                ON attendance_events (date, label);",
        )?;
    }

    if version != SCHEMA_VERSION {
        // user_version doesn't support parameters
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
        tracing::debug!(from = version, to = SCHEMA_VERSION, "ledger schema migrated");
    }
    Ok(())
}
