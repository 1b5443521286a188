//! `SQLite` connection pooling.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

use crate::errors::Result;

/// Pool of `SQLite` connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// One checked-out connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool sizing and timeout configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum pooled connections.
    pub max_size: u32,
    /// How long `get()` waits for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a pool over the ledger database named in [`RecognitionConfig`].
pub fn new_from_config(
    recognition: &rollcall_core::RecognitionConfig,
    config: &ConnectionConfig,
) -> Result<ConnectionPool> {
    new_at_path(&recognition.ledger_path, config)
}

/// Open a pool over a database file, creating it if needed.
pub fn new_at_path(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| crate::errors::LedgerError::Internal(format!("create db dir: {e}")))?;
    }
    let manager = SqliteConnectionManager::file(path).with_init(apply_pragmas);
    build(manager, config)
}

/// Open a pool over a fresh in-memory database (tests).
///
/// Uses a process-unique shared-cache URI so every pooled connection sees
/// the same database.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    static NEXT_DB: AtomicU64 = AtomicU64::new(0);
    let name = NEXT_DB.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:rollcall_mem_{name}?mode=memory&cache=shared");

    let manager = SqliteConnectionManager::file(uri)
        .with_flags(
            OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .with_init(apply_pragmas);
    build(manager, config)
}

fn build(manager: SqliteConnectionManager, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pool = r2d2::Pool::builder()
        .max_size(config.max_size)
        // Keep at least one connection alive so a shared-cache in-memory
        // database is never dropped between checkouts.
        .min_idle(Some(1))
        .connection_timeout(config.acquire_timeout)
        .build(manager)?;
    Ok(pool)
}

fn apply_pragmas(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
