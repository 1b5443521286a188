//! Error types for the attendance ledger.

/// Errors from ledger persistence.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Underlying `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored row contained an unparseable date or time.
    #[error("corrupt ledger row (seq {seq}): {detail}")]
    CorruptRow {
        /// Sequence id of the bad row.
        seq: i64,
        /// What failed to parse.
        detail: String,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
