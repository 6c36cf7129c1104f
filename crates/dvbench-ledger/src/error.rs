//! Ledger error types.

/// Errors produced by [`LedgerBackend`](crate::LedgerBackend) operations
/// and by exports.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `SQLite` failure annotated with the ledger operation that hit it.
    #[error("sqlite error in {context}: {source}")]
    SqliteContext {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// File-system I/O failure (creating the output directory, writing a
    /// JSON-lines file, ...).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be encoded as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    pub(crate) fn sqlite_context(context: &'static str, source: rusqlite::Error) -> Self {
        Self::SqliteContext { context, source }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
