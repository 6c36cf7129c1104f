//! Buffering ledger facade.
//!
//! [`Ledger`] accumulates rows in memory and hands them to a
//! [`LedgerBackend`] on [`Ledger::flush`]. Only rows not yet flushed are
//! written, so repeated flushes never duplicate or rewrite history. Reads
//! see durable rows followed by the ones still buffered.

use std::path::Path;

use dvbench_types::{LedgerRow, RunId};

use crate::backend::LedgerBackend;
use crate::error;
use crate::export;
use crate::jsonl::JsonlLedger;
use crate::sqlite::SqliteLedger;

/// Durable format of a ledger target, chosen from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFormat {
    /// `.db`, `.sqlite`, `.sqlite3`
    Sqlite,
    /// Anything else, conventionally `.jsonl`.
    Jsonl,
}

impl LedgerFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("db" | "sqlite" | "sqlite3") => Self::Sqlite,
            _ => Self::Jsonl,
        }
    }
}

/// In-memory buffer in front of a durable backend.
///
/// Constructed once per process and passed to whoever records rows.
/// Dropping a ledger with buffered rows makes a last flush attempt.
pub struct Ledger {
    backend: Box<dyn LedgerBackend>,
    pending: Vec<LedgerRow>,
}

impl Ledger {
    #[must_use]
    pub fn new(backend: Box<dyn LedgerBackend>) -> Self {
        Self {
            backend,
            pending: Vec::new(),
        }
    }

    /// Open the ledger stored at `path`, picking the backend from the
    /// extension (see [`LedgerFormat`]).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) if the target can't be
    /// opened or its directory created.
    pub fn open(path: &Path) -> error::Result<Self> {
        let backend: Box<dyn LedgerBackend> = match LedgerFormat::from_path(path) {
            LedgerFormat::Sqlite => Box::new(SqliteLedger::open(path)?),
            LedgerFormat::Jsonl => Box::new(JsonlLedger::open(path)?),
        };
        tracing::debug!(path = %path.display(), "Opened ledger");
        Ok(Self::new(backend))
    }

    /// Ledger over an in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) if `SQLite` can't be initialized.
    pub fn in_memory() -> error::Result<Self> {
        Ok(Self::new(Box::new(SqliteLedger::in_memory()?)))
    }

    #[must_use]
    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Buffer one row. Never rejects a row for its set of extra keys.
    pub fn append(&mut self, row: LedgerRow) {
        self.pending.push(row);
    }

    /// Number of rows buffered but not yet durable.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Write every buffered row to the backend. Returns how many were written.
    ///
    /// On failure the buffer is left intact so a later flush can retry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) on storage failure.
    pub fn flush(&mut self) -> error::Result<u64> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let written = self.backend.append(&self.pending)?;
        self.pending.clear();
        tracing::debug!(rows = written, location = %self.backend.location(), "Flushed ledger");
        Ok(written)
    }

    /// All rows, durable first, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) on storage failure.
    pub fn read_all(&self) -> error::Result<Vec<LedgerRow>> {
        let mut rows = self.backend.read_all()?;
        rows.extend(self.pending.iter().cloned());
        Ok(rows)
    }

    /// The last `n` rows, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) on storage failure.
    pub fn read_tail(&self, n: usize) -> error::Result<Vec<LedgerRow>> {
        let buffered = self.pending.len();
        if n <= buffered {
            return Ok(self.pending[buffered - n..].to_vec());
        }
        let mut rows = self.backend.read_tail(n - buffered)?;
        rows.extend(self.pending.iter().cloned());
        Ok(rows)
    }

    /// Run id of the last appended row, buffered or durable.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) on storage failure.
    pub fn latest_run_id(&self) -> error::Result<Option<RunId>> {
        match self.pending.last() {
            Some(row) => Ok(Some(row.run_id.clone())),
            None => self.backend.latest_run_id(),
        }
    }

    /// Every row sharing the most recent run id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) on storage failure.
    pub fn read_latest_run(&self) -> error::Result<Vec<LedgerRow>> {
        let Some(run) = self.latest_run_id()? else {
            return Ok(Vec::new());
        };
        let mut rows = self.backend.read_run(&run)?;
        rows.extend(self.pending.iter().filter(|r| r.run_id == run).cloned());
        Ok(rows)
    }

    /// Write a full snapshot of the ledger to a separate flat file.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::LedgerError) on read or write failure.
    pub fn export(&self, path: &Path) -> error::Result<usize> {
        let rows = self.read_all()?;
        export::export_rows(path, &rows)
    }
}

impl Drop for Ledger {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = self.pending.len();
        if let Err(e) = self.flush() {
            tracing::error!(
                rows = pending,
                location = %self.backend.location(),
                error = %e,
                "Dropping ledger with unflushed rows"
            );
        }
    }
}
