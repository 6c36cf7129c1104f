//! `SQLite`-backed implementation of [`LedgerBackend`].
//!
//! Uses a single `Mutex<Connection>` for thread safety. Append order is the
//! `seq` autoincrement column; open-ended extras are stored as a JSON text
//! column so rows with different extra keys share one table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use dvbench_types::{LedgerRow, RunId};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

use crate::backend::LedgerBackend;
use crate::error::{self, LedgerError};

/// Idempotent DDL for the ledger table.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS ledger_rows (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    run_id TEXT NOT NULL,
    workflow TEXT NOT NULL,
    technology TEXT NOT NULL,
    operation TEXT NOT NULL,
    label TEXT NOT NULL,
    merged INTEGER NOT NULL,
    filename TEXT NOT NULL,
    step INTEGER NOT NULL,
    file_bytes INTEGER NOT NULL,
    row_count INTEGER NOT NULL,
    time_seconds REAL NOT NULL,
    bytes_sent INTEGER NOT NULL,
    bytes_recv INTEGER NOT NULL,
    bytes_sent_1s INTEGER NOT NULL,
    bytes_recv_1s INTEGER NOT NULL,
    error TEXT NOT NULL,
    extra TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_ledger_rows_run ON ledger_rows (run_id, seq);
";

const SELECT_COLUMNS: &str = "timestamp, run_id, workflow, technology, operation, label, \
     merged, filename, step, file_bytes, row_count, time_seconds, bytes_sent, bytes_recv, \
     bytes_sent_1s, bytes_recv_1s, error, extra";

/// `SQLite`-backed ledger storage.
///
/// Create with [`SqliteLedger::open`] for file-backed persistence or
/// [`SqliteLedger::in_memory`] for tests.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteLedger {
    /// Open or create a `SQLite` ledger database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the directory can't be created,
    /// or [`LedgerError::SqliteContext`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn =
            Connection::open(path).map_err(|e| LedgerError::sqlite_context("open", e))?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(|e| LedgerError::sqlite_context("open: create tables", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory `SQLite` ledger (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SqliteContext`] if the in-memory database
    /// can't be initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::sqlite_context("open in-memory", e))?;
        conn.execute_batch(CREATE_TABLES)
            .map_err(|e| LedgerError::sqlite_context("open: create tables", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        raw.parse::<T>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    #[allow(clippy::cast_sign_loss)]
    fn get_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
        Ok(row.get::<_, i64>(idx)?.max(0) as u64)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<LedgerRow> {
        let timestamp: String = row.get(0)?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);
        let workflow: String = row.get(2)?;
        let technology: String = row.get(3)?;
        let step: i64 = row.get(8)?;
        let extra: String = row.get(17)?;
        let extra: BTreeMap<String, serde_json::Value> = serde_json::from_str(&extra)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(17, Type::Text, Box::new(e)))?;

        Ok(LedgerRow {
            timestamp,
            run_id: RunId::new(row.get::<_, String>(1)?),
            workflow: Self::parse_text(2, &workflow)?,
            technology: Self::parse_text(3, &technology)?,
            operation: row.get(4)?,
            label: row.get(5)?,
            merged: row.get(6)?,
            filename: row.get(7)?,
            step: u32::try_from(step).unwrap_or(u32::MAX),
            file_bytes: Self::get_u64(row, 9)?,
            row_count: Self::get_u64(row, 10)?,
            time_seconds: row.get(11)?,
            bytes_sent: Self::get_u64(row, 12)?,
            bytes_recv: Self::get_u64(row, 13)?,
            bytes_sent_1s: Self::get_u64(row, 14)?,
            bytes_recv_1s: Self::get_u64(row, 15)?,
            error: row.get(16)?,
            extra,
        })
    }

    fn query_rows(
        &self,
        context: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> error::Result<Vec<LedgerRow>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| LedgerError::sqlite_context(context, e))?;
        let rows = stmt
            .query_map(params, Self::map_row)
            .map_err(|e| LedgerError::sqlite_context(context, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| LedgerError::sqlite_context(context, e))?;
        Ok(rows)
    }
}

impl LedgerBackend for SqliteLedger {
    #[allow(clippy::cast_possible_wrap)]
    fn append(&self, rows: &[LedgerRow]) -> error::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| LedgerError::sqlite_context("append: begin tx", e))?;
        let mut stmt = tx
            .prepare(
                "INSERT INTO ledger_rows \
                 (timestamp, run_id, workflow, technology, operation, label, merged, filename, \
                  step, file_bytes, row_count, time_seconds, bytes_sent, bytes_recv, \
                  bytes_sent_1s, bytes_recv_1s, error, extra) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )
            .map_err(|e| LedgerError::sqlite_context("append: prepare", e))?;

        let mut count = 0u64;
        for row in rows {
            let extra = serde_json::to_string(&row.extra)?;
            stmt.execute(rusqlite::params![
                row.timestamp.to_rfc3339(),
                row.run_id.as_str(),
                row.workflow.as_str(),
                row.technology.as_str(),
                row.operation,
                row.label,
                row.merged,
                row.filename,
                i64::from(row.step),
                row.file_bytes as i64,
                row.row_count as i64,
                row.time_seconds,
                row.bytes_sent as i64,
                row.bytes_recv as i64,
                row.bytes_sent_1s as i64,
                row.bytes_recv_1s as i64,
                row.error,
                extra,
            ])
            .map_err(|e| LedgerError::sqlite_context("append: execute", e))?;
            count += 1;
        }
        drop(stmt);
        tx.commit()
            .map_err(|e| LedgerError::sqlite_context("append: commit", e))?;

        Ok(count)
    }

    fn read_all(&self) -> error::Result<Vec<LedgerRow>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM ledger_rows ORDER BY seq");
        self.query_rows("read_all", &sql, [])
    }

    #[allow(clippy::cast_possible_wrap)]
    fn read_tail(&self, n: usize) -> error::Result<Vec<LedgerRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM \
             (SELECT * FROM ledger_rows ORDER BY seq DESC LIMIT ?1) ORDER BY seq"
        );
        self.query_rows("read_tail", &sql, [n as i64])
    }

    fn read_run(&self, run: &RunId) -> error::Result<Vec<LedgerRow>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM ledger_rows WHERE run_id = ?1 ORDER BY seq");
        self.query_rows("read_run", &sql, [run.as_str()])
    }

    fn latest_run_id(&self) -> error::Result<Option<RunId>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT run_id FROM ledger_rows ORDER BY seq DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(id) => Ok(Some(RunId::new(id))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(LedgerError::sqlite_context("latest_run_id", e)),
        }
    }

    fn location(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string())
    }
}
