//! JSON-lines implementation of [`LedgerBackend`].
//!
//! One row per line. Appends open the file in append mode, write the whole
//! batch at once and `fsync` before returning, so a successful append
//! survives a crash. Lines that fail to parse (a torn final write, a hand
//! edit) are skipped with a warning instead of failing the read.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use dvbench_types::LedgerRow;

use crate::backend::LedgerBackend;
use crate::error::{self, LedgerError};

/// Flat-file ledger at a single `.jsonl` path.
pub struct JsonlLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlLedger {
    /// Open (or prepare to create) a JSON-lines ledger at `path`.
    ///
    /// Existing content is kept; the file itself is created on first append.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the parent directory can't be created.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_writes(&self) -> error::Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Whether the existing file ends mid-line (an interrupted earlier write).
    fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::Start(len - 1))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }
}

impl LedgerBackend for JsonlLedger {
    fn append(&self, rows: &[LedgerRow]) -> error::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::with_capacity(rows.len() * 512);
        for row in rows {
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }

        let _guard = self.lock_writes()?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        if Self::ends_without_newline(&mut file)? {
            // Terminate the torn line so it stays isolated from the new rows.
            file.write_all(b"\n")?;
        }
        file.write_all(&buf)?;
        file.sync_data()?;

        Ok(rows.len() as u64)
    }

    fn read_all(&self) -> error::Result<Vec<LedgerRow>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerRow>(&line) {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = idx + 1,
                    error = %e,
                    "Skipping unreadable ledger line"
                ),
            }
        }
        Ok(rows)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::row;

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::open(&dir.path().join("stats.jsonl")).unwrap();
        assert!(ledger.read_all().unwrap().is_empty());
        assert!(ledger.latest_run_id().unwrap().is_none());
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/output/stats.jsonl");
        let ledger = JsonlLedger::open(&path).unwrap();
        ledger.append(&[row("r1", 0)]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::open(&dir.path().join("stats.jsonl")).unwrap();
        ledger.append(&[row("r1", 0), row("r1", 1)]).unwrap();
        ledger.append(&[row("r2", 0)]).unwrap();

        let steps: Vec<_> = ledger
            .read_all()
            .unwrap()
            .into_iter()
            .map(|r| (r.run_id.to_string(), r.step))
            .collect();
        assert_eq!(
            steps,
            vec![("r1".into(), 0), ("r1".into(), 1), ("r2".into(), 0)]
        );
    }

    #[test]
    fn empty_append_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.jsonl");
        let ledger = JsonlLedger::open(&path).unwrap();
        assert_eq!(ledger.append(&[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn torn_line_is_skipped_and_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.jsonl");
        let ledger = JsonlLedger::open(&path).unwrap();
        ledger.append(&[row("r1", 0)]).unwrap();

        // Simulate a crash in the middle of a write.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"timestamp\":\"2024").unwrap();
        drop(file);

        ledger.append(&[row("r1", 1)]).unwrap();
        let rows = ledger.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].step, 1);
    }

    #[test]
    fn tail_and_run_filters() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::open(&dir.path().join("stats.jsonl")).unwrap();
        ledger
            .append(&[row("a", 0), row("a", 1), row("b", 0), row("b", 1)])
            .unwrap();

        let tail = ledger.read_tail(3).unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].run_id.as_str(), "a");
        assert_eq!(ledger.read_tail(10).unwrap().len(), 4);
        assert!(ledger.read_tail(0).unwrap().is_empty());

        assert_eq!(ledger.latest_run_id().unwrap().unwrap().as_str(), "b");
        assert_eq!(ledger.read_run(&"a".into()).unwrap().len(), 2);
    }
}
