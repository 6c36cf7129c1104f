//! Flat-file snapshots of ledger rows.
//!
//! CSV columns are the stable [`LedgerRow::COLUMNS`] followed by the sorted
//! union of every extra key seen in the exported rows. A row lacking a
//! key gets an empty cell.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use dvbench_types::LedgerRow;

use crate::error;

/// Flat-file format of an export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Jsonl,
}

impl ExportFormat {
    /// `.csv` exports CSV, everything else JSON lines.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Jsonl,
        }
    }
}

/// Overwrite `path` with `rows` in the format its extension names.
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`LedgerError`](crate::LedgerError) if the directory can't be
/// created or the file can't be written.
pub fn export_rows(path: &Path, rows: &[LedgerRow]) -> error::Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    match ExportFormat::from_path(path) {
        ExportFormat::Csv => write_csv(file, rows)?,
        ExportFormat::Jsonl => write_jsonl(file, rows)?,
    }
    tracing::info!(path = %path.display(), rows = rows.len(), "Exported ledger rows");
    Ok(rows.len())
}

/// Sorted union of extra keys across `rows`.
#[must_use]
pub fn extra_columns(rows: &[LedgerRow]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.extra.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render an extra value as a flat cell.
#[must_use]
pub fn extra_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write `rows` as CSV with a header line.
///
/// # Errors
///
/// Returns [`LedgerError::Csv`](crate::LedgerError::Csv) on write failure.
pub fn write_csv<W: Write>(writer: W, rows: &[LedgerRow]) -> error::Result<()> {
    let extras = extra_columns(rows);
    let mut out = csv::Writer::from_writer(writer);

    let header = LedgerRow::COLUMNS
        .iter()
        .copied()
        .chain(extras.iter().map(String::as_str));
    out.write_record(header)?;

    for row in rows {
        let mut record: Vec<String> = LedgerRow::COLUMNS
            .iter()
            .map(|c| row.column(c).unwrap_or_default())
            .collect();
        record.extend(extras.iter().map(|k| extra_cell(row.extra.get(k))));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Write `rows` as JSON lines.
///
/// # Errors
///
/// Returns [`LedgerError`](crate::LedgerError) on encode or write failure.
pub fn write_jsonl<W: Write>(writer: W, rows: &[LedgerRow]) -> error::Result<()> {
    let mut out = BufWriter::new(writer);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::row;

    fn with_extra(mut row: LedgerRow, key: &str, value: serde_json::Value) -> LedgerRow {
        row.extra.insert(key.into(), value);
        row
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.jsonl")), ExportFormat::Jsonl);
    }

    #[test]
    fn csv_header_is_fixed_columns_then_sorted_extras() {
        let rows = vec![
            with_extra(row("r", 0), "zeta", serde_json::json!(1)),
            with_extra(row("r", 1), "alpha", serde_json::json!("x")),
        ];
        let mut buf = Vec::new();
        write_csv(&mut buf, &rows).unwrap();

        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(&header[..LedgerRow::COLUMNS.len()], &LedgerRow::COLUMNS[..]);
        assert_eq!(&header[LedgerRow::COLUMNS.len()..], &["alpha", "zeta"]);

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        let alpha = LedgerRow::COLUMNS.len();
        assert_eq!(&records[0][alpha], "");
        assert_eq!(&records[0][alpha + 1], "1");
        assert_eq!(&records[1][alpha], "x");
        assert_eq!(&records[1][alpha + 1], "");
    }

    #[test]
    fn csv_of_no_rows_is_header_only() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("timestamp,run_id,workflow"));
    }

    #[test]
    fn export_rows_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/latest.jsonl");
        assert_eq!(export_rows(&path, &[row("r", 0), row("r", 1)]).unwrap(), 2);
        assert_eq!(export_rows(&path, &[row("r", 2)]).unwrap(), 1);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        let back: LedgerRow = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(back.step, 2);
    }

    #[test]
    fn extra_cells_flatten_json() {
        assert_eq!(extra_cell(None), "");
        assert_eq!(extra_cell(Some(&serde_json::Value::Null)), "");
        assert_eq!(extra_cell(Some(&serde_json::json!("v"))), "v");
        assert_eq!(extra_cell(Some(&serde_json::json!(true))), "true");
        assert_eq!(extra_cell(Some(&serde_json::json!([1, 2]))), "[1,2]");
    }
}
