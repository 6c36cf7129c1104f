use std::path::Path;

use anyhow::{Context, Result};
use dvbench_ledger::{export_rows, Ledger};
use dvbench_types::LedgerRow;

use super::markdown_table;

/// Columns shown by `latest`, fixed columns and run extras alike.
const COLUMNS: [&str; 12] = [
    "operation",
    "time_seconds",
    "label",
    "technology",
    "step",
    "seed",
    "workflow",
    "file_bytes",
    "timestamp",
    "version_branch",
    "filename",
    "run_id",
];

/// Execute the `latest` command: show the last `n` rows, or the latest run.
pub fn execute(ledger_path: &Path, n: Option<usize>, export: Option<&Path>) -> Result<()> {
    let ledger = Ledger::open(ledger_path)
        .with_context(|| format!("Failed to open ledger: {}", ledger_path.display()))?;
    let rows = match n {
        Some(n) => ledger.read_tail(n)?,
        None => ledger.read_latest_run()?,
    };

    if rows.is_empty() {
        println!("No records in {}", ledger.location());
        return Ok(());
    }
    println!("{}", render(&rows));

    if let Some(path) = export {
        let written = export_rows(path, &rows)?;
        println!("\nExported {written} rows to {}", path.display());
    }
    Ok(())
}

fn cell(row: &LedgerRow, name: &str) -> String {
    row.column(name)
        .or_else(|| {
            row.extra.get(name).map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
        })
        .unwrap_or_default()
}

fn render(rows: &[LedgerRow]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| COLUMNS.iter().map(|name| cell(row, name)).collect())
        .collect();
    markdown_table(&COLUMNS, &cells)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use dvbench_types::{RunId, Technology, WorkflowKind};

    use super::*;

    fn row() -> LedgerRow {
        let mut extra = BTreeMap::new();
        extra.insert("seed".to_string(), serde_json::json!(7));
        extra.insert("version_branch".to_string(), serde_json::json!("main"));
        LedgerRow {
            timestamp: Utc::now(),
            run_id: RunId::new("run-1"),
            workflow: WorkflowKind::Append,
            technology: Technology::LfsGit,
            operation: "upload_lfs_git".into(),
            label: "append-2".into(),
            merged: true,
            filename: "append.parquet".into(),
            step: 1,
            file_bytes: 4096,
            row_count: 20,
            time_seconds: 1.5,
            bytes_sent: 100,
            bytes_recv: 50,
            bytes_sent_1s: 0,
            bytes_recv_1s: 0,
            error: String::new(),
            extra,
        }
    }

    #[test]
    fn cells_come_from_fixed_columns_and_extras() {
        let row = row();
        assert_eq!(cell(&row, "technology"), "lfs-git");
        assert_eq!(cell(&row, "seed"), "7");
        assert_eq!(cell(&row, "version_branch"), "main");
        assert_eq!(cell(&row, "missing"), "");
    }

    #[test]
    fn table_has_header_rule_and_rows() {
        let table = render(&[row(), row()]);
        assert_eq!(table.lines().count(), 4);
        assert!(table.starts_with("| operation "));
        assert!(table.contains("upload_lfs_git"));
    }

    #[test]
    fn export_writes_latest_run() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("stats.jsonl");
        {
            let mut ledger = Ledger::open(&ledger_path).unwrap();
            ledger.append(row());
            ledger.flush().unwrap();
        }
        let export = dir.path().join("output/latest.csv");
        execute(&ledger_path, None, Some(&export)).unwrap();
        let text = std::fs::read_to_string(export).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
