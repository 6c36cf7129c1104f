//! Operation records and ledger rows.
//!
//! The runner produces one [`OperationRecord`] per attempted operation.
//! The ledger stores it as a [`LedgerRow`]: the record's fields plus the
//! run constants of the [`RunContext`] it belongs to.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::{RunContext, RunId, WorkflowKind};
use crate::technology::Technology;

// ── Inputs ──────────────────────────────────────────────────────────

/// The file an operation was pointed at, as it was when the step ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContext {
    pub filename: String,
    /// Size on disk in bytes.
    pub file_bytes: u64,
    pub row_count: u64,
    /// `true` for a cumulative file, `false` for a file unique to this step.
    pub merged: bool,
    pub step: u32,
}

// ── Outputs ─────────────────────────────────────────────────────────

/// Fixed-shape metadata an operation may report about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutput {
    /// Where the file ended up (remote URI, repository path, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Number of external commands the operation spawned.
    #[serde(default)]
    pub commands: u32,
    /// Bytes the operation wrote locally, when it knows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
}

/// Result of exactly one timed operation attempt.
///
/// `error` is empty on success. Timings and byte counts are never negative
/// by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation: String,
    pub technology: Technology,
    #[serde(flatten)]
    pub file: FileContext,
    pub time_seconds: f64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    /// Bytes sent during the idle window after the operation.
    pub bytes_sent_1s: u64,
    /// Bytes received during the idle window after the operation.
    pub bytes_recv_1s: u64,
    pub error: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub output: OperationOutput,
}

impl OperationRecord {
    /// A record for an operation that could not be attempted.
    ///
    /// Timings and byte counts are zero; `error` says why it was skipped.
    #[must_use]
    pub fn skipped(
        operation: impl Into<String>,
        technology: Technology,
        file: FileContext,
        error: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            technology,
            file,
            time_seconds: 0.0,
            bytes_sent: 0,
            bytes_recv: 0,
            bytes_sent_1s: 0,
            bytes_recv_1s: 0,
            error: error.into(),
            timestamp: Utc::now(),
            output: OperationOutput::default(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

// ── Ledger rows ─────────────────────────────────────────────────────

/// Flat, denormalized ledger row.
///
/// The named fields are the stable column set consumed by reporting
/// tools. Everything else a run or operation attached lives in `extra`;
/// rows are never rejected for carrying keys other rows lack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
    pub workflow: WorkflowKind,
    pub technology: Technology,
    pub operation: String,
    pub label: String,
    pub merged: bool,
    pub filename: String,
    pub step: u32,
    pub file_bytes: u64,
    pub row_count: u64,
    pub time_seconds: f64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub bytes_sent_1s: u64,
    pub bytes_recv_1s: u64,
    pub error: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LedgerRow {
    /// Stable column names, in export order.
    pub const COLUMNS: [&'static str; 17] = [
        "timestamp",
        "run_id",
        "workflow",
        "technology",
        "operation",
        "label",
        "merged",
        "filename",
        "step",
        "file_bytes",
        "row_count",
        "time_seconds",
        "bytes_sent",
        "bytes_recv",
        "bytes_sent_1s",
        "bytes_recv_1s",
        "error",
    ];

    /// Tag a record with its run's constants.
    #[must_use]
    pub fn new(run: &RunContext, record: OperationRecord) -> Self {
        let mut extra = run.params.clone();
        extra.insert(
            "run_timestamp".to_string(),
            serde_json::Value::String(run.created_at.to_rfc3339()),
        );
        extra.insert(
            "technologies".to_string(),
            serde_json::Value::Array(
                run.technologies
                    .iter()
                    .map(|tech| serde_json::Value::String(tech.as_str().to_string()))
                    .collect(),
            ),
        );
        for (tool, version) in &run.tool_versions {
            extra.insert(
                format!("version_{tool}"),
                serde_json::Value::String(version.clone()),
            );
        }
        if let Some(destination) = record.output.destination {
            extra.insert(
                "output_destination".to_string(),
                serde_json::Value::String(destination),
            );
        }
        if record.output.commands > 0 {
            extra.insert("output_commands".to_string(), record.output.commands.into());
        }
        if let Some(bytes) = record.output.bytes_written {
            extra.insert("output_bytes_written".to_string(), bytes.into());
        }

        Self {
            timestamp: record.timestamp,
            run_id: run.run_id.clone(),
            workflow: run.workflow,
            technology: record.technology,
            operation: record.operation,
            label: run.label.clone(),
            merged: record.file.merged,
            filename: record.file.filename,
            step: record.file.step,
            file_bytes: record.file.file_bytes,
            row_count: record.file.row_count,
            time_seconds: record.time_seconds,
            bytes_sent: record.bytes_sent,
            bytes_recv: record.bytes_recv,
            bytes_sent_1s: record.bytes_sent_1s,
            bytes_recv_1s: record.bytes_recv_1s,
            error: record.error,
            extra,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Render a fixed column as a flat string cell.
    ///
    /// Returns `None` for names outside [`LedgerRow::COLUMNS`].
    #[must_use]
    pub fn column(&self, name: &str) -> Option<String> {
        let value = match name {
            "timestamp" => self.timestamp.to_rfc3339(),
            "run_id" => self.run_id.to_string(),
            "workflow" => self.workflow.to_string(),
            "technology" => self.technology.to_string(),
            "operation" => self.operation.clone(),
            "label" => self.label.clone(),
            "merged" => self.merged.to_string(),
            "filename" => self.filename.clone(),
            "step" => self.step.to_string(),
            "file_bytes" => self.file_bytes.to_string(),
            "row_count" => self.row_count.to_string(),
            "time_seconds" => self.time_seconds.to_string(),
            "bytes_sent" => self.bytes_sent.to_string(),
            "bytes_recv" => self.bytes_recv.to_string(),
            "bytes_sent_1s" => self.bytes_sent_1s.to_string(),
            "bytes_recv_1s" => self.bytes_recv_1s.to_string(),
            "error" => self.error.clone(),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(error: &str) -> OperationRecord {
        OperationRecord {
            operation: "s3-upload".into(),
            technology: Technology::S3,
            file: FileContext {
                filename: "append.parquet".into(),
                file_bytes: 4096,
                row_count: 100,
                merged: true,
                step: 2,
            },
            time_seconds: 1.5,
            bytes_sent: 5000,
            bytes_recv: 300,
            bytes_sent_1s: 10,
            bytes_recv_1s: 20,
            error: error.into(),
            timestamp: Utc::now(),
            output: OperationOutput {
                destination: Some("s3://bucket/append.parquet".into()),
                commands: 1,
                bytes_written: None,
            },
        }
    }

    fn run() -> RunContext {
        let mut versions = BTreeMap::new();
        versions.insert("git".to_string(), "git version 2.43.0".to_string());
        RunContext::new(WorkflowKind::Append, "default", vec![Technology::S3])
            .with_param("seed", 0)
            .with_tool_versions(versions)
    }

    #[test]
    fn ledger_row_denormalizes_run_constants() {
        let run = run();
        let row = LedgerRow::new(&run, record(""));
        assert_eq!(row.run_id, run.run_id);
        assert_eq!(row.workflow, WorkflowKind::Append);
        assert_eq!(row.label, "default");
        assert_eq!(row.step, 2);
        assert!(row.merged);
        assert_eq!(row.extra["seed"], serde_json::json!(0));
        assert_eq!(row.extra["version_git"], serde_json::json!("git version 2.43.0"));
        assert_eq!(
            row.extra["output_destination"],
            serde_json::json!("s3://bucket/append.parquet")
        );
        assert!(row.extra.contains_key("run_timestamp"));
        assert_eq!(row.extra["technologies"], serde_json::json!(["s3"]));
        assert!(!row.extra.contains_key("output_bytes_written"));
    }

    #[test]
    fn skipped_record_is_an_error_with_zero_measurements() {
        let file = record("").file;
        let skipped = OperationRecord::skipped("s3-upload", Technology::S3, file.clone(), "missing");
        assert!(skipped.is_error());
        assert_eq!(skipped.file, file);
        assert_eq!(skipped.time_seconds, 0.0);
        assert_eq!(skipped.bytes_sent + skipped.bytes_recv, 0);
        assert_eq!(skipped.output, OperationOutput::default());
    }

    #[test]
    fn ledger_row_json_is_flat() {
        let row = LedgerRow::new(&run(), record("boom"));
        let json = serde_json::to_value(&row).unwrap();
        let obj = json.as_object().unwrap();
        for column in LedgerRow::COLUMNS {
            assert!(obj.contains_key(column), "missing column {column}");
        }
        assert_eq!(obj["technology"], "s3");
        assert_eq!(obj["seed"], 0);
        assert_eq!(obj["error"], "boom");

        let back: LedgerRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn column_renders_every_fixed_name() {
        let row = LedgerRow::new(&run(), record(""));
        for column in LedgerRow::COLUMNS {
            assert!(row.column(column).is_some(), "no cell for {column}");
        }
        assert_eq!(row.column("merged").as_deref(), Some("true"));
        assert_eq!(row.column("seed"), None);
    }

    #[test]
    fn error_flag_follows_error_string() {
        assert!(!record("").is_error());
        assert!(record("timeout").is_error());
    }
}
