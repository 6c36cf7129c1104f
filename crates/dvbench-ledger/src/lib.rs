//! Metrics ledger for dvbench.
//!
//! Provides the [`LedgerBackend`] trait with [`JsonlLedger`] and
//! [`SqliteLedger`] implementations, the buffering [`Ledger`] the
//! orchestrator records into, flat-file exports, and a step-aggregated
//! view for reporting.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod export;
pub mod jsonl;
pub mod ledger;
pub mod sqlite;
pub mod view;

pub use backend::LedgerBackend;
pub use error::{LedgerError, Result};
pub use export::{export_rows, ExportFormat};
pub use jsonl::JsonlLedger;
pub use ledger::{Ledger, LedgerFormat};
pub use sqlite::SqliteLedger;
pub use view::{summarize_steps, StepSummary};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use dvbench_types::{LedgerRow, RunId, Technology, WorkflowKind};

    pub fn row_for(run: &str, step: u32, technology: Technology) -> LedgerRow {
        LedgerRow {
            timestamp: Utc::now(),
            run_id: RunId::new(run),
            workflow: WorkflowKind::Append,
            technology,
            operation: format!("{technology}-upload"),
            label: "default".into(),
            merged: true,
            filename: "append.parquet".into(),
            step,
            file_bytes: 2048,
            row_count: 10,
            time_seconds: 0.25,
            bytes_sent: 4096,
            bytes_recv: 128,
            bytes_sent_1s: 3,
            bytes_recv_1s: 5,
            error: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn row(run: &str, step: u32) -> LedgerRow {
        row_for(run, step, Technology::S3)
    }
}
