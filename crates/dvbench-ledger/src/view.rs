//! Step-aggregated view over per-operation rows.

use std::collections::HashMap;

use dvbench_types::{LedgerRow, RunId, Technology};
use serde::Serialize;

/// Totals for one (run, step, technology) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub run_id: RunId,
    pub step: u32,
    pub technology: Technology,
    pub operations: usize,
    pub errors: usize,
    pub time_seconds: f64,
    pub file_bytes: u64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Group rows by (run, step, technology), summing time and bytes.
///
/// Groups appear in the order their first row appears.
#[must_use]
pub fn summarize_steps(rows: &[LedgerRow]) -> Vec<StepSummary> {
    let mut index: HashMap<(RunId, u32, Technology), usize> = HashMap::new();
    let mut out: Vec<StepSummary> = Vec::new();

    for row in rows {
        let key = (row.run_id.clone(), row.step, row.technology);
        let slot = *index.entry(key).or_insert_with(|| {
            out.push(StepSummary {
                run_id: row.run_id.clone(),
                step: row.step,
                technology: row.technology,
                operations: 0,
                errors: 0,
                time_seconds: 0.0,
                file_bytes: 0,
                bytes_sent: 0,
                bytes_recv: 0,
            });
            out.len() - 1
        });
        let summary = &mut out[slot];
        summary.operations += 1;
        summary.errors += usize::from(row.is_error());
        summary.time_seconds += row.time_seconds;
        summary.file_bytes = summary.file_bytes.saturating_add(row.file_bytes);
        summary.bytes_sent = summary.bytes_sent.saturating_add(row.bytes_sent);
        summary.bytes_recv = summary.bytes_recv.saturating_add(row.bytes_recv);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{row, row_for};

    #[test]
    fn groups_split_files_into_one_step() {
        let mut rows = Vec::new();
        for _ in 0..3 {
            rows.push(row_for("r", 0, Technology::S3));
        }
        rows.push(row_for("r", 0, Technology::Dvc));
        rows.push(row_for("r", 1, Technology::S3));

        let summary = summarize_steps(&rows);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].technology, Technology::S3);
        assert_eq!(summary[0].operations, 3);
        assert_eq!(summary[0].bytes_sent, 3 * rows[0].bytes_sent);
        assert_eq!(summary[1].technology, Technology::Dvc);
        assert_eq!(summary[2].step, 1);
    }

    #[test]
    fn counts_errors() {
        let mut failed = row("r", 0);
        failed.error = "exit status 1".into();
        let summary = summarize_steps(&[row("r", 0), failed]);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].errors, 1);
        assert!((summary[0].time_seconds - 2.0 * row("r", 0).time_seconds).abs() < 1e-9);
    }

    #[test]
    fn separate_runs_stay_separate() {
        let summary = summarize_steps(&[row("a", 0), row("b", 0)]);
        assert_eq!(summary.len(), 2);
    }
}
