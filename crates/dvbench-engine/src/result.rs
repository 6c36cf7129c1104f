//! Run result types.

use dvbench_types::{RunId, WorkflowKind};

/// Outcome of one orchestrated run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub workflow: WorkflowKind,
    /// Steps whose every operation ran.
    pub steps_completed: u32,
    pub records: usize,
    pub failed_records: usize,
    /// The run ended early on a stop request.
    pub stopped: bool,
    pub duration_secs: f64,
}

impl RunSummary {
    #[must_use]
    pub fn new(run_id: RunId, workflow: WorkflowKind) -> Self {
        Self {
            run_id,
            workflow,
            steps_completed: 0,
            records: 0,
            failed_records: 0,
            stopped: false,
            duration_secs: 0.0,
        }
    }

    #[must_use]
    pub fn succeeded_records(&self) -> usize {
        self.records - self.failed_records
    }
}
