//! Timed, isolated execution of a single operation.
//!
//! [`OperationRunner::run`] always produces exactly one record: errors and
//! panics inside the operation end up in the record's `error` field.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dvbench_types::{FileContext, OperationOutput, OperationRecord};

use crate::errors::OperationError;
use crate::netio::{NetCounters, SystemNetCounters};
use crate::operations::{Operation, OperationInput};

/// Length of the post-operation noise sample.
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(1);

/// Shared stop request, raised by the interrupt handler and observed at
/// safe checkpoints.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one runner call produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub record: OperationRecord,
    /// The remaining operations of the run should not start.
    pub stop_requested: bool,
}

pub struct OperationRunner {
    counters: Box<dyn NetCounters>,
    idle_window: Duration,
    stop: StopSignal,
}

impl Default for OperationRunner {
    fn default() -> Self {
        Self::new(Box::new(SystemNetCounters))
    }
}

impl OperationRunner {
    #[must_use]
    pub fn new(counters: Box<dyn NetCounters>) -> Self {
        Self {
            counters,
            idle_window: DEFAULT_IDLE_WINDOW,
            stop: StopSignal::new(),
        }
    }

    #[must_use]
    pub fn with_idle_window(mut self, idle_window: Duration) -> Self {
        self.idle_window = idle_window;
        self
    }

    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for requesting a stop from another thread.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    #[must_use]
    pub fn idle_window(&self) -> Duration {
        self.idle_window
    }

    /// Execute `operation` once and measure it.
    ///
    /// Byte counts are system-wide deltas, so they are only attributable
    /// while nothing else runs concurrently.
    pub fn run(
        &self,
        operation: &dyn Operation,
        input: &OperationInput,
        file: FileContext,
    ) -> RunOutcome {
        let timestamp = Utc::now();
        let before = self.counters.snapshot();
        let started = Instant::now();

        let result = catch_unwind(AssertUnwindSafe(|| operation.execute(input)))
            .unwrap_or_else(|payload| Err(OperationError::failed(panic_message(&*payload))));

        let time_seconds = started.elapsed().as_secs_f64();
        let after = self.counters.snapshot();
        let active = after.delta_since(&before);

        if !self.idle_window.is_zero() {
            std::thread::sleep(self.idle_window);
        }
        let idle = self.counters.snapshot().delta_since(&after);

        let interrupted = matches!(result, Err(OperationError::Interrupted));
        let stop_requested = interrupted || self.stop.is_requested();
        let (output, error) = match result {
            Ok(output) => (output, String::new()),
            Err(err) => {
                let message = err.to_string();
                let message = if message.is_empty() { "error".to_string() } else { message };
                (OperationOutput::default(), message)
            }
        };
        // A stop raised while the operation ran marks it as interrupted even
        // if it returned normally.
        let error = if stop_requested && error.is_empty() {
            OperationError::Interrupted.to_string()
        } else {
            error
        };

        if error.is_empty() {
            tracing::info!(
                technology = %operation.technology(),
                operation = operation.name(),
                step = file.step,
                file = %file.filename,
                time_seconds,
                bytes_sent = active.bytes_sent,
                "Operation completed"
            );
        } else {
            tracing::warn!(
                technology = %operation.technology(),
                operation = operation.name(),
                step = file.step,
                file = %file.filename,
                time_seconds,
                error = %error,
                "Operation failed"
            );
        }

        RunOutcome {
            record: OperationRecord {
                operation: operation.name().to_string(),
                technology: operation.technology(),
                file,
                time_seconds,
                bytes_sent: active.bytes_sent,
                bytes_recv: active.bytes_recv,
                bytes_sent_1s: idle.bytes_sent,
                bytes_recv_1s: idle.bytes_recv,
                error,
                timestamp,
                output,
            },
            stop_requested,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("panic: {detail}")
}
