//! Engine error model.
//!
//! Three layers, matching how far a failure is allowed to travel:
//! [`OperationError`] never leaves the runner (it becomes a record's
//! `error` string), [`GenerateError`] aborts the current run, and
//! [`EngineError`] is everything the orchestrator can return.

use dvbench_ledger::LedgerError;
use dvbench_types::Technology;

// ---------------------------------------------------------------------------
// GenerateError
// ---------------------------------------------------------------------------

/// Dataset generation or serialization failure.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Negative row count, mismatched shapes, or out-of-range boundaries.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Failure of one measured operation. Recovered by the runner.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Free-form failure reported by the operation itself.
    #[error("{0}")]
    Failed(String),

    /// The operation observed a stop request and gave up.
    #[error("interrupted")]
    Interrupted,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An external program exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl OperationError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Fatal errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("dataset generation failed: {0}")]
    Generate(#[from] GenerateError),

    /// Measurements could not be made durable.
    #[error("ledger write failed: {0}")]
    Ledger(#[from] LedgerError),

    /// The workflow names a technology the registry has no entry for.
    #[error("unknown technology '{0}': no operation registered")]
    UnknownTechnology(Technology),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_mentions_program_and_stderr() {
        let err = OperationError::CommandFailed {
            program: "dvc".into(),
            status: "exit status: 1".into(),
            stderr: "not a dvc repository".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`dvc`"));
        assert!(msg.contains("not a dvc repository"));
    }

    #[test]
    fn interrupted_displays_plainly() {
        assert_eq!(OperationError::Interrupted.to_string(), "interrupted");
    }

    #[test]
    fn unknown_technology_names_wire_name() {
        let err = EngineError::UnknownTechnology(Technology::LfsS3);
        assert!(err.to_string().contains("'lfs-s3'"));
    }

    #[test]
    fn generate_errors_convert_upward() {
        let err: EngineError = GenerateError::InvalidShape("row count must be >= 0".into()).into();
        assert!(matches!(err, EngineError::Generate(GenerateError::InvalidShape(_))));
        let op: OperationError = GenerateError::InvalidShape("x".into()).into();
        assert_eq!(op.to_string(), "invalid shape: x");
    }
}
