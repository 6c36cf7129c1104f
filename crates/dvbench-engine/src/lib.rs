//! Dataset generation, instrumented operations and run orchestration for
//! dvbench.

pub mod config;
pub mod environment;
pub mod errors;
pub mod generator;
pub mod netio;
pub mod operations;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod runner;

// Re-export public API for convenience
pub use errors::{EngineError, GenerateError, OperationError};
pub use operations::{CommandOperation, FnOperation, MergeOperation, Operation, OperationInput};
pub use orchestrator::Orchestrator;
pub use registry::TechnologyRegistry;
pub use result::RunSummary;
pub use runner::{OperationRunner, RunOutcome, StopSignal};
