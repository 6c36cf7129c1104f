//! Shared dvbench model types.
//!
//! Technologies, workflow kinds, run constants, and the per-operation
//! records that flow from the runner into the ledger. This crate has no
//! I/O and is safe to depend on from every other workspace member.

pub mod record;
pub mod run;
pub mod technology;

pub use record::{FileContext, LedgerRow, OperationOutput, OperationRecord};
pub use run::{RunContext, RunId, WorkflowKind};
pub use technology::{ParseEnumError, Technology};
