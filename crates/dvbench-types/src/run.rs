//! Run identity and run-constant parameters.
//!
//! A [`RunContext`] is built once when a workflow starts and its fields
//! are copied onto every ledger row the run produces.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::technology::{ParseEnumError, Technology};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque run identifier, unique per workflow invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for RunId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

// ---------------------------------------------------------------------------
// Workflow kinds
// ---------------------------------------------------------------------------

/// Shape of the step loop a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    /// One file that grows every step.
    Append,
    /// Train/validation/test partitions of a growing set.
    Split,
    /// Fixed rows with a growing number of feature columns.
    Features,
    /// Fixed size, fresh content every step.
    Random,
    /// A directory of files uploaded one by one and folded into a merged file.
    TaxiMerge,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 5] = [
        Self::Append,
        Self::Split,
        Self::Features,
        Self::Random,
        Self::TaxiMerge,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Split => "split",
            Self::Features => "features",
            Self::Random => "random",
            Self::TaxiMerge => "taxi-merge",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("workflow", s))
    }
}

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// Constants shared by every record of one run.
///
/// `params` holds the resolved workflow parameters (seed, row counts,
/// suffix, ...) and `tool_versions` the probed backend tool versions.
/// Both are denormalized onto each ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: RunId,
    pub workflow: WorkflowKind,
    pub label: String,
    pub technologies: Vec<Technology>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}

impl RunContext {
    /// Start a new run with a freshly generated id.
    #[must_use]
    pub fn new(workflow: WorkflowKind, label: impl Into<String>, technologies: Vec<Technology>) -> Self {
        Self {
            run_id: RunId::generate(),
            workflow,
            label: label.into(),
            technologies,
            created_at: Utc::now(),
            params: BTreeMap::new(),
            tool_versions: BTreeMap::new(),
        }
    }

    /// Attach a run-constant parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Attach probed tool versions.
    #[must_use]
    pub fn with_tool_versions(mut self, versions: BTreeMap<String, String>) -> Self {
        self.tool_versions = versions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_display_and_as_str() {
        let id = RunId::new("run-1");
        assert_eq!(id.as_str(), "run-1");
        assert_eq!(id.to_string(), "run-1");
    }

    #[test]
    fn generated_run_ids_differ() {
        assert_ne!(RunId::generate(), RunId::generate());
    }

    #[test]
    fn run_id_serde_transparent() {
        let json = serde_json::to_string(&RunId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn workflow_kind_wire_names() {
        for kind in WorkflowKind::ALL {
            assert_eq!(kind.as_str().parse::<WorkflowKind>().unwrap(), kind);
        }
        let json = serde_json::to_string(&WorkflowKind::TaxiMerge).unwrap();
        assert_eq!(json, "\"taxi-merge\"");
        assert!("taxi".parse::<WorkflowKind>().is_err());
    }

    #[test]
    fn context_builder_collects_params() {
        let ctx = RunContext::new(WorkflowKind::Split, "exp", vec![Technology::S3])
            .with_param("seed", 7)
            .with_param("suffix", "parquet");
        assert_eq!(ctx.params["seed"], serde_json::json!(7));
        assert_eq!(ctx.params["suffix"], serde_json::json!("parquet"));
        assert_eq!(ctx.label, "exp");
    }
}
