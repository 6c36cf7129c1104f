//! Technology table and workflow parameter types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dvbench_types::{ParseEnumError, Technology, WorkflowKind};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Technology table (YAML)
// ---------------------------------------------------------------------------

/// Top-level technology file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologiesConfig {
    pub version: String,
    #[serde(default)]
    pub technologies: BTreeMap<Technology, TechnologySpec>,
}

/// How one technology uploads a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnologySpec {
    /// Local checkout the step file is copied into before the upload.
    #[serde(default)]
    pub mirror: Option<PathBuf>,
    /// Recorded as the operation's destination, templated like `args`.
    #[serde(default)]
    pub destination: Option<String>,
    pub commands: Vec<CommandSpec>,
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

// ---------------------------------------------------------------------------
// Workflow enums
// ---------------------------------------------------------------------------

/// Serialization of generated step files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSuffix {
    Csv,
    #[default]
    Parquet,
}

impl FileSuffix {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for FileSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileSuffix {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.') {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(ParseEnumError::new("file suffix", other)),
        }
    }
}

/// How the append workflow grows its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppendStrategy {
    /// Regenerate the whole file at its new size every step.
    #[default]
    Regenerate,
    /// Keep one cumulative file and append blog rows to it.
    InPlace,
}

impl AppendStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regenerate => "regenerate",
            Self::InPlace => "in-place",
        }
    }
}

impl FromStr for AppendStrategy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regenerate" => Ok(Self::Regenerate),
            "in-place" => Ok(Self::InPlace),
            other => Err(ParseEnumError::new("append strategy", other)),
        }
    }
}

/// When buffered ledger rows are made durable during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushPolicy {
    EveryRecord,
    #[default]
    EveryStep,
}

impl FlushPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EveryRecord => "every-record",
            Self::EveryStep => "every-step",
        }
    }
}

impl FromStr for FlushPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "every-record" => Ok(Self::EveryRecord),
            "every-step" => Ok(Self::EveryStep),
            other => Err(ParseEnumError::new("flush policy", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow parameters
// ---------------------------------------------------------------------------

/// Everything one run needs to know about its step loop.
///
/// Row counts are signed so that a negative request reaches the generator
/// and fails there with `InvalidShape` instead of wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowParams {
    pub workflow: WorkflowKind,
    /// Invocation order. Empty means every upload technology.
    pub technologies: Vec<Technology>,
    pub steps: u32,
    pub start_rows: i64,
    pub add_rows: i64,
    pub suffix: FileSuffix,
    pub seed: u64,
    pub label: Option<String>,
    /// Realistic rows instead of the numeric matrix.
    pub diverse: bool,
    pub append_strategy: AppendStrategy,
    /// Feature columns added per step in the features workflow.
    pub feature_growth: usize,
    pub data_dir: PathBuf,
    /// Taxi-merge input; mock files are generated when absent.
    pub input_dir: Option<PathBuf>,
    /// Number of mock files for taxi-merge.
    pub file_count: usize,
    pub idle_window: Duration,
    pub flush_policy: FlushPolicy,
}

impl WorkflowParams {
    /// Defaults for `workflow`, matching the `benchmark` command.
    #[must_use]
    pub fn new(workflow: WorkflowKind) -> Self {
        Self {
            workflow,
            technologies: Vec::new(),
            steps: 1,
            start_rows: 100_000_000,
            add_rows: 10_000_000,
            suffix: FileSuffix::default(),
            seed: 0,
            label: None,
            diverse: false,
            append_strategy: AppendStrategy::default(),
            feature_growth: 1,
            data_dir: PathBuf::from("data"),
            input_dir: None,
            file_count: 10,
            idle_window: Duration::from_secs(1),
            flush_policy: FlushPolicy::default(),
        }
    }

    /// The label recorded on every row.
    ///
    /// An explicit label always wins. Append runs without one are labeled
    /// `random` for a single step and `append-<steps>` otherwise.
    #[must_use]
    pub fn resolve_label(&self) -> String {
        match (&self.label, self.workflow) {
            (Some(label), _) => label.clone(),
            (None, WorkflowKind::Append) if self.steps == 1 => "random".to_string(),
            (None, WorkflowKind::Append) => format!("append-{}", self.steps),
            (None, _) => "default".to_string(),
        }
    }

    /// Technologies in invocation order, defaulting to every upload backend.
    #[must_use]
    pub fn resolved_technologies(&self) -> Vec<Technology> {
        if self.technologies.is_empty() {
            Technology::uploads().collect()
        } else {
            self.technologies.clone()
        }
    }

    /// Run-constant parameters denormalized onto every ledger row.
    #[must_use]
    pub fn to_params(&self) -> BTreeMap<String, serde_json::Value> {
        let mut params = BTreeMap::new();
        params.insert("steps".to_string(), self.steps.into());
        params.insert("start_rows".to_string(), self.start_rows.into());
        params.insert("add_rows".to_string(), self.add_rows.into());
        params.insert("suffix".to_string(), self.suffix.as_str().into());
        params.insert("seed".to_string(), self.seed.into());
        params.insert("diverse".to_string(), self.diverse.into());
        params.insert(
            "data_dir".to_string(),
            self.data_dir.display().to_string().into(),
        );
        match self.workflow {
            WorkflowKind::Append => {
                params.insert(
                    "append_strategy".to_string(),
                    self.append_strategy.as_str().into(),
                );
            }
            WorkflowKind::Features => {
                params.insert("feature_growth".to_string(), self.feature_growth.into());
            }
            WorkflowKind::TaxiMerge => {
                params.insert("file_count".to_string(), self.file_count.into());
                if let Some(dir) = &self.input_dir {
                    params.insert("input_dir".to_string(), dir.display().to_string().into());
                }
            }
            WorkflowKind::Split | WorkflowKind::Random => {}
        }
        params
    }
}
