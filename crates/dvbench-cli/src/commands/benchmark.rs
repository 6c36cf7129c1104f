use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use dvbench_engine::config::{AppendStrategy, FileSuffix, FlushPolicy, WorkflowParams};
use dvbench_engine::environment::probe_tool_versions;
use dvbench_engine::{OperationRunner, Orchestrator, RunSummary, TechnologyRegistry};
use dvbench_ledger::Ledger;
use dvbench_types::{RunContext, Technology, WorkflowKind};

use super::load_technologies;

/// Workflow parameters accepted by `benchmark`.
#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    /// Workflow to run (append, split, features, random, taxi-merge)
    pub workflow: WorkflowKind,
    /// Technologies in invocation order (default: every upload backend)
    #[arg(short, long = "tech", value_delimiter = ',')]
    pub technologies: Vec<Technology>,
    /// Number of steps
    #[arg(long, default_value_t = 1)]
    pub steps: u32,
    /// Rows at step 0
    #[arg(long, default_value_t = 100_000_000, allow_negative_numbers = true)]
    pub start_rows: i64,
    /// Rows added per step
    #[arg(long, default_value_t = 10_000_000, allow_negative_numbers = true)]
    pub add_rows: i64,
    /// Step file format (parquet or csv)
    #[arg(long, default_value = "parquet")]
    pub suffix: FileSuffix,
    /// Generate realistic person rows instead of the numeric matrix
    #[arg(long)]
    pub diverse: bool,
    /// Experiment label recorded on every row
    #[arg(long)]
    pub label: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// How the append workflow grows its file (regenerate or in-place)
    #[arg(long, default_value = "regenerate")]
    pub append_strategy: AppendStrategy,
    /// Feature columns added per step in the features workflow
    #[arg(long, default_value_t = 1)]
    pub feature_growth: usize,
    /// Directory for generated step files
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,
    /// Directory of .parquet inputs for taxi-merge (default: generated mock files)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,
    /// Mock files to generate for taxi-merge
    #[arg(long, default_value_t = 10)]
    pub file_count: usize,
    /// Seconds of post-operation network sampling
    #[arg(long, default_value_t = 1.0)]
    pub idle_window: f64,
    /// When ledger rows are flushed (every-record or every-step)
    #[arg(long, default_value = "every-step")]
    pub flush_policy: FlushPolicy,
}

impl BenchmarkArgs {
    /// # Errors
    ///
    /// Returns an error if the idle window is negative or not finite.
    pub fn to_params(&self) -> Result<WorkflowParams> {
        let idle_window = Duration::try_from_secs_f64(self.idle_window)
            .context("--idle-window must be a non-negative number of seconds")?;
        Ok(WorkflowParams {
            workflow: self.workflow,
            technologies: self.technologies.clone(),
            steps: self.steps,
            start_rows: self.start_rows,
            add_rows: self.add_rows,
            suffix: self.suffix,
            seed: self.seed,
            label: self.label.clone(),
            diverse: self.diverse,
            append_strategy: self.append_strategy,
            feature_growth: self.feature_growth,
            data_dir: self.data_dir.clone(),
            input_dir: self.input_dir.clone(),
            file_count: self.file_count,
            idle_window,
            flush_policy: self.flush_policy,
        })
    }
}

/// Parameters of the `test` smoke run: one ten-row append step.
pub fn smoke_params(technologies: Vec<Technology>) -> WorkflowParams {
    let mut params = WorkflowParams::new(WorkflowKind::Append);
    params.technologies = technologies;
    params.steps = 1;
    params.start_rows = 10;
    params.add_rows = 10;
    params.label = Some("test".to_string());
    params
}

/// Execute the `benchmark` and `test` commands: run one workflow and
/// append its records to the ledger.
pub fn execute(params: &WorkflowParams, ledger_path: &Path, config_path: Option<&Path>) -> Result<()> {
    // 1. Load and validate the technology table
    let config = load_technologies(config_path)?;
    let registry = TechnologyRegistry::from_config(&config);

    // 2. Wire the runner and the interrupt handler
    let runner = OperationRunner::default().with_idle_window(params.idle_window);
    let orchestrator = Orchestrator::new(registry, runner);
    let stop = orchestrator.stop_signal();
    ctrlc::set_handler(move || {
        tracing::warn!("Interrupt received, stopping after the current operation");
        stop.request();
    })
    .context("Failed to install interrupt handler")?;

    // 3. Describe the run
    let run = params
        .to_params()
        .into_iter()
        .fold(
            RunContext::new(
                params.workflow,
                params.resolve_label(),
                params.resolved_technologies(),
            ),
            |run, (key, value)| run.with_param(&key, value),
        )
        .with_tool_versions(probe_tool_versions());

    // 4. Run
    let mut ledger = Ledger::open(ledger_path)
        .with_context(|| format!("Failed to open ledger: {}", ledger_path.display()))?;
    let summary = orchestrator.run(params, &run, &mut ledger)?;

    print_summary(&summary, &run, &ledger.location());
    Ok(())
}

fn print_summary(summary: &RunSummary, run: &RunContext, location: &str) {
    let verb = if summary.stopped { "stopped" } else { "completed" };
    println!("Run '{}' {verb}.", summary.run_id);
    println!("  Workflow:        {}", summary.workflow);
    println!("  Label:           {}", run.label);
    println!("  Steps:           {}", summary.steps_completed);
    println!("  Operations:      {}", summary.records);
    println!("  Failed:          {}", summary.failed_records);
    println!("  Duration:        {:.2}s", summary.duration_secs);
    println!("  Ledger:          {location}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_run_is_one_small_labeled_step() {
        let params = smoke_params(Vec::new());
        assert_eq!(params.resolve_label(), "test");
        assert_eq!((params.steps, params.start_rows), (1, 10));
        assert_eq!(params.resolved_technologies().len(), 7);
    }
}
