//! Run orchestrator: drives a workflow's step loop.
//!
//! Per step: generate the step's files, run every technology over them
//! through the [`OperationRunner`], hand each record to the ledger, then
//! remove the step's scratch files and mirror copies whatever happened.
//! Operations run strictly one at a time, since the runner attributes
//! network bytes by diffing system-wide counters.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use dvbench_ledger::Ledger;
use dvbench_types::{
    FileContext, LedgerRow, OperationRecord, RunContext, Technology, WorkflowKind,
};

use crate::config::{validate_params, AppendStrategy, FlushPolicy, WorkflowParams};
use crate::errors::EngineError;
use crate::generator::{
    append_to_file, checked_rows, count_rows, export, generate, generate_features,
    generate_mock_files, merge_columns, split, BlogRowGenerator, SplitBoundaries,
};
use crate::operations::{copy_into_mirror, Operation, OperationInput};
use crate::registry::TechnologyRegistry;
use crate::result::RunSummary;
use crate::runner::{OperationRunner, StopSignal};

// ---------------------------------------------------------------------------
// Step plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StepFile {
    path: PathBuf,
    merged: bool,
}

impl StepFile {
    fn fresh(path: PathBuf) -> Self {
        Self {
            path,
            merged: false,
        }
    }

    fn cumulative(path: PathBuf) -> Self {
        Self { path, merged: true }
    }
}

#[derive(Debug, Clone)]
enum Phase {
    /// Every technology handles every file, technology-major.
    Upload(Vec<StepFile>),
    /// Fold `fresh` into `target` with the merge operation.
    Merge { fresh: PathBuf, target: PathBuf },
}

#[derive(Debug, Default)]
struct StepPlan {
    phases: Vec<Phase>,
    /// Removed when the step ends.
    scratch: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct StepOutcome {
    records: usize,
    failed: usize,
    stop: bool,
}

// ---------------------------------------------------------------------------
// Cross-step state
// ---------------------------------------------------------------------------

/// State that outlives a single step. Removed at TERMINATE.
#[derive(Default)]
struct WorkflowState {
    /// Taxi-merge inputs in processing order.
    inputs: Vec<PathBuf>,
    /// File that accumulates across steps.
    cumulative: Option<PathBuf>,
    mock_dir: Option<PathBuf>,
    blog: Option<BlogRowGenerator>,
}

impl WorkflowState {
    fn prepare(&mut self, params: &WorkflowParams) -> Result<(), EngineError> {
        match params.workflow {
            WorkflowKind::Append if params.append_strategy == AppendStrategy::InPlace => {
                let path = step_path(params, "append");
                remove_file_quietly(&path);
                self.cumulative = Some(path);
                self.blog = Some(BlogRowGenerator::new(params.seed));
            }
            WorkflowKind::TaxiMerge => {
                self.inputs = if let Some(dir) = &params.input_dir {
                    list_parquet_files(dir)?
                } else {
                    let dir = params.data_dir.join("mock");
                    self.mock_dir = Some(dir.clone());
                    let rows = checked_rows(params.start_rows)?;
                    generate_mock_files(&dir, params.file_count, rows, params.seed)?
                };
                let merged = params.data_dir.join("merged.parquet");
                remove_file_quietly(&merged);
                self.cumulative = Some(merged);
            }
            _ => {}
        }
        Ok(())
    }

    fn step_count(&self, params: &WorkflowParams) -> u32 {
        if params.workflow == WorkflowKind::TaxiMerge {
            let files = u32::try_from(self.inputs.len()).unwrap_or(u32::MAX);
            params.steps.min(files)
        } else {
            params.steps
        }
    }

    fn terminate(&mut self) {
        if let Some(path) = self.cumulative.take() {
            remove_file_quietly(&path);
        }
        if let Some(dir) = self.mock_dir.take() {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => tracing::debug!(dir = %dir.display(), "Removed mock directory"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove mock directory");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    registry: TechnologyRegistry,
    runner: OperationRunner,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: TechnologyRegistry, runner: OperationRunner) -> Self {
        Self { registry, runner }
    }

    #[must_use]
    pub fn registry(&self) -> &TechnologyRegistry {
        &self.registry
    }

    /// Handle for requesting a graceful stop, e.g. from a Ctrl-C handler.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.runner.stop_signal()
    }

    /// Execute one run of `params.workflow`, appending every record to
    /// `ledger`.
    ///
    /// Buffered rows are flushed before returning, on success, on a stop
    /// request and on a fatal error alike.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTechnology`] before anything is
    /// generated if a technology has no registered operation,
    /// [`EngineError::Generate`] if a step's data can't be produced, and
    /// [`EngineError::Ledger`] if records can't be made durable. Failing
    /// operations are not errors; they are recorded.
    pub fn run(
        &self,
        params: &WorkflowParams,
        run: &RunContext,
        ledger: &mut Ledger,
    ) -> Result<RunSummary, EngineError> {
        let started = Instant::now();
        validate_params(params).map_err(|e| EngineError::Config(format!("{e:#}")))?;
        let technologies = self.resolve_technologies(params)?;

        tracing::info!(
            run_id = %run.run_id,
            workflow = %params.workflow,
            label = %run.label,
            technologies = ?technologies.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
            steps = params.steps,
            "Run started"
        );

        let mut summary = RunSummary::new(run.run_id.clone(), params.workflow);
        let mut state = WorkflowState::default();
        let result = state.prepare(params).and_then(|()| {
            self.run_steps(params, &technologies, &mut state, run, ledger, &mut summary)
        });
        state.terminate();
        let flushed = ledger.flush();

        if let Err(err) = result {
            if let Err(flush_err) = flushed {
                tracing::error!(error = %flush_err, "Failed to flush ledger after fatal error");
            }
            tracing::error!(run_id = %run.run_id, error = %err, "Run aborted");
            return Err(err);
        }
        flushed?;

        summary.duration_secs = started.elapsed().as_secs_f64();
        tracing::info!(
            run_id = %run.run_id,
            steps = summary.steps_completed,
            records = summary.records,
            failed = summary.failed_records,
            stopped = summary.stopped,
            duration_secs = summary.duration_secs,
            "Run finished"
        );
        Ok(summary)
    }

    /// Resolve the invocation order and check every entry is registered.
    fn resolve_technologies(&self, params: &WorkflowParams) -> Result<Vec<Technology>, EngineError> {
        let technologies = params.resolved_technologies();
        for &tech in &technologies {
            self.registry.get(tech)?;
        }
        if params.workflow == WorkflowKind::TaxiMerge {
            self.registry.get(Technology::Merge)?;
        }
        Ok(technologies)
    }

    fn run_steps(
        &self,
        params: &WorkflowParams,
        technologies: &[Technology],
        state: &mut WorkflowState,
        run: &RunContext,
        ledger: &mut Ledger,
        summary: &mut RunSummary,
    ) -> Result<(), EngineError> {
        for step in 0..state.step_count(params) {
            if self.runner.stop_signal().is_requested() {
                summary.stopped = true;
                break;
            }
            tracing::info!(step, workflow = %params.workflow, "Step started");

            let mut plan = StepPlan::default();
            let mut mirror_copies = Vec::new();
            let result = plan_step(params, state, step, &mut plan).and_then(|()| {
                self.execute_step(&plan, technologies, step, run, ledger, params, &mut mirror_copies)
            });
            for path in plan.scratch.iter().chain(&mirror_copies) {
                remove_file_quietly(path);
            }

            let outcome = result?;
            summary.records += outcome.records;
            summary.failed_records += outcome.failed;
            if outcome.stop {
                tracing::warn!(step, "Stop requested, ending run after cleanup");
                summary.stopped = true;
                break;
            }
            if params.flush_policy == FlushPolicy::EveryStep {
                ledger.flush()?;
            }
            summary.steps_completed += 1;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_step(
        &self,
        plan: &StepPlan,
        technologies: &[Technology],
        step: u32,
        run: &RunContext,
        ledger: &mut Ledger,
        params: &WorkflowParams,
        mirror_copies: &mut Vec<PathBuf>,
    ) -> Result<StepOutcome, EngineError> {
        let mut outcome = StepOutcome::default();
        for phase in &plan.phases {
            match phase {
                Phase::Upload(files) => {
                    let contexts = files
                        .iter()
                        .map(|f| upload_context(&f.path, f.merged, step))
                        .collect::<Result<Vec<_>, _>>()?;
                    for &tech in technologies {
                        let entry = self.registry.get(tech)?;
                        for (file, context) in files.iter().zip(&contexts) {
                            if self.runner.stop_signal().is_requested() {
                                outcome.stop = true;
                                return Ok(outcome);
                            }
                            let context = match context {
                                UploadContext::Present(context) => context,
                                UploadContext::Missing(context) => {
                                    let record = OperationRecord::skipped(
                                        entry.operation.name(),
                                        tech,
                                        context.clone(),
                                        format!("skipped: {} does not exist", context.filename),
                                    );
                                    tracing::warn!(
                                        technology = %tech,
                                        step,
                                        file = %context.filename,
                                        "Upload skipped, file does not exist"
                                    );
                                    append_record(
                                        record,
                                        false,
                                        run,
                                        ledger,
                                        params.flush_policy,
                                        &mut outcome,
                                    )?;
                                    continue;
                                }
                            };
                            let mut input = OperationInput::new(&file.path);
                            if let Some(mirror) = entry.mirror() {
                                match copy_into_mirror(&file.path, mirror) {
                                    Ok(copy) => mirror_copies.push(copy),
                                    Err(e) => tracing::warn!(
                                        technology = %tech,
                                        mirror = %mirror.display(),
                                        error = %e,
                                        "Failed to copy step file into mirror"
                                    ),
                                }
                                input = input.with_mirror(mirror);
                            }
                            self.measure(
                                entry.operation.as_ref(),
                                &input,
                                context.clone(),
                                run,
                                ledger,
                                params.flush_policy,
                                &mut outcome,
                            )?;
                            if outcome.stop {
                                return Ok(outcome);
                            }
                        }
                    }
                }
                Phase::Merge { fresh, target } => {
                    if self.runner.stop_signal().is_requested() {
                        outcome.stop = true;
                        return Ok(outcome);
                    }
                    let entry = self.registry.get(Technology::Merge)?;
                    let context = file_context(fresh, false, step)?;
                    let input = OperationInput::new(fresh).with_merged_target(target);
                    self.measure(
                        entry.operation.as_ref(),
                        &input,
                        context,
                        run,
                        ledger,
                        params.flush_policy,
                        &mut outcome,
                    )?;
                    if outcome.stop {
                        return Ok(outcome);
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// Run one operation and record it.
    #[allow(clippy::too_many_arguments)]
    fn measure(
        &self,
        operation: &dyn Operation,
        input: &OperationInput,
        context: FileContext,
        run: &RunContext,
        ledger: &mut Ledger,
        flush_policy: FlushPolicy,
        outcome: &mut StepOutcome,
    ) -> Result<(), EngineError> {
        let result = self.runner.run(operation, input, context);
        append_record(result.record, result.stop_requested, run, ledger, flush_policy, outcome)
    }
}

/// Hand one record to the ledger and count it.
fn append_record(
    record: OperationRecord,
    stop_requested: bool,
    run: &RunContext,
    ledger: &mut Ledger,
    flush_policy: FlushPolicy,
    outcome: &mut StepOutcome,
) -> Result<(), EngineError> {
    outcome.records += 1;
    if record.is_error() {
        outcome.failed += 1;
    }
    outcome.stop |= stop_requested;
    ledger.append(LedgerRow::new(run, record));
    if flush_policy == FlushPolicy::EveryRecord {
        ledger.flush()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GENERATE
// ---------------------------------------------------------------------------

/// Produce the files for `step` and describe what runs over them.
///
/// Paths are registered as scratch before they are written so that a
/// half-written file is still cleaned up.
fn plan_step(
    params: &WorkflowParams,
    state: &mut WorkflowState,
    step: u32,
    plan: &mut StepPlan,
) -> Result<(), EngineError> {
    let index = step as usize;
    match params.workflow {
        WorkflowKind::Append => match params.append_strategy {
            AppendStrategy::Regenerate => {
                let rows = checked_rows(grown_rows(params, step))?;
                let path = step_path(params, "append");
                plan.scratch.push(path.clone());
                export(&generate(params.seed, rows, !params.diverse)?, &path)?;
                plan.phases.push(Phase::Upload(vec![StepFile::cumulative(path)]));
            }
            AppendStrategy::InPlace => {
                let (Some(path), Some(blog)) = (state.cumulative.clone(), state.blog.as_mut())
                else {
                    return Err(EngineError::Config(
                        "in-place append started without a cumulative file".into(),
                    ));
                };
                if step == 0 {
                    export(&blog.generate(checked_rows(params.start_rows)?)?, &path)?;
                } else {
                    append_to_file(&path, &blog.generate(checked_rows(params.add_rows)?)?)?;
                }
                plan.phases.push(Phase::Upload(vec![StepFile::cumulative(path)]));
            }
        },
        WorkflowKind::Split => {
            let boundaries = SplitBoundaries::for_step(
                checked_rows(params.start_rows)?,
                checked_rows(params.add_rows)?,
                index,
            );
            let dataset = generate(params.seed, boundaries.total_rows(), !params.diverse)?;
            let parts = split(&dataset, boundaries)?;
            let mut files = Vec::with_capacity(3);
            for (name, part) in parts.parts() {
                let path = step_path(params, name);
                plan.scratch.push(path.clone());
                export(part, &path)?;
                files.push(StepFile {
                    path,
                    merged: name == "train",
                });
            }
            plan.phases.push(Phase::Upload(files));
        }
        WorkflowKind::Features => {
            let rows = checked_rows(params.start_rows)?;
            let base = generate(params.seed, rows, true)?;
            let feature_count = index.saturating_mul(params.feature_growth);
            let dataset = if feature_count == 0 {
                base
            } else {
                merge_columns(&base, &generate_features(params.seed, rows, feature_count)?)?
            };
            let path = step_path(params, "features");
            plan.scratch.push(path.clone());
            export(&dataset, &path)?;
            plan.phases.push(Phase::Upload(vec![StepFile::cumulative(path)]));
        }
        WorkflowKind::Random => {
            let rows = checked_rows(params.start_rows)?;
            let seed = params.seed.wrapping_add(u64::from(step));
            let path = step_path(params, "random");
            plan.scratch.push(path.clone());
            export(&generate(seed, rows, !params.diverse)?, &path)?;
            plan.phases.push(Phase::Upload(vec![StepFile::fresh(path)]));
        }
        WorkflowKind::TaxiMerge => {
            let (Some(fresh), Some(target)) =
                (state.inputs.get(index).cloned(), state.cumulative.clone())
            else {
                return Err(EngineError::Config(format!("no taxi-merge input for step {step}")));
            };
            plan.phases.push(Phase::Upload(vec![StepFile::fresh(fresh.clone())]));
            plan.phases.push(Phase::Merge {
                fresh,
                target: target.clone(),
            });
            plan.phases.push(Phase::Upload(vec![StepFile::cumulative(target)]));
        }
    }
    Ok(())
}

/// `start_rows + add_rows * step`, saturating.
fn grown_rows(params: &WorkflowParams, step: u32) -> i64 {
    params
        .start_rows
        .saturating_add(params.add_rows.saturating_mul(i64::from(step)))
}

fn step_path(params: &WorkflowParams, stem: &str) -> PathBuf {
    params.data_dir.join(format!("{stem}.{}", params.suffix))
}

fn file_context(path: &Path, merged: bool, step: u32) -> Result<FileContext, EngineError> {
    let file_bytes = std::fs::metadata(path)?.len();
    let row_count = count_rows(path)?;
    Ok(FileContext {
        filename: file_name(path),
        file_bytes,
        row_count,
        merged,
        step,
    })
}

/// What an upload phase knows about one of its files.
enum UploadContext {
    Present(FileContext),
    /// The file was never produced, e.g. the merge that builds it failed.
    Missing(FileContext),
}

fn upload_context(path: &Path, merged: bool, step: u32) -> Result<UploadContext, EngineError> {
    match file_context(path, merged, step) {
        Ok(context) => Ok(UploadContext::Present(context)),
        Err(EngineError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            Ok(UploadContext::Missing(FileContext {
                filename: file_name(path),
                file_bytes: 0,
                row_count: 0,
                merged,
                step,
            }))
        }
        Err(e) => Err(e),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// `*.parquet` files directly under `dir`, sorted by name.
fn list_parquet_files(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(EngineError::Config(format!(
            "no .parquet files in {}",
            dir.display()
        )));
    }
    files.sort();
    Ok(files)
}

fn remove_file_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileSuffix;

    #[test]
    fn rows_grow_with_step() {
        let mut params = WorkflowParams::new(WorkflowKind::Append);
        params.start_rows = 10;
        params.add_rows = 5;
        assert_eq!(grown_rows(&params, 0), 10);
        assert_eq!(grown_rows(&params, 3), 25);
        params.add_rows = i64::MAX;
        assert_eq!(grown_rows(&params, 2), i64::MAX);
    }

    #[test]
    fn step_paths_use_suffix() {
        let mut params = WorkflowParams::new(WorkflowKind::Random);
        params.data_dir = PathBuf::from("scratch");
        params.suffix = FileSuffix::Csv;
        assert_eq!(step_path(&params, "random"), PathBuf::from("scratch/random.csv"));
    }

    #[test]
    fn parquet_inputs_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.parquet", "a.parquet", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = list_parquet_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.parquet"), dir.path().join("b.parquet")]
        );
    }

    #[test]
    fn empty_input_dir_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_parquet_files(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn taxi_steps_capped_by_file_count() {
        let mut params = WorkflowParams::new(WorkflowKind::TaxiMerge);
        params.steps = 10;
        let state = WorkflowState {
            inputs: vec![PathBuf::from("0.parquet"), PathBuf::from("1.parquet")],
            ..WorkflowState::default()
        };
        assert_eq!(state.step_count(&params), 2);
    }

    #[test]
    fn removing_missing_file_is_silent() {
        remove_file_quietly(Path::new("/nonexistent/dvbench/file.csv"));
    }
}
