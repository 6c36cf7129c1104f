//! Operations the runner measures.
//!
//! An [`Operation`] is one technology's way of handling a step file. The
//! runner times it and treats any error as data; operations never see the
//! ledger.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use dvbench_types::{OperationOutput, Technology};

use crate::config::CommandSpec;
use crate::errors::OperationError;
use crate::generator::merge_files;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Arguments bound to one operation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInput {
    /// The step file.
    pub file: PathBuf,
    /// The technology's mirror checkout, when it has one. The orchestrator
    /// has already copied `file` into it.
    pub mirror: Option<PathBuf>,
    /// Cumulative file a merge writes into.
    pub merged_target: Option<PathBuf>,
}

impl OperationInput {
    #[must_use]
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            mirror: None,
            merged_target: None,
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: impl Into<PathBuf>) -> Self {
        self.mirror = Some(mirror.into());
        self
    }

    #[must_use]
    pub fn with_merged_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.merged_target = Some(target.into());
        self
    }

    /// File name of [`Self::file`], or the whole path if it has none.
    #[must_use]
    pub fn filename(&self) -> String {
        self.file.file_name().map_or_else(
            || self.file.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

/// One measurable action of a technology.
pub trait Operation: Send + Sync {
    /// Identifier recorded in the ledger's `operation` column.
    fn name(&self) -> &str;

    fn technology(&self) -> Technology;

    /// Perform the action once.
    ///
    /// # Errors
    ///
    /// Any failure is recorded by the runner and does not stop the run.
    fn execute(&self, input: &OperationInput) -> Result<OperationOutput, OperationError>;
}

// ---------------------------------------------------------------------------
// CommandOperation
// ---------------------------------------------------------------------------

/// Runs a fixed sequence of external programs, stopping at the first
/// failure.
#[derive(Debug, Clone)]
pub struct CommandOperation {
    name: String,
    technology: Technology,
    commands: Vec<CommandSpec>,
    destination: Option<String>,
}

impl CommandOperation {
    #[must_use]
    pub fn new(technology: Technology, commands: Vec<CommandSpec>) -> Self {
        Self {
            name: format!("upload_{}", technology.as_str().replace('-', "_")),
            technology,
            commands,
            destination: None,
        }
    }

    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    fn render(template: &str, input: &OperationInput) -> String {
        let mirror = input
            .mirror
            .as_deref()
            .map(|m| m.display().to_string())
            .unwrap_or_default();
        template
            .replace("{filename}", &input.filename())
            .replace("{file}", &input.file.display().to_string())
            .replace("{mirror}", &mirror)
    }

    fn run_one(spec: &CommandSpec, input: &OperationInput) -> Result<(), OperationError> {
        let args: Vec<String> = spec.args.iter().map(|a| Self::render(a, input)).collect();
        let mut command = Command::new(&spec.program);
        command.args(&args);
        if let Some(mirror) = &input.mirror {
            command.current_dir(mirror);
        }
        tracing::debug!(program = %spec.program, args = ?args, "Running command");

        let output = command.output()?;
        if output.status.success() {
            return Ok(());
        }
        Err(OperationError::CommandFailed {
            program: spec.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl Operation for CommandOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn technology(&self) -> Technology {
        self.technology
    }

    fn execute(&self, input: &OperationInput) -> Result<OperationOutput, OperationError> {
        let mut commands = 0u32;
        for spec in &self.commands {
            Self::run_one(spec, input)?;
            commands += 1;
        }
        Ok(OperationOutput {
            destination: self.destination.as_deref().map(|d| Self::render(d, input)),
            commands,
            bytes_written: None,
        })
    }
}

// ---------------------------------------------------------------------------
// MergeOperation
// ---------------------------------------------------------------------------

/// Folds the step file into the cumulative merged file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOperation;

impl Operation for MergeOperation {
    fn name(&self) -> &str {
        "merge_files"
    }

    fn technology(&self) -> Technology {
        Technology::Merge
    }

    fn execute(&self, input: &OperationInput) -> Result<OperationOutput, OperationError> {
        let target = input
            .merged_target
            .as_deref()
            .ok_or_else(|| OperationError::failed("merge requires a merged target file"))?;
        let bytes = merge_files(&input.file, target)?;
        Ok(OperationOutput {
            destination: Some(target.display().to_string()),
            commands: 0,
            bytes_written: Some(bytes),
        })
    }
}

// ---------------------------------------------------------------------------
// FnOperation
// ---------------------------------------------------------------------------

type OperationFn = dyn Fn(&OperationInput) -> Result<OperationOutput, OperationError> + Send + Sync;

/// Closure-backed operation, for embedding and tests.
pub struct FnOperation {
    name: String,
    technology: Technology,
    f: Box<OperationFn>,
}

impl FnOperation {
    pub fn new<F>(name: impl Into<String>, technology: Technology, f: F) -> Self
    where
        F: Fn(&OperationInput) -> Result<OperationOutput, OperationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            technology,
            f: Box::new(f),
        }
    }

    /// An operation that succeeds without doing anything.
    #[must_use]
    pub fn noop(technology: Technology) -> Self {
        Self::new(format!("noop_{technology}"), technology, |_| {
            Ok(OperationOutput::default())
        })
    }
}

impl fmt::Debug for FnOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .field("technology", &self.technology)
            .finish_non_exhaustive()
    }
}

impl Operation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn technology(&self) -> Technology {
        self.technology
    }

    fn execute(&self, input: &OperationInput) -> Result<OperationOutput, OperationError> {
        (self.f)(input)
    }
}

/// Copy `file` into `mirror`, returning the copy's path.
///
/// # Errors
///
/// Returns an I/O error if the mirror can't be created or the copy fails.
pub fn copy_into_mirror(file: &Path, mirror: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(mirror)?;
    let name = file.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", file.display()),
        )
    })?;
    let target = mirror.join(name);
    std::fs::copy(file, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{count_rows, export, generate};

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    #[test]
    fn trait_is_object_safe() {
        let op: Box<dyn Operation> = Box::new(MergeOperation);
        assert_eq!(op.technology(), Technology::Merge);
    }

    #[test]
    fn templates_fill_every_placeholder() {
        let input = OperationInput::new("/data/append.parquet").with_mirror("/repos/dvc");
        let rendered = CommandOperation::render("{mirror}/{filename} <- {file}", &input);
        assert_eq!(rendered, "/repos/dvc/append.parquet <- /data/append.parquet");
    }

    #[test]
    fn operation_names_follow_technology() {
        let op = CommandOperation::new(Technology::LfsS3, Vec::new());
        assert_eq!(op.name(), "upload_lfs_s3");
    }

    #[cfg(unix)]
    #[test]
    fn commands_run_in_mirror_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let op = CommandOperation::new(
            Technology::Gitxet,
            vec![spec("touch", &["{filename}.marker"]), spec("true", &[])],
        )
        .with_destination("repo://{filename}");
        let input = OperationInput::new("/elsewhere/append.csv").with_mirror(dir.path());

        let output = op.execute(&input).unwrap();
        assert_eq!(output.commands, 2);
        assert_eq!(output.destination.as_deref(), Some("repo://append.csv"));
        assert!(dir.path().join("append.csv.marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_stops_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let op = CommandOperation::new(
            Technology::Dvc,
            vec![
                spec("sh", &["-c", "echo 'not a dvc repository' >&2; exit 3"]),
                spec("touch", &["never"]),
            ],
        );
        let input = OperationInput::new("f.csv").with_mirror(dir.path());

        let err = op.execute(&input).unwrap_err();
        match err {
            OperationError::CommandFailed { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "not a dvc repository");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("never").exists());
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let op = CommandOperation::new(
            Technology::S3,
            vec![spec("dvbench-no-such-program-xyz", &[])],
        );
        let err = op.execute(&OperationInput::new("f.csv")).unwrap_err();
        assert!(matches!(err, OperationError::Io(_)));
    }

    #[test]
    fn merge_requires_a_target() {
        let err = MergeOperation
            .execute(&OperationInput::new("fresh.parquet"))
            .unwrap_err();
        assert!(err.to_string().contains("merged target"));
    }

    #[test]
    fn merge_accumulates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("0.parquet");
        let merged = dir.path().join("merged.parquet");
        export(&generate(1, 5, true).unwrap(), &fresh).unwrap();

        let input = OperationInput::new(&fresh).with_merged_target(&merged);
        MergeOperation.execute(&input).unwrap();
        let output = MergeOperation.execute(&input).unwrap();

        assert_eq!(count_rows(&merged).unwrap(), 10);
        assert_eq!(output.bytes_written, Some(std::fs::metadata(&merged).unwrap().len()));
    }

    #[test]
    fn mirror_copy_lands_under_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("random.csv");
        std::fs::write(&file, "a\n1\n").unwrap();
        let copy = copy_into_mirror(&file, &dir.path().join("mirrors/lfs-git")).unwrap();
        assert_eq!(copy, dir.path().join("mirrors/lfs-git/random.csv"));
        assert_eq!(std::fs::read_to_string(copy).unwrap(), "a\n1\n");
    }
}
