//! Semantic validation for technology tables and workflow parameters.

use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{bail, Result};
use dvbench_types::{Technology, WorkflowKind};
use regex::Regex;

use crate::config::types::{CommandSpec, TechnologiesConfig, WorkflowParams};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("valid placeholder regex"));

const PLACEHOLDERS: [&str; 3] = ["file", "filename", "mirror"];

fn validate_placeholders(text: &str, context: &str, errors: &mut Vec<String>) {
    for cap in PLACEHOLDER_RE.captures_iter(text) {
        let name = &cap[1];
        if !PLACEHOLDERS.contains(&name) {
            errors.push(format!(
                "{context}: unknown placeholder '{{{name}}}' (expected one of file, filename, mirror)"
            ));
        }
    }
}

fn validate_commands(commands: &[CommandSpec], context: &str, errors: &mut Vec<String>) {
    if commands.is_empty() {
        errors.push(format!("{context}: at least one command is required"));
    }
    for (i, command) in commands.iter().enumerate() {
        if command.program.trim().is_empty() {
            errors.push(format!("{context}: commands[{i}] has an empty program"));
        }
        for arg in &command.args {
            validate_placeholders(arg, &format!("{context}: commands[{i}]"), errors);
        }
    }
}

/// Validate a parsed technology table.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the table.
pub fn validate_technologies(config: &TechnologiesConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported technology file version '{}', expected '1.0'",
            config.version
        ));
    }

    for (tech, spec) in &config.technologies {
        let context = format!("technology '{tech}'");
        if *tech == Technology::Merge {
            errors.push(format!("{context}: merge is built in and cannot be configured"));
            continue;
        }
        validate_commands(&spec.commands, &context, &mut errors);
        if let Some(mirror) = &spec.mirror {
            if mirror.as_os_str().is_empty() {
                errors.push(format!("{context}: mirror must not be empty"));
            }
        }
        if let Some(destination) = &spec.destination {
            validate_placeholders(destination, &format!("{context}: destination"), &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Technology validation failed:\n  - {}", errors.join("\n  - "));
    }
}

/// Validate workflow parameters before a run starts.
///
/// Row counts are left to the generator, which rejects negative values.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the parameters.
pub fn validate_params(params: &WorkflowParams) -> Result<()> {
    let mut errors = Vec::new();

    if params.steps == 0 {
        errors.push("steps must be at least 1".to_string());
    }

    if params.data_dir.as_os_str().is_empty() {
        errors.push("data_dir must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for tech in &params.technologies {
        if !seen.insert(*tech) {
            errors.push(format!("technology '{tech}' is listed more than once"));
        }
        if !tech.is_upload() {
            errors.push(format!(
                "technology '{tech}' is an internal step, not an upload backend"
            ));
        }
    }

    match params.workflow {
        WorkflowKind::TaxiMerge => match &params.input_dir {
            Some(dir) if !dir.is_dir() => {
                errors.push(format!("input_dir '{}' is not a directory", dir.display()));
            }
            None if params.file_count == 0 => {
                errors.push("file_count must be at least 1 when no input_dir is given".to_string());
            }
            _ => {}
        },
        WorkflowKind::Features if params.feature_growth == 0 => {
            errors.push("feature_growth must be at least 1".to_string());
        }
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Workflow validation failed:\n  - {}", errors.join("\n  - "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::{builtin_technologies, parse_technologies_str};

    fn valid_yaml() -> &'static str {
        r#"
version: "1.0"
technologies:
  s3:
    destination: "s3://bucket/{filename}"
    commands:
      - program: aws
        args: ["s3", "cp", "{file}", "s3://bucket/{filename}"]
"#
    }

    #[test]
    fn test_valid_table_passes() {
        let config = parse_technologies_str(valid_yaml()).unwrap();
        assert!(validate_technologies(&config).is_ok());
    }

    #[test]
    fn test_builtin_table_passes() {
        assert!(validate_technologies(&builtin_technologies().unwrap()).is_ok());
    }

    #[test]
    fn test_wrong_version_fails() {
        let yaml = valid_yaml().replace("\"1.0\"", "\"2.0\"");
        let config = parse_technologies_str(&yaml).unwrap();
        let err = validate_technologies(&config).unwrap_err().to_string();
        assert!(err.contains("Unsupported technology file version"));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let yaml = valid_yaml().replace("{file}\"", "{path}\"");
        let config = parse_technologies_str(&yaml).unwrap();
        let err = validate_technologies(&config).unwrap_err().to_string();
        assert!(err.contains("unknown placeholder '{path}'"));
    }

    #[test]
    fn test_all_errors_collected() {
        let yaml = r#"
version: "1.0"
technologies:
  dvc:
    commands: []
  lakefs:
    commands:
      - program: "  "
  merge:
    commands:
      - program: cp
"#;
        let config = parse_technologies_str(yaml).unwrap();
        let err = validate_technologies(&config).unwrap_err().to_string();
        assert!(err.contains("technology 'dvc': at least one command is required"));
        assert!(err.contains("technology 'lakefs': commands[0] has an empty program"));
        assert!(err.contains("merge is built in"));
    }

    #[test]
    fn test_default_params_pass() {
        for workflow in WorkflowKind::ALL {
            assert!(validate_params(&WorkflowParams::new(workflow)).is_ok(), "{workflow}");
        }
    }

    #[test]
    fn test_bad_params_fail_together() {
        let mut params = WorkflowParams::new(WorkflowKind::TaxiMerge);
        params.steps = 0;
        params.file_count = 0;
        params.technologies = vec![Technology::S3, Technology::S3, Technology::Merge];
        let err = validate_params(&params).unwrap_err().to_string();
        assert!(err.contains("steps must be at least 1"));
        assert!(err.contains("'s3' is listed more than once"));
        assert!(err.contains("'merge' is an internal step"));
        assert!(err.contains("file_count must be at least 1"));
    }

    #[test]
    fn test_missing_input_dir_fails() {
        let mut params = WorkflowParams::new(WorkflowKind::TaxiMerge);
        params.input_dir = Some("/nonexistent/taxi".into());
        let err = validate_params(&params).unwrap_err().to_string();
        assert!(err.contains("is not a directory"));
    }
}
