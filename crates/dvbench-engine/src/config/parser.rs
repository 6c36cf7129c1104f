//! Technology YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::TechnologiesConfig;

/// Built-in technology table, compiled into the binary.
pub const BUILTIN_TECHNOLOGIES: &str = include_str!("technologies.yaml");

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env var regex")
});

/// Substitute `${VAR_NAME}` and `${VAR_NAME:-default}` patterns with
/// environment variable values.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is unset and
/// has no default.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match (std::env::var(var_name), cap.get(2)) {
            (Ok(val), _) => {
                result = result.replace(&cap[0], &val);
            }
            (Err(_), Some(default)) => {
                result = result.replace(&cap[0], default.as_str());
            }
            (Err(_), None) => {
                if !errors.iter().any(|e| e == var_name) {
                    errors.push(var_name.to_string());
                }
            }
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", errors.join(", "));
    }

    Ok(result)
}

/// Parse a technology YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_technologies_str(yaml_str: &str) -> Result<TechnologiesConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: TechnologiesConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse technology YAML")?;
    Ok(config)
}

/// Parse a technology YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_technologies(path: &Path) -> Result<TechnologiesConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read technology file: {}", path.display()))?;
    parse_technologies_str(&content)
}

/// The built-in technology table with the current environment applied.
///
/// # Errors
///
/// Returns an error only if the embedded YAML fails to parse.
pub fn builtin_technologies() -> Result<TechnologiesConfig> {
    parse_technologies_str(BUILTIN_TECHNOLOGIES).context("Built-in technology table is invalid")
}
