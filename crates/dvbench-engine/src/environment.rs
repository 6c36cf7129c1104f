//! Best-effort probing of backend tool versions.

use std::collections::BTreeMap;
use std::process::Command;

/// Value recorded when a tool is missing or prints nothing.
pub const UNKNOWN_VERSION: &str = "unknown";

const PROBES: [(&str, &str, &[&str]); 4] = [
    ("git", "git", &["--version"]),
    ("gitxet", "git", &["xet", "--version"]),
    ("dvc", "dvc", &["--version"]),
    ("branch", "git", &["branch", "--show-current"]),
];

/// First line of a successful command's stdout.
fn probe(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next()?.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Versions of `git`, `git xet` and `dvc`, plus the current git branch.
/// Never fails; anything unavailable is [`UNKNOWN_VERSION`].
#[must_use]
pub fn probe_tool_versions() -> BTreeMap<String, String> {
    PROBES
        .iter()
        .map(|(key, program, args)| {
            let version = probe(program, args).unwrap_or_else(|| {
                tracing::debug!(tool = key, "Tool version unavailable");
                UNKNOWN_VERSION.to_string()
            });
            ((*key).to_string(), version)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_probe_has_a_value() {
        let versions = probe_tool_versions();
        assert_eq!(versions.len(), 4);
        for key in ["git", "gitxet", "dvc", "branch"] {
            assert!(!versions[key].is_empty());
        }
    }

    #[test]
    fn missing_program_is_none() {
        assert!(probe("dvbench-no-such-tool-xyz", &["--version"]).is_none());
    }
}
