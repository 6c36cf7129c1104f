use std::path::Path;

use anyhow::Result;
use dvbench_engine::environment::{probe_tool_versions, UNKNOWN_VERSION};

use super::load_technologies;

/// Execute the `check` command: validate the technology table and report
/// local prerequisites.
pub fn execute(config_path: Option<&Path>) -> Result<()> {
    // 1. Parse and validate the technology table
    let config = load_technologies(config_path)?;
    println!("Technology table: OK ({} technologies)", config.technologies.len());

    // 2. Mirrors must be existing checkouts for their commands to work
    let mut missing = 0usize;
    for (tech, spec) in &config.technologies {
        let mirror = match &spec.mirror {
            Some(dir) if dir.is_dir() => format!("mirror {}", dir.display()),
            Some(dir) => {
                missing += 1;
                format!("mirror {} MISSING", dir.display())
            }
            None => "no mirror".to_string(),
        };
        println!(
            "{:18} {} command(s), {mirror}",
            format!("{tech}:"),
            spec.commands.len()
        );
    }

    // 3. Tool versions are recorded on every row
    for (tool, version) in probe_tool_versions() {
        let status = if version == UNKNOWN_VERSION { "not found" } else { version.as_str() };
        println!("{:18} {status}", format!("{tool}:"));
    }

    if missing == 0 {
        println!("\nAll checks passed.");
    } else {
        println!("\n{missing} mirror(s) missing; those technologies will record errors.");
    }
    Ok(())
}
