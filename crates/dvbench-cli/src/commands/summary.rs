use std::path::Path;

use anyhow::{Context, Result};
use dvbench_ledger::{summarize_steps, Ledger, StepSummary};

use super::{format_bytes, markdown_table};

const HEADERS: [&str; 9] = [
    "run", "step", "technology", "ops", "errors", "time_s", "file_size", "sent", "recv",
];

/// Execute the `summary` command: per (run, step, technology) totals.
pub fn execute(ledger_path: &Path, all: bool) -> Result<()> {
    let ledger = Ledger::open(ledger_path)
        .with_context(|| format!("Failed to open ledger: {}", ledger_path.display()))?;
    let rows = if all {
        ledger.read_all()?
    } else {
        ledger.read_latest_run()?
    };

    let summaries = summarize_steps(&rows);
    if summaries.is_empty() {
        println!("No records in {}", ledger.location());
        return Ok(());
    }
    println!("{}", render(&summaries));
    Ok(())
}

fn render(summaries: &[StepSummary]) -> String {
    let cells: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.run_id.as_str().chars().take(8).collect(),
                s.step.to_string(),
                s.technology.to_string(),
                s.operations.to_string(),
                s.errors.to_string(),
                format!("{:.3}", s.time_seconds),
                format_bytes(s.file_bytes),
                format_bytes(s.bytes_sent),
                format_bytes(s.bytes_recv),
            ]
        })
        .collect();
    markdown_table(&HEADERS, &cells)
}
