pub mod benchmark;
pub mod check;
pub mod generate;
pub mod latest;
pub mod summary;

use std::path::Path;

use anyhow::{Context, Result};
use dvbench_engine::config::{
    builtin_technologies, parse_technologies, validate_technologies, TechnologiesConfig,
};

/// Load the technology table from `path`, or the built-in one.
fn load_technologies(path: Option<&Path>) -> Result<TechnologiesConfig> {
    let config = match path {
        Some(path) => parse_technologies(path)
            .with_context(|| format!("Failed to load technologies: {}", path.display()))?,
        None => builtin_technologies()?,
    };
    validate_technologies(&config)?;
    Ok(config)
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

/// Render a GitHub-flavored markdown table with padded columns.
fn markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len().max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(table_line(headers.iter(), &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push(table_line(rule.iter(), &widths));
    for row in rows {
        out.push(table_line(row.iter(), &widths));
    }
    out.join("\n")
}

fn table_line<S: AsRef<str>>(cells: impl Iterator<Item = S>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect();
    format!("| {} |", padded.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_a_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1_048_576), "3.00 MB");
    }

    #[test]
    fn table_pads_every_column() {
        let table = markdown_table(
            &["technology", "time"],
            &[vec!["s3".into(), "0.5".into()], vec!["lfs-git".into(), "12.25".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| technology | time  |");
        assert_eq!(lines[1], "| ---------- | ----- |");
        assert_eq!(lines[2], "| s3         | 0.5   |");
        assert_eq!(lines[3], "| lfs-git    | 12.25 |");
    }

    #[test]
    fn builtin_technologies_load() {
        let config = load_technologies(None).unwrap();
        assert_eq!(config.technologies.len(), 7);
    }
}
