use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use dvbench_engine::generator::{
    checked_rows, export, generate, generate_mock_files, BlogRowGenerator,
};

use super::format_bytes;

/// What `generate` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenerateShape {
    /// Dense matrix of uniform floats
    Numeric,
    /// Person-like records
    Realistic,
    /// Blog posts with increasing ids and timestamps
    Blog,
    /// A directory of numeric `.parquet` files
    Mock,
}

/// Execute the `generate` command: write a standalone dataset.
pub fn execute(
    shape: GenerateShape,
    rows: i64,
    seed: u64,
    output: &Path,
    file_count: usize,
) -> Result<()> {
    let rows = checked_rows(rows)?;
    if shape == GenerateShape::Mock {
        let files = generate_mock_files(output, file_count, rows, seed)
            .with_context(|| format!("Failed to generate mock files in {}", output.display()))?;
        println!(
            "Wrote {} files of {rows} rows to {}",
            files.len(),
            output.display()
        );
        return Ok(());
    }

    let dataset = match shape {
        GenerateShape::Blog => BlogRowGenerator::new(seed).generate(rows)?,
        other => generate(seed, rows, other == GenerateShape::Numeric)?,
    };
    let bytes = export(&dataset, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), rows, bytes, "Dataset written");
    println!(
        "Wrote {rows} rows x {} columns to {} ({})",
        dataset.num_columns(),
        output.display(),
        format_bytes(bytes)
    );
    Ok(())
}
