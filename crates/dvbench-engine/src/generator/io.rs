//! Reading and writing datasets on disk.
//!
//! Files ending in `.parquet` are columnar; everything else is CSV with a
//! header line.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use arrow::compute::concat_batches;
use arrow::csv::WriterBuilder;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::{DataShape, Dataset};
use crate::errors::GenerateError;

/// On-disk format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Parquet,
    Csv,
}

impl FileFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::Csv,
        }
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), GenerateError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(file: File, batch: &RecordBatch, header: bool) -> Result<(), GenerateError> {
    let mut writer = WriterBuilder::new().with_header(header).build(file);
    writer.write(batch)?;
    Ok(())
}

/// Write through a sibling temp file and rename, so a crash never leaves a
/// half-written columnar file in place.
fn replace_parquet(path: &Path, batch: &RecordBatch) -> Result<(), GenerateError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let result = write_parquet(&tmp, batch)
        .and_then(|()| std::fs::rename(&tmp, path).map_err(GenerateError::from));
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&tmp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
    result
}

/// Serialize `dataset` to `path`, creating parent directories as needed.
/// Returns the file size in bytes.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] if the directory or file can't be written,
/// or an encoder error from Arrow or Parquet.
pub fn export(dataset: &Dataset, path: &Path) -> Result<u64, GenerateError> {
    ensure_parent(path)?;
    match FileFormat::from_path(path) {
        FileFormat::Parquet => write_parquet(path, dataset.batch())?,
        FileFormat::Csv => write_csv(File::create(path)?, dataset.batch(), true)?,
    }
    Ok(std::fs::metadata(path)?.len())
}

/// Read a whole columnar file into one batch.
///
/// # Errors
///
/// Returns [`GenerateError::Parquet`] if the file is not valid Parquet.
pub fn read_parquet(path: &Path) -> Result<RecordBatch, GenerateError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    let schema = reader.schema();
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Read a columnar file back as a dataset of the given shape.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] for non-columnar paths, plus any
/// error of [`read_parquet`].
pub fn read_dataset(path: &Path, shape: DataShape) -> Result<Dataset, GenerateError> {
    if FileFormat::from_path(path) != FileFormat::Parquet {
        return Err(GenerateError::InvalidShape(format!(
            "{} is not a columnar file",
            path.display()
        )));
    }
    Ok(Dataset::new(shape, read_parquet(path)?))
}

/// Append `rows` to the file at `path`, creating it when missing.
///
/// CSV files are appended in place without repeating the header. Columnar
/// files are read, concatenated with `rows` and rewritten. Returns the new
/// file size in bytes.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] if the existing file has a
/// different schema, or an I/O or encoder error.
pub fn append_to_file(path: &Path, rows: &Dataset) -> Result<u64, GenerateError> {
    if !path.exists() {
        return export(rows, path);
    }
    match FileFormat::from_path(path) {
        FileFormat::Csv => {
            let file = OpenOptions::new().append(true).open(path)?;
            write_csv(file, rows.batch(), false)?;
        }
        FileFormat::Parquet => {
            let existing = read_parquet(path)?;
            if existing.schema().fields() != rows.batch().schema().fields() {
                return Err(GenerateError::InvalidShape(format!(
                    "schema of {} does not match appended rows",
                    path.display()
                )));
            }
            let combined = concat_batches(&existing.schema(), [&existing, rows.batch()])?;
            replace_parquet(path, &combined)?;
        }
    }
    Ok(std::fs::metadata(path)?.len())
}

/// Fold `fresh` into the cumulative file at `merged`.
///
/// A missing merged file becomes a copy of `fresh`. Otherwise columnar files
/// are concatenated and CSV data lines are appended without the header.
/// Returns the merged file size in bytes.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] if the two files disagree on
/// schema or format, or an I/O or decoder error.
pub fn merge_files(fresh: &Path, merged: &Path) -> Result<u64, GenerateError> {
    if FileFormat::from_path(fresh) != FileFormat::from_path(merged) {
        return Err(GenerateError::InvalidShape(format!(
            "cannot merge {} into {}: formats differ",
            fresh.display(),
            merged.display()
        )));
    }
    ensure_parent(merged)?;
    if !merged.exists() {
        std::fs::copy(fresh, merged)?;
        return Ok(std::fs::metadata(merged)?.len());
    }
    match FileFormat::from_path(merged) {
        FileFormat::Parquet => {
            let batch = read_parquet(fresh)?;
            // Shape is irrelevant to a file-level merge; the schema check in
            // append_to_file is what guards it.
            append_to_file(merged, &Dataset::new(DataShape::Numeric, batch))
        }
        FileFormat::Csv => {
            let mut reader = csv::Reader::from_path(fresh)?;
            let file = OpenOptions::new().append(true).open(merged)?;
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
            for record in reader.records() {
                writer.write_record(&record?)?;
            }
            writer.flush()?;
            Ok(std::fs::metadata(merged)?.len())
        }
    }
}

/// Number of data rows in a dataset file.
///
/// # Errors
///
/// Returns an I/O or decoder error if the file can't be read.
pub fn count_rows(path: &Path) -> Result<u64, GenerateError> {
    match FileFormat::from_path(path) {
        FileFormat::Parquet => {
            let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
            Ok(u64::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0))
        }
        FileFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)?;
            let mut rows = 0u64;
            for record in reader.records() {
                record?;
                rows += 1;
            }
            Ok(rows)
        }
    }
}

/// Recreate `dir` with `file_count` numeric files `0.parquet..`, file *i*
/// seeded with `seed + i` (wrapping). Returns the paths in order.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] if the directory can't be recreated, or
/// any error of [`export`].
pub fn generate_mock_files(
    dir: &Path,
    file_count: usize,
    rows: usize,
    seed: u64,
) -> Result<Vec<PathBuf>, GenerateError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(file_count);
    for index in 0..file_count {
        let path = dir.join(format!("{index}.parquet"));
        let file_seed = seed.wrapping_add(index as u64);
        let dataset = super::generate(file_seed, rows, true)?;
        export(&dataset, &path)?;
        paths.push(path);
    }
    tracing::debug!(dir = %dir.display(), files = file_count, rows, "Generated mock files");
    Ok(paths)
}
