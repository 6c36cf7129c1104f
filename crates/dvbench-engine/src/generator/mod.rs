//! Deterministic tabular dataset generation.
//!
//! Every generator is a pure function of its seed and size: the PRNG is
//! reseeded on each call, so the same `(seed, rows)` always yields the same
//! values in the same column order.

mod blog;
mod io;
mod numeric;
mod realistic;

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::concat_batches;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::errors::GenerateError;

pub use blog::BlogRowGenerator;
pub use io::{
    append_to_file, count_rows, export, generate_mock_files, merge_files, read_dataset,
    FileFormat,
};

/// Column count of the numeric shape (`col_0..col_9`).
pub const NUMERIC_COLUMNS: usize = 10;

/// Column schema family of a dataset. Families never share columns and
/// must not be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataShape {
    /// Uniform `[0, 1)` floats.
    Numeric,
    /// Synthetic person records.
    Realistic,
    /// Append-mode blog posts with increasing ids and timestamps.
    Blog,
}

/// A generated table and the shape it was generated with.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    shape: DataShape,
    batch: RecordBatch,
}

impl Dataset {
    #[must_use]
    pub fn new(shape: DataShape, batch: RecordBatch) -> Self {
        Self { shape, batch }
    }

    #[must_use]
    pub fn shape(&self) -> DataShape {
        self.shape
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Zero-copy positional slice.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidShape`] if the range runs past the end.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self, GenerateError> {
        if offset.saturating_add(len) > self.num_rows() {
            return Err(GenerateError::InvalidShape(format!(
                "slice {offset}..{} out of bounds for {} rows",
                offset + len,
                self.num_rows()
            )));
        }
        Ok(Self::new(self.shape, self.batch.slice(offset, len)))
    }
}

/// Build a batch that keeps its row count even with zero columns.
pub(crate) fn batch_from_columns(
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
    rows: usize,
) -> Result<RecordBatch, GenerateError> {
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

/// Validate a caller-supplied row count.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] for negative counts.
pub fn checked_rows(rows: i64) -> Result<usize, GenerateError> {
    usize::try_from(rows)
        .map_err(|_| GenerateError::InvalidShape(format!("row count must be >= 0, got {rows}")))
}

/// Generate `rows` rows of the numeric shape, or of the realistic shape
/// when `numeric` is false.
///
/// # Errors
///
/// Returns [`GenerateError::Arrow`] if the batch can't be assembled.
pub fn generate(seed: u64, rows: usize, numeric: bool) -> Result<Dataset, GenerateError> {
    if numeric {
        numeric::generate_numeric(seed, rows)
    } else {
        realistic::generate_realistic(seed, rows)
    }
}

/// Generate a `rows × feature_count` matrix of `feature_<i>` columns.
///
/// Draws from a PRNG stream separate from [`generate`], so features are
/// independent of base data generated with the same seed.
///
/// # Errors
///
/// Returns [`GenerateError::Arrow`] if the batch can't be assembled.
pub fn generate_features(
    seed: u64,
    rows: usize,
    feature_count: usize,
) -> Result<Dataset, GenerateError> {
    numeric::generate_features(seed, rows, feature_count)
}

/// Join `extra` onto `base` by row position.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] when shapes differ, row counts
/// differ, or a column name would repeat.
pub fn merge_columns(base: &Dataset, extra: &Dataset) -> Result<Dataset, GenerateError> {
    if base.shape != extra.shape {
        return Err(GenerateError::InvalidShape(format!(
            "cannot merge {:?} columns onto a {:?} dataset",
            extra.shape, base.shape
        )));
    }
    if base.num_rows() != extra.num_rows() {
        return Err(GenerateError::InvalidShape(format!(
            "row counts differ: {} vs {}",
            base.num_rows(),
            extra.num_rows()
        )));
    }
    let base_names = base.column_names();
    if let Some(dup) = extra.column_names().into_iter().find(|n| base_names.contains(n)) {
        return Err(GenerateError::InvalidShape(format!("duplicate column '{dup}'")));
    }

    let fields = base
        .batch
        .schema()
        .fields()
        .iter()
        .chain(extra.batch.schema().fields().iter())
        .map(|f| f.as_ref().clone())
        .collect();
    let columns = base
        .batch
        .columns()
        .iter()
        .chain(extra.batch.columns())
        .cloned()
        .collect();
    let batch = batch_from_columns(fields, columns, base.num_rows())?;
    Ok(Dataset::new(base.shape, batch))
}

/// Concatenate datasets of one shape and schema, in order.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] for an empty input or mixed
/// shapes or schemas.
pub fn concat(parts: &[Dataset]) -> Result<Dataset, GenerateError> {
    let first = parts
        .first()
        .ok_or_else(|| GenerateError::InvalidShape("nothing to concatenate".into()))?;
    let schema = first.batch.schema();
    for part in &parts[1..] {
        if part.shape != first.shape || part.batch.schema().fields() != schema.fields() {
            return Err(GenerateError::InvalidShape(
                "cannot concatenate datasets with different schemas".into(),
            ));
        }
    }
    let batch = concat_batches(&schema, parts.iter().map(|p| &p.batch))?;
    Ok(Dataset::new(first.shape, batch))
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Partition sizes for [`split`]; the test partition takes the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitBoundaries {
    pub train: usize,
    pub validation: usize,
}

impl SplitBoundaries {
    /// Boundaries of the split workflow at `step`: the training set grows by
    /// `add_rows` per step, validation and test hold `add_rows` each.
    #[must_use]
    pub fn for_step(start_rows: usize, add_rows: usize, step: usize) -> Self {
        Self {
            train: start_rows + add_rows * step,
            validation: add_rows,
        }
    }

    /// Rows to generate so that the test partition matches validation.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.train + 2 * self.validation
    }
}

/// Train, validation and test partitions of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitDataset {
    pub train: Dataset,
    pub validation: Dataset,
    pub test: Dataset,
}

impl SplitDataset {
    /// Partitions in file order, with their conventional names.
    #[must_use]
    pub fn parts(&self) -> [(&'static str, &Dataset); 3] {
        [
            ("train", &self.train),
            ("validation", &self.validation),
            ("test", &self.test),
        ]
    }
}

/// Positional, order-preserving split. No shuffling.
///
/// # Errors
///
/// Returns [`GenerateError::InvalidShape`] when the boundaries exceed the
/// dataset.
pub fn split(dataset: &Dataset, boundaries: SplitBoundaries) -> Result<SplitDataset, GenerateError> {
    let rows = dataset.num_rows();
    let head = boundaries.train.saturating_add(boundaries.validation);
    if head > rows {
        return Err(GenerateError::InvalidShape(format!(
            "split boundaries {}+{} exceed {rows} rows",
            boundaries.train, boundaries.validation
        )));
    }
    Ok(SplitDataset {
        train: dataset.slice(0, boundaries.train)?,
        validation: dataset.slice(boundaries.train, boundaries.validation)?,
        test: dataset.slice(head, rows - head)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_rows_are_invalid_shape() {
        assert!(matches!(checked_rows(-1), Err(GenerateError::InvalidShape(_))));
        assert_eq!(checked_rows(0).unwrap(), 0);
        assert_eq!(checked_rows(25).unwrap(), 25);
    }

    #[test]
    fn generate_is_deterministic() {
        let a = generate(42, 100, true).unwrap();
        let b = generate(42, 100, true).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_rows(), 100);
        assert_eq!(a.num_columns(), NUMERIC_COLUMNS);
        assert_eq!(a.column_names()[0], "col_0");
    }

    #[test]
    fn realistic_is_deterministic() {
        let a = generate(3, 20, false).unwrap();
        let b = generate(3, 20, false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), DataShape::Realistic);
        assert!(a.column_names().contains(&"Email".to_string()));
    }

    #[test]
    fn zero_rows_is_allowed() {
        let ds = generate(1, 0, true).unwrap();
        assert_eq!(ds.num_rows(), 0);
        assert_eq!(ds.num_columns(), NUMERIC_COLUMNS);
    }

    #[test]
    fn features_shape_and_determinism() {
        let a = generate_features(7, 50, 3).unwrap();
        assert_eq!(a.num_columns(), 3);
        assert_eq!(a.num_rows(), 50);
        assert_eq!(a, generate_features(7, 50, 3).unwrap());
        assert_ne!(a, generate_features(8, 50, 3).unwrap());
    }

    #[test]
    fn zero_features_keep_row_count() {
        let f = generate_features(7, 12, 0).unwrap();
        assert_eq!(f.num_columns(), 0);
        assert_eq!(f.num_rows(), 12);
    }

    #[test]
    fn merge_columns_joins_by_position() {
        let base = generate(1, 10, true).unwrap();
        let features = generate_features(1, 10, 2).unwrap();
        let merged = merge_columns(&base, &features).unwrap();
        assert_eq!(merged.num_columns(), NUMERIC_COLUMNS + 2);
        assert_eq!(merged.num_rows(), 10);
        assert_eq!(merged.batch().column(0), base.batch().column(0));
        assert_eq!(merged.column_names()[NUMERIC_COLUMNS], "feature_0");
    }

    #[test]
    fn merge_rejects_mixed_shapes_and_lengths() {
        let numeric = generate(1, 10, true).unwrap();
        let realistic = generate(1, 10, false).unwrap();
        assert!(matches!(
            merge_columns(&numeric, &realistic),
            Err(GenerateError::InvalidShape(_))
        ));
        let short = generate_features(1, 5, 1).unwrap();
        assert!(matches!(
            merge_columns(&numeric, &short),
            Err(GenerateError::InvalidShape(_))
        ));
        assert!(matches!(
            merge_columns(&numeric, &numeric),
            Err(GenerateError::InvalidShape(_))
        ));
    }

    #[test]
    fn split_partition_sizes() {
        let b = SplitBoundaries::for_step(100, 10, 0);
        let ds = generate(0, b.total_rows(), true).unwrap();
        let parts = split(&ds, b).unwrap();
        assert_eq!(parts.train.num_rows(), 100);
        assert_eq!(parts.validation.num_rows(), 10);
        assert_eq!(parts.test.num_rows(), 10);

        let rebuilt = concat(&[parts.train, parts.validation, parts.test]).unwrap();
        assert_eq!(rebuilt, ds);
    }

    #[test]
    fn split_grows_train_with_step() {
        let b = SplitBoundaries::for_step(100, 10, 3);
        assert_eq!(b.train, 130);
        assert_eq!(b.total_rows(), 150);
    }

    #[test]
    fn split_out_of_bounds_is_invalid() {
        let ds = generate(0, 5, true).unwrap();
        let err = split(&ds, SplitBoundaries { train: 4, validation: 2 }).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidShape(_)));
    }

    #[test]
    fn concat_rejects_mixed_shapes() {
        let a = generate(0, 2, true).unwrap();
        let b = generate(0, 2, false).unwrap();
        assert!(concat(&[a, b]).is_err());
        assert!(concat(&[]).is_err());
    }
}
