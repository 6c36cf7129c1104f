use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{batch_from_columns, DataShape, Dataset, NUMERIC_COLUMNS};
use crate::errors::GenerateError;

/// PRNG stream reserved for feature matrices.
const FEATURE_STREAM: u64 = 1;

/// Draw a `rows × cols` uniform matrix in row-major order and return it as
/// named `Float64` columns.
fn uniform_matrix(
    rng: &mut ChaCha8Rng,
    rows: usize,
    names: impl Iterator<Item = String>,
) -> Result<Dataset, GenerateError> {
    let names: Vec<String> = names.collect();
    let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(rows); names.len()];
    for _ in 0..rows {
        for column in &mut values {
            column.push(rng.random::<f64>());
        }
    }

    let fields = names
        .iter()
        .map(|name| Field::new(name, DataType::Float64, false))
        .collect();
    let columns = values
        .into_iter()
        .map(|column| Arc::new(Float64Array::from(column)) as ArrayRef)
        .collect();
    Ok(Dataset::new(
        DataShape::Numeric,
        batch_from_columns(fields, columns, rows)?,
    ))
}

pub(super) fn generate_numeric(seed: u64, rows: usize) -> Result<Dataset, GenerateError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    uniform_matrix(&mut rng, rows, (0..NUMERIC_COLUMNS).map(|i| format!("col_{i}")))
}

pub(super) fn generate_features(
    seed: u64,
    rows: usize,
    feature_count: usize,
) -> Result<Dataset, GenerateError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(FEATURE_STREAM);
    uniform_matrix(&mut rng, rows, (0..feature_count).map(|i| format!("feature_{i}")))
}
