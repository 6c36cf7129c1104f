use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{batch_from_columns, DataShape, Dataset};
use crate::errors::GenerateError;

const GENDERS: [&str; 2] = ["male", "female"];
const TOPICS: [&str; 10] = [
    "Student",
    "InvestmentBanking",
    "indUnk",
    "Non-Profit",
    "Banking",
    "Education",
    "Engineering",
    "Science",
    "Communications-Media",
    "Technology",
];
const SIGNS: [&str; 12] = [
    "Aries",
    "Taurus",
    "Gemini",
    "Cancer",
    "Leo",
    "Virgo",
    "Libra",
    "Scorpio",
    "Sagittarius",
    "Capricorn",
    "Aquarius",
    "Pisces",
];
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const TEXT_LEN: usize = 100;
const DATE_FORMAT: &str = "%d,%B,%Y";

fn first_post() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2004, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Row generator for append-mode growth.
///
/// Keeps a monotonically increasing `id` and a post date that advances one
/// hour per row, so rows appended across steps stay ordered and
/// distinguishable.
#[derive(Debug, Clone)]
pub struct BlogRowGenerator {
    counter: i64,
    date: NaiveDateTime,
    rng: ChaCha8Rng,
}

impl BlogRowGenerator {
    /// Start at id 0 on 1 January 2004.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::starting_at(seed, 0, first_post())
    }

    #[must_use]
    pub fn starting_at(seed: u64, counter: i64, date: NaiveDateTime) -> Self {
        Self {
            counter,
            date,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Id the next generated row will get.
    #[must_use]
    pub fn counter(&self) -> i64 {
        self.counter
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[self.rng.random_range(0..options.len())]
    }

    fn text(&mut self) -> String {
        (0..TEXT_LEN)
            .map(|_| char::from(LETTERS[self.rng.random_range(0..LETTERS.len())]))
            .collect()
    }

    /// Produce the next `rows` rows and advance the counter and date.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Arrow`] if the batch can't be assembled.
    pub fn generate(&mut self, rows: usize) -> Result<Dataset, GenerateError> {
        let mut ids = Vec::with_capacity(rows);
        let mut genders = Vec::with_capacity(rows);
        let mut ages = Vec::with_capacity(rows);
        let mut topics = Vec::with_capacity(rows);
        let mut signs = Vec::with_capacity(rows);
        let mut dates = Vec::with_capacity(rows);
        let mut texts = Vec::with_capacity(rows);

        for _ in 0..rows {
            ids.push(self.counter);
            genders.push(self.pick(&GENDERS));
            ages.push(self.rng.random_range(0..=100_i64));
            topics.push(self.pick(&TOPICS));
            signs.push(self.pick(&SIGNS));
            dates.push(self.date.format(DATE_FORMAT).to_string());
            texts.push(self.text());

            self.counter += 1;
            self.date += TimeDelta::hours(1);
        }

        let fields = vec![
            Field::new("id", DataType::Int64, false),
            Field::new("gender", DataType::Utf8, false),
            Field::new("age", DataType::Int64, false),
            Field::new("topic", DataType::Utf8, false),
            Field::new("signs", DataType::Utf8, false),
            Field::new("date", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
        ];
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(genders)),
            Arc::new(Int64Array::from(ages)),
            Arc::new(StringArray::from(topics)),
            Arc::new(StringArray::from(signs)),
            Arc::new(StringArray::from(dates)),
            Arc::new(StringArray::from(texts)),
        ];
        Ok(Dataset::new(
            DataShape::Blog,
            batch_from_columns(fields, columns, rows)?,
        ))
    }
}
