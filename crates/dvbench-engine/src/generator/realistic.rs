use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field};
use fake::faker::address::en::{
    BuildingNumber, CityName, CountryName, StateName, StreetName, ZipCode,
};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::job::en::Title;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{batch_from_columns, DataShape, Dataset};
use crate::errors::GenerateError;

const TEXT_COLUMNS: [&str; 11] = [
    "Name",
    "Email",
    "Phone",
    "Address",
    "City",
    "State",
    "Zip",
    "Country",
    "Company",
    "Job Title",
    "SSN",
];

fn person(rng: &mut ChaCha8Rng) -> ([String; 11], f64, f64) {
    let address = format!(
        "{} {}",
        BuildingNumber().fake_with_rng::<String, _>(rng),
        StreetName().fake_with_rng::<String, _>(rng)
    );
    let ssn = format!(
        "{:03}-{:02}-{:04}",
        rng.random_range(100..900),
        rng.random_range(1..100),
        rng.random_range(1..10_000)
    );
    let text = [
        Name().fake_with_rng(rng),
        SafeEmail().fake_with_rng(rng),
        PhoneNumber().fake_with_rng(rng),
        address,
        CityName().fake_with_rng(rng),
        StateName().fake_with_rng(rng),
        ZipCode().fake_with_rng(rng),
        CountryName().fake_with_rng(rng),
        CompanyName().fake_with_rng(rng),
        Title().fake_with_rng(rng),
        ssn,
    ];
    let latitude = rng.random_range(-90.0..90.0);
    let longitude = rng.random_range(-180.0..180.0);
    (text, latitude, longitude)
}

pub(super) fn generate_realistic(seed: u64, rows: usize) -> Result<Dataset, GenerateError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut text: Vec<Vec<String>> = vec![Vec::with_capacity(rows); TEXT_COLUMNS.len()];
    let mut latitude = Vec::with_capacity(rows);
    let mut longitude = Vec::with_capacity(rows);

    for _ in 0..rows {
        let (values, lat, long) = person(&mut rng);
        for (column, value) in text.iter_mut().zip(values) {
            column.push(value);
        }
        latitude.push(lat);
        longitude.push(long);
    }

    let mut fields: Vec<Field> = TEXT_COLUMNS
        .iter()
        .map(|name| Field::new(*name, DataType::Utf8, false))
        .collect();
    fields.push(Field::new("Latitude", DataType::Float64, false));
    fields.push(Field::new("Longitude", DataType::Float64, false));

    let mut columns: Vec<ArrayRef> = text
        .into_iter()
        .map(|column| Arc::new(StringArray::from(column)) as ArrayRef)
        .collect();
    columns.push(Arc::new(Float64Array::from(latitude)));
    columns.push(Arc::new(Float64Array::from(longitude)));

    Ok(Dataset::new(
        DataShape::Realistic,
        batch_from_columns(fields, columns, rows)?,
    ))
}
