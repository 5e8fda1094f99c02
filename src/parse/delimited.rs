// src/parse/delimited.rs

use csv::ReaderBuilder;
use std::{io::Read, path::Path};
use tracing::{debug, instrument};

use crate::data::{Dataset, Value};
use crate::error::ParseError;

/// Read delimited text with a header row. Empty cells are null; with
/// `infer_types`, integer and float cells become numbers.
pub fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    infer_types: bool,
) -> Result<Dataset, ParseError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut ds = Dataset::new(headers);

    for record in rdr.records() {
        let record = record?;
        ds.push_row(record.iter().map(|cell| cell_value(cell, infer_types)).collect());
    }
    Ok(ds)
}

/// Read a comma-separated file such as an exported statistics sheet.
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_csv_file(path: impl AsRef<Path>, infer_types: bool) -> Result<Dataset, ParseError> {
    let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
    let ds = read_delimited(file, b',', infer_types)?;
    debug!(rows = ds.len(), columns = ds.width(), "read csv");
    Ok(ds)
}

fn cell_value(cell: &str, infer_types: bool) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if infer_types && cell.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(n) = cell.parse::<i64>() {
            return Value::Int(n);
        }
        if let Ok(x) = cell.parse::<f64>() {
            return Value::Float(x);
        }
    }
    Value::Text(cell.to_string())
}
