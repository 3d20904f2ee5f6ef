//! CSV ingestion for feature vectors.
//!
//! Two layouts are accepted:
//! - rows: every line is one vector, all lines the same width
//! - flat: the whole file is one vector, values split by commas and/or newlines
//!
//! Empty fields (e.g. trailing commas) are ignored.

use crate::io::matrix::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}, column {col}: cannot parse {value:?} as a number")]
    Parse { row: usize, col: usize, value: String },
    #[error("row {row}, column {col}: value is not finite")]
    NonFinite { row: usize, col: usize },
    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
    #[error("no values found")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CsvLayout {
    Rows,
    Flat,
}

pub fn load(path: &Path, layout: CsvLayout) -> Result<FeatureMatrix, IngestError> {
    match layout {
        CsvLayout::Rows => load_rows(path),
        CsvLayout::Flat => load_flat(path),
    }
}

pub fn load_rows(path: &Path) -> Result<FeatureMatrix, IngestError> {
    read_rows(std::fs::File::open(path)?)
}

pub fn load_flat(path: &Path) -> Result<FeatureMatrix, IngestError> {
    read_flat(std::fs::File::open(path)?)
}

pub fn read_rows<R: Read>(source: R) -> Result<FeatureMatrix, IngestError> {
    let mut reader = reader(source);
    let mut dim = None;
    let mut data = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let start = data.len();
        parse_record(&record, row, &mut data)?;

        let found = data.len() - start;
        if found == 0 {
            continue;
        }
        match dim {
            None => dim = Some(found),
            Some(expected) if expected != found => {
                return Err(IngestError::RaggedRow { row, expected, found });
            }
            Some(_) => {}
        }
    }

    let dim = dim.ok_or(IngestError::Empty)?;
    tracing::debug!(rows = data.len() / dim, dim, "loaded feature rows");
    Ok(FeatureMatrix::from_flat(dim, data))
}

pub fn read_flat<R: Read>(source: R) -> Result<FeatureMatrix, IngestError> {
    let mut reader = reader(source);
    let mut data = Vec::new();

    for (row, record) in reader.records().enumerate() {
        parse_record(&record?, row, &mut data)?;
    }

    if data.is_empty() {
        return Err(IngestError::Empty);
    }
    tracing::debug!(dim = data.len(), "loaded flat feature vector");
    Ok(FeatureMatrix::from_flat(data.len(), data))
}

pub fn write_rows(path: &Path, matrix: &FeatureMatrix) -> Result<(), IngestError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for row in matrix.iter_rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

fn parse_record(record: &csv::StringRecord, row: usize, out: &mut Vec<f32>) -> Result<(), IngestError> {
    for (col, field) in record.iter().enumerate() {
        if field.is_empty() {
            continue;
        }
        let value: f32 = field
            .parse()
            .map_err(|_| IngestError::Parse { row, col, value: field.to_string() })?;
        if !value.is_finite() {
            return Err(IngestError::NonFinite { row, col });
        }
        out.push(value);
    }
    Ok(())
}
