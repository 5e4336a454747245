//! CSV batch source for the replay client
//!
//! Reads a headered CSV of raw packages and runs each row through the
//! validator. Malformed rows are logged and skipped; only a file that
//! cannot be opened or read at all fails the batch.

use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::PackageRecord;
use crate::validate::parse_package;

#[derive(Error, Debug)]
pub enum CsvSourceError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Batch record source backed by a CSV file with a header row.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: PathBuf) -> Self {
        CsvSource { path }
    }

    /// Read every row, returning the valid records in file order.
    pub fn read_batch(&self) -> Result<Vec<PackageRecord>, CsvSourceError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping unreadable CSV row {}: {}", line + 2, e);
                    continue;
                }
            };

            let mut fields = Map::new();
            for (key, value) in headers.iter().zip(row.iter()) {
                fields.insert(key.to_string(), Value::String(value.to_string()));
            }

            match parse_package(&fields) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping invalid package on row {}: {}", line + 2, e),
            }
        }

        Ok(records)
    }
}
