//! Package validation and normalization
//!
//! Turns raw field maps (decoded JSON bodies or stringly CSV rows) into
//! `PackageRecord`s. Numeric fields accept either JSON numbers or numeric
//! strings; `timestamp` and `suspicious` truncate any fractional part.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::PackageRecord;

const REQUIRED_KEYS: [&str; 5] = ["ip", "latitude", "longitude", "timestamp", "suspicious"];

/// Errors produced while validating a raw package
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field '{0}' is not a finite number")]
    NotFinite(&'static str),

    #[error("field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("field 'ip' is not a string")]
    BadIp,
}

/// Parse a raw field map into a validated `PackageRecord`.
///
/// Latitude and longitude must be finite and within [-90, 90] / [-180, 180];
/// boundary values and exact zeros are accepted, as is a zero timestamp.
pub fn parse_package(fields: &Map<String, Value>) -> Result<PackageRecord, ValidationError> {
    for key in REQUIRED_KEYS {
        if !fields.contains_key(key) {
            return Err(ValidationError::MissingField(key));
        }
    }

    let ip = match &fields["ip"] {
        Value::String(s) => s.clone(),
        _ => return Err(ValidationError::BadIp),
    };

    let latitude = numeric_field(fields, "latitude")?;
    let longitude = numeric_field(fields, "longitude")?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::OutOfRange {
            field: "latitude",
            value: latitude,
        });
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::OutOfRange {
            field: "longitude",
            value: longitude,
        });
    }

    // Truncating coercion, matching the producer's integer handling
    let timestamp = numeric_field(fields, "timestamp")?.trunc() as i64;
    let suspicious = match &fields["suspicious"] {
        Value::Bool(b) => *b,
        _ => numeric_field(fields, "suspicious")?.trunc() as i64 != 0,
    };

    Ok(PackageRecord {
        ip,
        latitude,
        longitude,
        timestamp,
        suspicious,
    })
}

fn numeric_field(fields: &Map<String, Value>, key: &'static str) -> Result<f64, ValidationError> {
    let value = &fields[key];
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(ValidationError::NotFinite(key)),
        None => Err(ValidationError::NotNumeric {
            field: key,
            value: value.to_string(),
        }),
    }
}
