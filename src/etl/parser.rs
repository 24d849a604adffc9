//! Row parsing and cleaning for the detected tabular region.
//!
//! Turns the delimited lines below the header into typed [`Measurement`]s.
//! Bad rows never abort the run: a wrong field count skips the record, a
//! failed coercion drops it, and both outcomes are counted.

use std::collections::HashMap;
use std::io::BufRead;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{EtlError, Result};
use crate::etl::sniffer::{lossy_lines, ExpectedSchema, HeaderSpec};

/// One cleaned hourly measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// UTC-naive instant the observation was taken.
    pub timestamp: NaiveDateTime,
    pub station: String,
    pub pollutant: String,
    /// Always finite; rows with non-finite or unparseable values are
    /// dropped, never repaired.
    pub value: f64,
    pub unit: String,
}

/// Cleaned rows plus counts of what was discarded on the way.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub measurements: Vec<Measurement>,
    /// Records whose field count did not match the header.
    pub skipped_malformed: usize,
    /// Records whose timestamp or value failed coercion.
    pub dropped_unparseable: usize,
}

/// Why a raw cell could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    BadTimestamp(String),
    BadNumber(String),
}

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Permissive datetime coercion: every known layout is tried, then a bare
/// date (taken as midnight). The caller decides what to do with a
/// failure; this function never drops anything itself.
pub fn parse_timestamp(raw: &str) -> std::result::Result<NaiveDateTime, CoerceError> {
    let raw = raw.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts);
        }
    }
    Err(CoerceError::BadTimestamp(raw.to_string()))
}

/// Permissive numeric coercion. Non-finite values are rejected.
pub fn parse_value(raw: &str) -> std::result::Result<f64, CoerceError> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CoerceError::BadNumber(raw.to_string())),
    }
}

/// Parses the tabular region described by `spec` into measurements.
///
/// Lines strictly before `spec.line_index` are skipped; the header line
/// supplies lower-cased, trimmed column names. Every required column must
/// be present after normalization, otherwise the run stops with
/// [`EtlError::SchemaMismatch`]. Data rows keep their original casing.
pub fn parse_measurements<R: BufRead>(
    reader: R,
    spec: &HeaderSpec,
    schema: &ExpectedSchema,
) -> Result<ParseOutcome> {
    let mut lines = lossy_lines(reader).skip(spec.line_index);

    let header_line = match lines.next() {
        Some(line) => line?.trim().to_lowercase(),
        None => {
            return Err(EtlError::SchemaMismatch {
                missing: schema.columns().iter().map(|c| c.to_string()).collect(),
            });
        }
    };
    let columns = spec.separator.tokenize(&header_line);

    // First occurrence wins when a column name repeats.
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, name) in columns.iter().enumerate() {
        index_of.entry(name.as_str()).or_insert(i);
    }

    let missing: Vec<String> = schema
        .columns()
        .iter()
        .filter(|c| !index_of.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::SchemaMismatch { missing });
    }

    // Canonical renames: date -> timestamp, id_station -> station,
    // id_parameter -> pollutant.
    let date_idx = index_of["date"];
    let station_idx = index_of["id_station"];
    let pollutant_idx = index_of["id_parameter"];
    let value_idx = index_of["value"];
    let unit_idx = index_of["unit"];

    let mut outcome = ParseOutcome::default();

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let fields = spec.separator.tokenize(&line);
        if fields.len() != columns.len() {
            outcome.skipped_malformed += 1;
            continue;
        }

        let (Ok(timestamp), Ok(value)) = (
            parse_timestamp(&fields[date_idx]),
            parse_value(&fields[value_idx]),
        ) else {
            outcome.dropped_unparseable += 1;
            continue;
        };

        outcome.measurements.push(Measurement {
            timestamp,
            station: fields[station_idx].clone(),
            pollutant: fields[pollutant_idx].clone(),
            value,
            unit: fields[unit_idx].clone(),
        });
    }

    Ok(outcome)
}
