//! Output formatting and persistence for the weekly summary.
//!
//! Supports pretty-printing, JSON serialization, and the processed CSV
//! artifact.

use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::etl::aggregate::WeeklySummary;

/// Logs the summary rows using Rust's debug pretty-print format.
pub fn print_pretty(rows: &[WeeklySummary]) {
    debug!("{:#?}", rows);
}

/// Logs the summary rows as pretty-printed JSON.
pub fn print_json(rows: &[WeeklySummary]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(rows)?);
    Ok(())
}

/// Writes the processed CSV: header row plus one row per summary entry,
/// comma-separated.
///
/// An existing file for the same year is overwritten whole, never
/// appended to, so re-running an unchanged input produces byte-identical
/// output.
pub fn write_weekly_csv(path: &Path, rows: &[WeeklySummary]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing processed CSV");

    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        // serialize() only emits the header alongside a first record.
        writer.write_record([
            "year_week",
            "contaminante",
            "valor_promedio",
            "valor_min",
            "valor_max",
            "mediciones",
        ])?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Reads a processed CSV back into summary rows.
pub fn read_weekly_csv(path: &Path) -> Result<Vec<WeeklySummary>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}
