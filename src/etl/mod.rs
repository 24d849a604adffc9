//! Weekly aggregation pipeline for the hourly pollutant dump.
//!
//! Stages run strictly left to right: header sniffing, row parsing and
//! cleaning, trailing-window filtering, ISO-week aggregation. The
//! processed CSV is written only after the full summary is in memory, so
//! a fatal error never leaves a partial artifact behind.

pub mod aggregate;
pub mod parser;
pub mod sniffer;
pub mod window;

use std::fs::File;
use std::io::BufReader;

use tracing::info;

use crate::config::Config;
use crate::error::{EtlError, Result};
use crate::etl::aggregate::{aggregate_weekly, WeeklySummary};
use crate::etl::parser::parse_measurements;
use crate::etl::sniffer::{preview_lines, sniff_header, ExpectedSchema};
use crate::etl::window::filter_trailing_window;
use crate::output::write_weekly_csv;

/// Number of leading lines shown when header detection fails.
const PREVIEW_LINES: usize = 8;

/// Runs extraction, cleaning, windowing and aggregation for one raw dump,
/// then persists the processed CSV for the configured year.
pub fn run_etl(cfg: &Config) -> Result<Vec<WeeklySummary>> {
    let input = cfg.raw_input_path();
    if !input.exists() {
        return Err(EtlError::MissingInput {
            path: input,
            hint: cfg.source_url(),
        });
    }

    let schema = ExpectedSchema::default();

    let sniffed = {
        let reader = BufReader::new(File::open(&input)?);
        sniff_header(reader, &schema)?
    };
    let Some(spec) = sniffed else {
        return Err(EtlError::HeaderNotFound {
            preview: preview_lines(&input, PREVIEW_LINES)?,
        });
    };
    info!(
        line_index = spec.line_index,
        separator = ?spec.separator,
        "Header detected"
    );

    let parsed = {
        let reader = BufReader::new(File::open(&input)?);
        parse_measurements(reader, &spec, &schema)?
    };
    info!(
        rows = parsed.measurements.len(),
        skipped_malformed = parsed.skipped_malformed,
        dropped_unparseable = parsed.dropped_unparseable,
        "Rows cleaned"
    );

    let windowed = filter_trailing_window(parsed.measurements, cfg.days_back);
    let weekly = aggregate_weekly(&windowed);
    info!(
        windowed_rows = windowed.len(),
        summary_rows = weekly.len(),
        "Weekly aggregation complete"
    );

    let out = cfg.processed_output_path();
    write_weekly_csv(&out, &weekly)?;
    info!(path = %out.display(), "Processed CSV written");

    Ok(weekly)
}
