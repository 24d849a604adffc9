//! Trailing time-window filter anchored on the data's own newest
//! timestamp.

use chrono::{Duration, NaiveTime};

use crate::etl::parser::Measurement;

/// Keeps measurements within `days_back` days of the newest timestamp.
///
/// The lower bound is midnight of the newest timestamp's date minus
/// `days_back` days; the upper bound is the newest timestamp itself. Both
/// bounds are inclusive. The anchor is the data, not the wall clock, so a
/// fixed snapshot always yields the same window. Empty input passes
/// through unchanged.
pub fn filter_trailing_window(measurements: Vec<Measurement>, days_back: i64) -> Vec<Measurement> {
    let Some(max_ts) = measurements.iter().map(|m| m.timestamp).max() else {
        return measurements;
    };

    let from = max_ts.date().and_time(NaiveTime::MIN) - Duration::days(days_back);

    measurements
        .into_iter()
        .filter(|m| m.timestamp >= from && m.timestamp <= max_ts)
        .collect()
}
