//! ISO-week aggregation of cleaned measurements.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::etl::parser::Measurement;

/// One aggregation row per (ISO week, pollutant) pair.
///
/// Serialized field names match the processed CSV contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub year_week: String,
    #[serde(rename = "contaminante")]
    pub pollutant: String,
    #[serde(rename = "valor_promedio")]
    pub mean_value: f64,
    #[serde(rename = "valor_min")]
    pub min_value: f64,
    #[serde(rename = "valor_max")]
    pub max_value: f64,
    #[serde(rename = "mediciones")]
    pub measurement_count: u64,
}

impl WeeklySummary {
    /// Intra-week variability signal: max minus min observed value.
    pub fn spread(&self) -> f64 {
        self.max_value - self.min_value
    }
}

/// ISO 8601 week label with `%G-W%V` semantics. The year component is the
/// ISO week-numbering year, so late-December timestamps may label into
/// week 1 of the next year and early-January ones into week 52/53 of the
/// previous.
pub fn iso_year_week(ts: NaiveDateTime) -> String {
    let week = ts.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

#[derive(Debug)]
struct Accumulator {
    sum: f64,
    min: f64,
    max: f64,
    count: u64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            sum: value,
            min: value,
            max: value,
            count: 1,
        }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
    }
}

/// Groups measurements by (ISO week label, pollutant) and computes mean,
/// min, max and count per group.
///
/// Output rows come back sorted ascending by (year_week, pollutant);
/// empty input yields an empty vector, not an error.
pub fn aggregate_weekly(measurements: &[Measurement]) -> Vec<WeeklySummary> {
    // BTreeMap keys iterate in (year_week, pollutant) order.
    let mut buckets: BTreeMap<(String, String), Accumulator> = BTreeMap::new();

    for m in measurements {
        let key = (iso_year_week(m.timestamp), m.pollutant.clone());
        buckets
            .entry(key)
            .and_modify(|acc| acc.add(m.value))
            .or_insert_with(|| Accumulator::new(m.value));
    }

    buckets
        .into_iter()
        .map(|((year_week, pollutant), acc)| WeeklySummary {
            year_week,
            pollutant,
            mean_value: acc.sum / acc.count as f64,
            min_value: acc.min,
            max_value: acc.max,
            measurement_count: acc.count,
        })
        .collect()
}
