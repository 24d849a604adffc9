//! PNG chart rendering for the weekly report.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use plotters::prelude::*;
use tracing::debug;

use crate::etl::aggregate::WeeklySummary;

const CHART_SIZE: (u32, u32) = (900, 600);
const CAPTION_FONT: (&str, i32) = ("sans-serif", 24);

/// Line of the weekly mean for one pollutant, matched case-insensitively
/// as a substring. Weeks appear in chronological order on the x axis.
///
/// Returns the image path, or `None` when no summary row matches.
pub fn line_by_week(
    rows: &[WeeklySummary],
    pollutant: &str,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    let needle = pollutant.to_lowercase();
    let mut sub: Vec<&WeeklySummary> = rows
        .iter()
        .filter(|r| r.pollutant.to_lowercase().contains(&needle))
        .collect();
    if sub.is_empty() {
        return Ok(None);
    }

    // ISO labels sort chronologically as plain strings.
    sub.sort_by(|a, b| a.year_week.cmp(&b.year_week));

    let labels: Vec<String> = sub.iter().map(|r| r.year_week.clone()).collect();
    let means: Vec<f64> = sub.iter().map(|r| r.mean_value).collect();
    let (y_min, y_max) = padded_range(&means);
    let x_max = labels.len().saturating_sub(1).max(1);

    let out = out_dir.join(format!("line_{}.png", slug(pollutant)));
    {
        let root = BitMapBackend::new(&out, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{pollutant} weekly mean (CDMX)"), CAPTION_FONT)
            .margin(12)
            .x_label_area_size(70)
            .y_label_area_size(60)
            .build_cartesian_2d(0..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_labels(labels.len().min(20))
            .x_label_formatter(&|i: &usize| labels.get(*i).cloned().unwrap_or_default())
            .x_desc("Week (chronological order)")
            .y_desc("Mean concentration")
            .draw()?;

        chart.draw_series(LineSeries::new(
            means.iter().enumerate().map(|(i, &v)| (i, v)),
            &BLUE,
        ))?;
        chart.draw_series(
            means
                .iter()
                .enumerate()
                .map(|(i, &v)| Circle::new((i, v), 4, BLUE.filled())),
        )?;

        root.present()?;
    }

    debug!(path = %out.display(), weeks = labels.len(), "Line chart rendered");
    Ok(Some(out))
}

/// Bar chart of the top-N pollutants by total variation across the
/// window, where variation is the global max of `valor_max` minus the
/// global min of `valor_min`.
///
/// Returns the image path, or `None` when the summary is empty.
pub fn bar_top_variation(
    rows: &[WeeklySummary],
    top_n: usize,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    let variations = top_variations(rows, top_n);
    if variations.is_empty() {
        return Ok(None);
    }

    let y_max = variations
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0_f64, f64::max)
        .max(1.0)
        * 1.1;

    let out = out_dir.join("bar_top_variation.png");
    {
        let root = BitMapBackend::new(&out, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Top {} pollutants by variation", variations.len()),
                CAPTION_FONT,
            )
            .margin(12)
            .x_label_area_size(60)
            .y_label_area_size(60)
            .build_cartesian_2d((0..variations.len()).into_segmented(), 0.0..y_max)?;

        let names: Vec<String> = variations.iter().map(|(p, _)| p.clone()).collect();
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&move |seg: &SegmentValue<usize>| match seg {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    names.get(*i).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .x_desc("Pollutant")
            .y_desc("Δ (global max - global min)")
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.filled())
                .margin(20)
                .data(variations.iter().enumerate().map(|(i, (_, v))| (i, *v))),
        )?;

        root.present()?;
    }

    debug!(path = %out.display(), bars = variations.len(), "Bar chart rendered");
    Ok(Some(out))
}

/// Per-pollutant total variation, sorted descending and truncated to
/// `top_n` entries.
fn top_variations(rows: &[WeeklySummary], top_n: usize) -> Vec<(String, f64)> {
    let mut extremes: HashMap<&str, (f64, f64)> = HashMap::new();
    for r in rows {
        let entry = extremes
            .entry(r.pollutant.as_str())
            .or_insert((r.min_value, r.max_value));
        entry.0 = entry.0.min(r.min_value);
        entry.1 = entry.1.max(r.max_value);
    }

    let mut variations: Vec<(String, f64)> = extremes
        .into_iter()
        .map(|(p, (lo, hi))| (p.to_string(), hi - lo))
        .collect();
    variations.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    variations.truncate(top_n);
    variations
}

/// File-name fragment for a pollutant: `PM2.5` becomes `pm25`.
fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn padded_range(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.1).max(1.0);
    (min - pad, max + pad)
}
