//! Markdown report assembly over the weekly summary.
//!
//! A pure consumer of the aggregation output: builds the textual summary,
//! triggers the two chart renders, and writes the report document keyed
//! by the most recent Monday.

pub mod charts;

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::info;

use crate::config::Config;
use crate::etl::aggregate::WeeklySummary;
use crate::report::charts::{bar_top_variation, line_by_week};

/// Summary line shown when the window contains no data at all.
pub const NO_DATA_MESSAGE: &str = "- No data for filters.";

/// Placeholder used instead of an image reference when a chart has
/// nothing to draw.
const NO_CHART_MESSAGE: &str = "_No data to plot._";

/// Builds the textual summary: the latest analyzed week with its
/// measurement count, then the top-3 pollutants of that week by
/// intra-week spread (max - min).
///
/// An empty summary set is a valid outcome and yields
/// [`NO_DATA_MESSAGE`], never an error.
pub fn summarize(rows: &[WeeklySummary]) -> String {
    let Some(latest_week) = rows.iter().map(|r| r.year_week.as_str()).max() else {
        return NO_DATA_MESSAGE.to_string();
    };

    let week_rows: Vec<&WeeklySummary> =
        rows.iter().filter(|r| r.year_week == latest_week).collect();
    let total: u64 = week_rows.iter().map(|r| r.measurement_count).sum();

    let mut msg = vec![format!(
        "- Analyzed week: ***{latest_week}*** ({total} measurements)"
    )];

    let mut by_spread = week_rows;
    by_spread.sort_by(|a, b| {
        b.spread()
            .partial_cmp(&a.spread())
            .unwrap_or(Ordering::Equal)
    });

    let lines: Vec<String> = by_spread
        .iter()
        .take(3)
        .map(|r| {
            format!(
                " - {}: mean {:.2}, min {:.2}, max {:.2} (Δ {:.2})",
                r.pollutant,
                r.mean_value,
                r.min_value,
                r.max_value,
                r.spread()
            )
        })
        .collect();
    if !lines.is_empty() {
        msg.push(format!(
            "- Largest intra-week spread (top 3):\n{}",
            lines.join("\n")
        ));
    }

    msg.join("\n")
}

/// Most recent Monday on or before `today`; keys the report filename.
pub fn most_recent_monday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

/// Renders the two chart images and the Markdown report.
///
/// Charts with no data degrade to an explanatory line instead of a broken
/// image reference. Returns the path of the written report.
pub fn build_report(cfg: &Config, rows: &[WeeklySummary]) -> Result<PathBuf> {
    let line_chart = line_by_week(rows, &cfg.focus_pollutant, &cfg.reports_root)?;
    let bar_chart = bar_top_variation(rows, cfg.top_n, &cfg.reports_root)?;

    let monday = most_recent_monday(Local::now().date_naive());
    let path = cfg.reports_root.join(format!("report_{monday}.md"));

    let document = render_markdown(cfg, rows, monday, line_chart.as_deref(), bar_chart.as_deref());
    fs::write(&path, document)?;
    info!(path = %path.display(), "Report written");

    Ok(path)
}

fn render_markdown(
    cfg: &Config,
    rows: &[WeeklySummary],
    monday: NaiveDate,
    line_chart: Option<&Path>,
    bar_chart: Option<&Path>,
) -> String {
    let summary = summarize(rows);
    let line_ref = image_ref(line_chart, "Weekly trend");
    let bar_ref = image_ref(bar_chart, "Top variation");
    let focus = &cfg.focus_pollutant;

    format!(
        "# DataPulse - Weekly Air Quality Report (CDMX) - {monday}\n\
         \n\
         **Source:** SEDEMA CDMX hourly pollutant data (yearly CSV, {year}).\n\
         **Focus pollutant:** {focus}\n\
         \n\
         ## Summary\n\
         {summary}\n\
         \n\
         ## Weekly trend - {focus}\n\
         {line_ref}\n\
         \n\
         ## Top pollutant variation (analyzed window)\n\
         {bar_ref}\n",
        year = cfg.year,
    )
}

/// Relative image reference, or the no-data placeholder. Reports and
/// images share a directory, so only the file name is embedded.
fn image_ref(chart: Option<&Path>, alt: &str) -> String {
    match chart.and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
        Some(name) => format!("![{alt}]({name})"),
        None => NO_CHART_MESSAGE.to_string(),
    }
}
