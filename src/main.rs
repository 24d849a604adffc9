//! CLI entry point for the DataPulse weekly air-quality pipeline.
//!
//! Provides subcommands for running the ETL alone (processed CSV only)
//! and for producing the full weekly Markdown report with charts.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use datapulse::config::{Config, DEFAULT_SOURCE_URL_TEMPLATE};
use datapulse::etl::run_etl;
use datapulse::output::print_json;
use datapulse::report::build_report;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "datapulse")]
#[command(about = "Weekly air-quality aggregation and reporting for CDMX open data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw yearly dump and write the processed weekly CSV
    Etl {
        #[command(flatten)]
        common: CommonArgs,

        /// Print the weekly summary as JSON after the run
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the ETL and render the weekly Markdown report with charts
    Report {
        #[command(flatten)]
        common: CommonArgs,

        /// Pollutant highlighted in the weekly trend chart
        #[arg(short, long, default_value = "PM2.5")]
        focus: String,

        /// Number of pollutants in the variation bar chart
        #[arg(long, default_value_t = 5)]
        top_n: usize,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Year of the raw dump (selects input and output filenames)
    #[arg(short, long, default_value_t = 2024)]
    year: i32,

    /// Trailing window in days, anchored on the newest measurement
    #[arg(short, long, default_value_t = 60)]
    days_back: i64,

    /// Directory holding raw/ and processed/
    #[arg(long, default_value = "data")]
    data_root: PathBuf,

    /// Directory receiving reports and chart images
    #[arg(long, default_value = "reports")]
    reports_root: PathBuf,

    /// URL template the raw dump is downloaded from ({year} is substituted)
    #[arg(long, default_value = DEFAULT_SOURCE_URL_TEMPLATE)]
    source_url_template: String,
}

impl CommonArgs {
    fn into_config(self, focus: Option<String>, top_n: Option<usize>) -> Config {
        let defaults = Config::default();
        Config {
            year: self.year,
            days_back: self.days_back,
            source_url_template: self.source_url_template,
            data_root: self.data_root,
            reports_root: self.reports_root,
            focus_pollutant: focus.unwrap_or(defaults.focus_pollutant),
            top_n: top_n.unwrap_or(defaults.top_n),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/datapulse.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("datapulse.log"));

    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Etl { common, json } => {
            let cfg = common.into_config(None, None);
            cfg.ensure_output_dirs()?;

            let weekly = run_etl(&cfg)?;
            info!(summary_rows = weekly.len(), "ETL finished");

            if json {
                print_json(&weekly)?;
            }
        }
        Commands::Report {
            common,
            focus,
            top_n,
        } => {
            let cfg = common.into_config(Some(focus), Some(top_n));
            cfg.ensure_output_dirs()?;

            let weekly = run_etl(&cfg)?;
            let path = build_report(&cfg, &weekly)?;
            info!(path = %path.display(), "Report finished");
        }
    }

    Ok(())
}
