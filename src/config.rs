//! Pipeline configuration and output-directory initialization.

use std::path::PathBuf;

use crate::error::Result;

/// Default source for the raw yearly dump. `{year}` is substituted in.
pub const DEFAULT_SOURCE_URL_TEMPLATE: &str =
    "https://aire.cdmx.gob.mx/descargas/Opendata/anuales_horarios/contaminantes_{year}.csv";

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Year of the raw dump; selects input and output filenames.
    pub year: i32,
    /// Trailing-window size in days, anchored on the data's newest
    /// timestamp.
    pub days_back: i64,
    /// Where the raw file comes from. Not consumed by the pipeline; only
    /// echoed in the missing-input diagnostic.
    pub source_url_template: String,
    /// Root directory holding `raw/` and `processed/`.
    pub data_root: PathBuf,
    /// Directory receiving the Markdown report and chart images.
    pub reports_root: PathBuf,
    /// Pollutant highlighted in the weekly trend chart.
    pub focus_pollutant: String,
    /// Number of pollutants shown in the variation bar chart.
    pub top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            year: 2024,
            days_back: 60,
            source_url_template: DEFAULT_SOURCE_URL_TEMPLATE.to_string(),
            data_root: PathBuf::from("data"),
            reports_root: PathBuf::from("reports"),
            focus_pollutant: "PM2.5".to_string(),
            top_n: 5,
        }
    }
}

impl Config {
    /// Path of the raw yearly dump the user is expected to download.
    pub fn raw_input_path(&self) -> PathBuf {
        self.data_root
            .join("raw")
            .join(format!("contaminantes_{}.csv", self.year))
    }

    /// Path of the processed weekly CSV for the configured year.
    pub fn processed_output_path(&self) -> PathBuf {
        self.data_root
            .join("processed")
            .join(format!("cdmx_air_weekly_{}.csv", self.year))
    }

    /// Source URL with the year substituted into the template.
    pub fn source_url(&self) -> String {
        self.source_url_template
            .replace("{year}", &self.year.to_string())
    }

    /// Creates the processed-data and reports directories.
    ///
    /// Called once at pipeline startup; no write path creates directories
    /// implicitly.
    pub fn ensure_output_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.data_root.join("processed"))?;
        std::fs::create_dir_all(&self.reports_root)?;
        Ok(())
    }
}
