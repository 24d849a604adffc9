use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors.
///
/// Row-level problems (malformed records, unparseable cells) are never
/// surfaced through this enum: they drop the affected row, bump a counter,
/// and the run continues.
#[derive(Error, Debug)]
pub enum EtlError {
    /// The raw yearly dump is not on disk at the expected path.
    #[error("Input file not found: {path} (download it from {hint} into data/raw/ first)")]
    MissingInput { path: PathBuf, hint: String },

    /// No line in the file passed the header superset test under any
    /// separator.
    #[error(
        "Could not locate a header line containing the columns \
         [date, id_station, id_parameter, value, unit].\nFirst lines of the file:\n{preview}"
    )]
    HeaderNotFound { preview: String },

    /// A header was detected, but required columns are absent after
    /// normalization.
    #[error("Missing required columns: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    /// The processed CSV could not be written or read back.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The weekly summary could not be serialized for printing.
    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for raw I/O errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, EtlError>;
