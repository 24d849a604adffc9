use std::fs;
use std::path::PathBuf;

use datapulse::config::Config;
use datapulse::error::EtlError;
use datapulse::etl::run_etl;
use datapulse::etl::sniffer::{sniff_header, ExpectedSchema, Separator};
use datapulse::output::read_weekly_csv;

/// Raw dump with 6 metadata preamble lines, a comma-separated header
/// carrying one extra column, one malformed record and one unparseable
/// value.
const SAMPLE: &str = include_str!("fixtures/contaminantes_sample.csv");

/// Builds an isolated data root under the system temp directory and
/// places the fixture where the pipeline expects the raw dump.
fn setup(name: &str) -> Config {
    let root = std::env::temp_dir().join(format!("datapulse_it_{name}"));
    let _ = fs::remove_dir_all(&root);

    let cfg = Config {
        year: 2024,
        days_back: 60,
        data_root: root.join("data"),
        reports_root: root.join("reports"),
        ..Config::default()
    };

    fs::create_dir_all(cfg.data_root.join("raw")).unwrap();
    fs::write(cfg.raw_input_path(), SAMPLE).unwrap();
    cfg.ensure_output_dirs().unwrap();
    cfg
}

fn teardown(cfg: &Config) {
    let root = cfg.data_root.parent().unwrap();
    let _ = fs::remove_dir_all(root);
}

#[test]
fn test_sniffs_header_behind_preamble() {
    let spec = sniff_header(SAMPLE.as_bytes(), &ExpectedSchema::default())
        .unwrap()
        .unwrap();
    assert_eq!(spec.line_index, 6);
    assert_eq!(spec.separator, Separator::Comma);
}

#[test]
fn test_full_pipeline_aggregates_weekly() {
    let cfg = setup("full");

    let weekly = run_etl(&cfg).unwrap();

    // June 1st and 2nd 2024 share ISO week 22; one row per pollutant,
    // sorted by (year_week, pollutant).
    assert_eq!(weekly.len(), 2);

    let o3 = &weekly[0];
    assert_eq!(o3.year_week, "2024-W22");
    assert_eq!(o3.pollutant, "O3");
    assert_eq!(o3.measurement_count, 2); // the not_a_number row is dropped
    assert!((o3.mean_value - 52.5).abs() < 1e-9);

    let pm25 = &weekly[1];
    assert_eq!(pm25.pollutant, "PM2.5");
    assert!((pm25.mean_value - 15.0).abs() < 1e-9);
    assert!((pm25.min_value - 12.0).abs() < 1e-9);
    assert!((pm25.max_value - 18.0).abs() < 1e-9);
    assert_eq!(pm25.measurement_count, 3);

    teardown(&cfg);
}

#[test]
fn test_processed_csv_round_trip() {
    let cfg = setup("roundtrip");

    let weekly = run_etl(&cfg).unwrap();
    let back = read_weekly_csv(&cfg.processed_output_path()).unwrap();

    assert_eq!(back.len(), weekly.len());
    for (a, b) in weekly.iter().zip(&back) {
        assert_eq!(a.year_week, b.year_week);
        assert_eq!(a.pollutant, b.pollutant);
        assert!((a.mean_value - b.mean_value).abs() < 1e-9);
        assert!((a.min_value - b.min_value).abs() < 1e-9);
        assert!((a.max_value - b.max_value).abs() < 1e-9);
        assert_eq!(a.measurement_count, b.measurement_count);
    }

    teardown(&cfg);
}

#[test]
fn test_rerun_is_byte_identical() {
    let cfg = setup("idempotent");

    run_etl(&cfg).unwrap();
    let first = fs::read(cfg.processed_output_path()).unwrap();
    run_etl(&cfg).unwrap();
    let second = fs::read(cfg.processed_output_path()).unwrap();

    assert_eq!(first, second);

    teardown(&cfg);
}

#[test]
fn test_missing_input_is_fatal_with_path_and_hint() {
    let cfg = Config {
        data_root: PathBuf::from("/nonexistent/datapulse"),
        ..Config::default()
    };

    let err = run_etl(&cfg).unwrap_err();
    match err {
        EtlError::MissingInput { path, hint } => {
            assert_eq!(
                path,
                PathBuf::from("/nonexistent/datapulse/raw/contaminantes_2024.csv")
            );
            assert!(hint.contains("2024"));
        }
        other => panic!("expected MissingInput, got {other:?}"),
    }
}

#[test]
fn test_header_not_found_carries_preview_and_writes_nothing() {
    let cfg = setup("no_header");
    fs::write(
        cfg.raw_input_path(),
        "solo metadatos\nfecha;estacion;parametro\n1;2;3\n",
    )
    .unwrap();
    // A stale artifact from an earlier run must not survive a fatal error
    // masquerading as fresh output; start from a clean processed dir.
    let _ = fs::remove_file(cfg.processed_output_path());

    let err = run_etl(&cfg).unwrap_err();
    match err {
        EtlError::HeaderNotFound { preview } => {
            assert!(preview.contains("solo metadatos"));
        }
        other => panic!("expected HeaderNotFound, got {other:?}"),
    }
    assert!(!cfg.processed_output_path().exists());

    teardown(&cfg);
}

#[test]
fn test_zero_valid_rows_yields_empty_summary_not_error() {
    let cfg = setup("no_valid_rows");
    // Header is fine, every row fails coercion.
    fs::write(
        cfg.raw_input_path(),
        "date,id_station,id_parameter,value,unit\n\
         not-a-date,MER,PM2.5,12.0,UG/M3\n\
         2024-06-01 10:00:00,MER,PM2.5,n/a,UG/M3\n",
    )
    .unwrap();

    let weekly = run_etl(&cfg).unwrap();
    assert!(weekly.is_empty());

    // The processed CSV still materializes with its header row.
    let back = read_weekly_csv(&cfg.processed_output_path()).unwrap();
    assert!(back.is_empty());

    teardown(&cfg);
}

#[test]
fn test_narrow_window_still_keeps_the_newest_day() {
    let cfg = setup("narrow_window");

    let cfg = Config { days_back: 1, ..cfg };
    let weekly = run_etl(&cfg).unwrap();
    assert!(!weekly.is_empty());

    teardown(&cfg);
}
