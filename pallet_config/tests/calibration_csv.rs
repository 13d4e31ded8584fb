use std::fs::File;
use std::io::Write;

use pallet_config::{Calibration, CalibrationRow, load_calibration_csv};
use rstest::rstest;
use tempfile::tempdir;

#[rstest]
fn three_point_least_squares_fit() {
    // units = (raw - 1000) / 500, exact for determinism
    let rows = vec![
        CalibrationRow {
            raw: 1000,
            units: 0.0,
        },
        CalibrationRow {
            raw: 1500,
            units: 1.0,
        },
        CalibrationRow {
            raw: 2000,
            units: 2.0,
        },
    ];
    let c = Calibration::from_rows(&rows).unwrap();
    assert!((c.scale_factor - 500.0).abs() < 1e-3);
    assert_eq!(c.offset, 1000);
}

#[rstest]
fn csv_round_trips_through_loader() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calib.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "raw,units").unwrap();
    writeln!(f, "8000,0.0").unwrap();
    writeln!(f, "21000,0.65").unwrap();
    writeln!(f, "34000,1.3").unwrap();
    drop(f);

    let c = load_calibration_csv(&path).unwrap();
    assert_eq!(c.offset, 8000);
    assert!((c.scale_factor - 20_000.0).abs() < 1.0);
}

#[rstest]
#[case("raw,grams")]
#[case("units,raw")]
#[case("raw")]
fn csv_rejects_wrong_headers(#[case] header: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calib.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "{header}").unwrap();
    writeln!(f, "100,0.0").unwrap();
    drop(f);

    let err = load_calibration_csv(&path).expect_err("bad header");
    assert!(format!("{err}").contains("must have headers 'raw,units'"));
}

#[rstest]
fn csv_reports_bad_row_number() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calib.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "raw,units").unwrap();
    writeln!(f, "100,0.0").unwrap();
    writeln!(f, "abc,1.0").unwrap();
    drop(f);

    let err = load_calibration_csv(&path).expect_err("bad row");
    assert!(format!("{err}").contains("invalid CSV row 3"));
}

#[rstest]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(load_calibration_csv(&dir.path().join("nope.csv")).is_err());
}
