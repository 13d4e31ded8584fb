use pallet_config::Calibration;
use pallet_hardware::combined::VIRTUAL_COUNTS_PER_UNIT;
use pallet_hardware::{CombinedWeightSensor, SimulatedWeightSensor};
use pallet_traits::WeightSensor;
use rstest::rstest;

const CELL_COUNTS: f32 = 20_000.0;
const CELL_ZERO: i64 = 5_000;

fn cell_cal() -> Calibration {
    Calibration {
        scale_factor: CELL_COUNTS,
        offset: CELL_ZERO,
    }
}

fn to_units(raw: i64) -> f32 {
    raw as f32 / VIRTUAL_COUNTS_PER_UNIT
}

#[rstest]
#[case(1.0, 2.0, 3.0)]
#[case(0.0, 1.5, 1.5)]
#[case(-0.4, 1.5, 1.5)]
#[case(-1.0, -1.0, 0.0)]
fn total_is_sum_of_clamped_cells(#[case] a: f32, #[case] b: f32, #[case] total: f32) {
    let left = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    let right = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    left.handle().set_load(a);
    right.handle().set_load(b);
    let mut s = CombinedWeightSensor::new()
        .with_cell(left, cell_cal())
        .with_cell(right, cell_cal());

    let got = to_units(s.read_raw(1).expect("read"));
    assert!((got - total).abs() < 1e-3, "expected {total}, got {got}");
}

#[test]
fn negative_cell_is_reported_as_zero() {
    let left = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    let right = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    left.handle().set_load(-0.25);
    right.handle().set_load(2.0);
    let mut s = CombinedWeightSensor::new()
        .with_cell(left, cell_cal())
        .with_cell(right, cell_cal());
    let readings = s.readings();

    s.read_raw(1).expect("read");
    let cells = readings.get();
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0], 0.0);
    assert!((cells[1] - 2.0).abs() < 1e-4);
}

#[test]
fn controller_constants_shape_the_virtual_counts() {
    let cell = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    cell.handle().set_load(1.25);
    let mut s = CombinedWeightSensor::new().with_cell(cell, cell_cal());
    s.set_scale(1_000.0);
    s.set_offset(-300);
    assert_eq!(s.read_raw(1).expect("read"), -300 + 1_250);
}

#[test]
fn one_unready_cell_makes_the_pallet_unready() {
    let left = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    let right = SimulatedWeightSensor::with_cell(CELL_COUNTS, CELL_ZERO);
    let right_handle = right.handle();
    let mut s = CombinedWeightSensor::new()
        .with_cell(left, cell_cal())
        .with_cell(right, cell_cal());
    assert!(s.is_ready());
    right_handle.set_ready(false);
    assert!(!s.is_ready());
    assert!(s.read_raw(1).is_err());
}

#[test]
fn empty_combiner_is_never_ready() {
    let mut s = CombinedWeightSensor::new();
    assert!(s.is_empty());
    assert!(!s.is_ready());
}
