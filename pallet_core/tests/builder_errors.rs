use pallet_core::error::BuildError;
use pallet_core::mocks::NoopSensor;
use pallet_core::{Calibration, FilterCfg, PalletController, TapCfg};
use rstest::rstest;

#[rstest]
fn builder_missing_sensor_yields_typed_build_error() {
    let err = PalletController::builder()
        // missing with_sensor()
        .with_filter(FilterCfg::default())
        .try_build()
        .expect_err("should fail with MissingSensor");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingSensor) => {}
        other => panic!("expected MissingSensor, got: {other:?}"),
    }
}

#[rstest]
#[case::zero_window(FilterCfg { samples: 0, stability_threshold: 0.05 }, TapCfg::default(), Calibration::default())]
#[case::negative_threshold(FilterCfg { samples: 10, stability_threshold: -1.0 }, TapCfg::default(), Calibration::default())]
#[case::debounce_longer_than_window(
    FilterCfg::default(),
    TapCfg { debounce_ms: 4_000, ..TapCfg::default() },
    Calibration::default()
)]
#[case::ready_timeout_too_short(
    FilterCfg::default(),
    TapCfg { ready_timeout_ms: 1_000, ..TapCfg::default() },
    Calibration::default()
)]
#[case::zero_scale(
    FilterCfg::default(),
    TapCfg::default(),
    Calibration { scale_factor: 0.0, offset: 0 }
)]
fn builder_rejects_invalid_config(
    #[case] filter: FilterCfg,
    #[case] tap: TapCfg,
    #[case] calibration: Calibration,
) {
    let err = PalletController::builder()
        .with_sensor(NoopSensor)
        .with_filter(filter)
        .with_tap(tap)
        .with_calibration(calibration)
        .build()
        .expect_err("invalid config");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn builder_accepts_defaults_and_config_file() {
    let cfg = pallet_config::load_toml(
        r#"
[inventory]
unit_weight = 0.5

[[tags]]
id = "aa:bb:cc"
name = "Lorry 1"
"#,
    )
    .expect("parse");
    cfg.validate().expect("valid");
    let mut ctrl = PalletController::builder()
        .with_config(&cfg)
        .with_sensor(NoopSensor)
        .build()
        .expect("build");
    // directory comes from [[tags]]: unknown ids are rejected
    let ev = ctrl.handle_tag("DDEEFF").expect("tap");
    assert_eq!(ev[0].kind, pallet_core::EventKind::UnknownTag);
    let ev = ctrl.handle_tag("AABBCC").expect("tap");
    assert_eq!(ev[0].entity.as_deref(), Some("Lorry 1"));
}
