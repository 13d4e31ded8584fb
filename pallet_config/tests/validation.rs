use pallet_config::load_toml;
use pallet_traits::TagDirectory;
use rstest::rstest;

const FULL: &str = r#"
[pins]
hx711_dt = 5
hx711_sck = 18

[filter]
samples = 10
stability_threshold = 0.05

[inventory]
unit_weight = 0.65
min_weight = 0.1
max_weight = 20.0

[tap]
double_tap_window_ms = 3000
debounce_ms = 500
completion_dwell_ms = 3000
ready_timeout_ms = 300000

[timing]
sample_ms = 100
tag_poll_ms = 50
tag_timeout_ms = 50
publish_ms = 2000

[sensor]
read_samples = 1
tare_samples = 10
calibration_samples = 15
max_consecutive_failures = 5

[calibration]
scale_factor = 21500.0
offset = 8120

[[tags]]
id = "AA:BB:CC"
name = "Lorry 1"

[[tags]]
id = "04A10F22"
name = "Lorry 2"
"#;

#[test]
fn accepts_full_firmware_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.calibration.offset, 8120);
    let tags = cfg.known_tags();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags.lookup("aabbcc").as_deref(), Some("Lorry 1"));
}

#[rstest]
#[case("[filter]\nsamples = 0\n", "filter.samples must be >= 1")]
#[case("[filter]\nstability_threshold = 0.0\n", "filter.stability_threshold")]
#[case("[inventory]\nunit_weight = 0.0\n", "inventory.unit_weight must be > 0")]
#[case("[inventory]\nmin_weight = 5.0\nmax_weight = 1.0\n", "inventory.max_weight")]
#[case("[tap]\ndebounce_ms = 3000\n", "tap.debounce_ms")]
#[case("[tap]\nready_timeout_ms = 1000\n", "tap.ready_timeout_ms")]
#[case("[timing]\nsample_ms = 0\n", "timing.sample_ms must be >= 1")]
#[case("[timing]\ntag_timeout_ms = 5000\n", "timing.tag_timeout_ms")]
#[case("[sensor]\nmax_consecutive_failures = 0\n", "sensor.max_consecutive_failures")]
#[case("[calibration]\nscale_factor = 0.0\n", "calibration.scale_factor")]
#[case("[pins]\nhx711_gain_pulses = 24\n", "pins.hx711_gain_pulses")]
#[case("[[tags]]\nid = \"\"\nname = \"x\"\n", "tags[0].id must not be empty")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn unknown_field_types_fail_to_parse() {
    assert!(load_toml("[filter]\nsamples = \"ten\"\n").is_err());
}
