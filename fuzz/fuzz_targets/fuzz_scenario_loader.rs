#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(sc) = pallet_config::load_scenario(data) {
        let last = sc.steps.last().map_or(0, |s| s.at_ms);
        assert!(sc.duration_ms() >= last);
    }
});
