#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let parsed = toml::from_str::<pallet_config::Config>(data);
    if let Ok(cfg) = parsed
        && cfg.validate().is_ok()
    {
        let tags = cfg.known_tags();
        assert_eq!(tags.len(), cfg.tags.len());
    }
});
