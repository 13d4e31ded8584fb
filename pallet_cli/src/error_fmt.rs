//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use pallet_core::error::{BuildError, PalletError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No weight sensor was provided to the controller.\nLikely causes: The HX711 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/pallet.toml for a sample."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PalletError>() {
        return match pe {
            PalletError::SensorNotReady => "What happened: The weight sensor did not report data.\nLikely causes: HX711 not wired correctly, no power/ground, or wrong DT/SCK pins.\nHow to fix: Verify [pins] and power, then rerun `pallet self-check`.".to_string(),
            PalletError::HardwareFault(m) | PalletError::Hardware(m) => format!(
                "What happened: Hardware error ({m}).\nLikely causes: Wiring, GPIO permissions or a failing converter.\nHow to fix: Check connections and permissions; re-run with --log-level=debug."
            ),
            PalletError::State(m) => format!(
                "What happened: {m}.\nLikely causes: Nothing was placed on the pallet, or an operation was used out of sequence.\nHow to fix: Follow the prompts and retry."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hx711") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    // Calibration CSV header special-case
    if format!("{err:#}")
        .to_ascii_lowercase()
        .contains("calibration csv must have headers")
    {
        return "Invalid headers in calibration CSV. Expected 'raw,units'.".to_string();
    }

    if lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid ({cause}).\nLikely causes: Out-of-range values or a typo in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("invalid scenario") {
        return format!(
            "What happened: {msg}.\nHow to fix: Each [[step]] needs at_ms plus load, tag or ready; steps must be in time order."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for sensor/hardware trouble, 1 otherwise (clap uses 2).
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use pallet_core::error::PalletError;
    match err.downcast_ref::<PalletError>() {
        Some(
            PalletError::SensorNotReady
            | PalletError::SensorOutOfRange { .. }
            | PalletError::Hardware(_)
            | PalletError::HardwareFault(_),
        ) => 3,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use pallet_core::error::PalletError;
    use serde_json::json;

    let reason = match err.downcast_ref::<PalletError>() {
        Some(PalletError::SensorNotReady) => "SensorNotReady",
        Some(PalletError::SensorOutOfRange { .. }) => "SensorOutOfRange",
        Some(PalletError::Hardware(_) | PalletError::HardwareFault(_)) => "Hardware",
        Some(PalletError::State(_)) => "State",
        Some(_) => "Pallet",
        None => "Error",
    };
    json!({
        "reason": reason,
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallet_core::PalletError;

    #[test]
    fn sensor_not_ready_exits_with_three() {
        let err = eyre::Report::new(PalletError::SensorNotReady);
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("did not report data"));
    }

    #[test]
    fn plain_errors_exit_with_one() {
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn json_error_has_reason() {
        let err = eyre::Report::new(PalletError::State("x".into()));
        let v: serde_json::Value =
            serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "State");
        assert_eq!(v["exit_code"], 1);
    }
}
