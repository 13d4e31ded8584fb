//! Maps `Box<dyn Error>` from trait boundaries to typed `PalletError`.
//!
//! The traits in `pallet_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `pallet_hardware::HwError`.

use crate::error::PalletError;

/// Map a trait-boundary error to a typed `PalletError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PalletError {
    #[cfg(feature = "hardware-errors")]
    {
        use pallet_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::NotReady | HwError::Timeout | HwError::DataReadyTimeout => {
                    PalletError::SensorNotReady
                }
                HwError::Disconnected => PalletError::Hardware(hw.to_string()),
                other => PalletError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(p) = e.downcast_ref::<PalletError>() {
        return p.clone();
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("not ready") {
        PalletError::SensorNotReady
    } else {
        PalletError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_timeouts() {
        let e = std::io::Error::other("read timeout on bus");
        assert_eq!(map_hw_error(&e), PalletError::SensorNotReady);
    }

    #[test]
    fn unknown_errors_keep_their_message() {
        let e = std::io::Error::other("bus stuck");
        assert_eq!(map_hw_error(&e), PalletError::Hardware("bus stuck".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_not_ready_maps_to_sensor_not_ready() {
        let e = pallet_hardware::error::HwError::NotReady;
        assert_eq!(map_hw_error(&e), PalletError::SensorNotReady);
    }
}
