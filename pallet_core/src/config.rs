//! Runtime configuration types for the inventory core.
//!
//! These are the structs the controller runs on. They are separate from the
//! TOML-deserialized config in `pallet_config`; see `conversions`.

/// Moving-average filter and stability detection.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Number of samples in the moving-average window.
    pub samples: usize,
    /// A window is stable when no sample deviates from the mean by this much.
    pub stability_threshold: f32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            samples: 10,
            stability_threshold: 0.05,
        }
    }
}

/// Weight-to-count policy.
#[derive(Debug, Clone)]
pub struct InventoryCfg {
    /// Mass of one countable item.
    pub unit_weight: f32,
    /// Readings at or below this report an empty pallet.
    pub min_weight: f32,
    /// Rated capacity; readings above are clamped.
    pub max_weight: f32,
}

impl Default for InventoryCfg {
    fn default() -> Self {
        Self {
            unit_weight: 0.65,
            min_weight: 0.1,
            max_weight: 20.0,
        }
    }
}

/// Tag tap protocol timings.
#[derive(Debug, Clone)]
pub struct TapCfg {
    /// Two taps closer than this mean "unload".
    pub double_tap_window_ms: u64,
    /// Repeated reads of one tag closer than this are a single tap.
    pub debounce_ms: u64,
    /// How long a completed transaction stays on display.
    pub completion_dwell_ms: u64,
    /// A pending session with no closing tap is discarded after this.
    pub ready_timeout_ms: u64,
}

impl Default for TapCfg {
    fn default() -> Self {
        Self {
            double_tap_window_ms: 3000,
            debounce_ms: 500,
            completion_dwell_ms: 3000,
            ready_timeout_ms: 300_000,
        }
    }
}

/// Independent interval timers of the control loop.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    pub sample_ms: u64,
    pub tag_poll_ms: u64,
    pub tag_timeout_ms: u64,
    pub publish_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            sample_ms: 100,
            tag_poll_ms: 50,
            tag_timeout_ms: 50,
            publish_ms: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SensorCfg {
    pub read_samples: u8,
    pub tare_samples: u8,
    pub calibration_samples: u8,
    /// Consecutive failed ticks before a sensor fault is latched.
    pub max_consecutive_failures: u32,
    /// |raw| at or beyond this is discarded as implausible.
    pub raw_limit: i64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            read_samples: 1,
            tare_samples: 10,
            calibration_samples: 15,
            max_consecutive_failures: 5,
            raw_limit: 8_388_607,
        }
    }
}

/// Raw counts to weight units: `units = (raw - offset) / scale_factor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw counts per weight unit.
    pub scale_factor: f32,
    /// Tare baseline in raw counts.
    pub offset: i64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            offset: 0,
        }
    }
}

impl Calibration {
    #[inline]
    pub fn to_units(&self, raw: i64) -> f32 {
        (raw.saturating_sub(self.offset) as f64 / f64::from(self.scale_factor)) as f32
    }
}
