#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, tag directory and calibration parsing for the pallet.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section has defaults matching the deployed firmware, so an empty
//!   file is a valid configuration.
//! - `[[tags]]` entries form the known-tag directory (`KnownTags`).
//! - Calibration CSV loader fits raw counts against reference weights.
//! - Scenario files script a deterministic simulation run.
pub mod calibration;
pub mod scenario;
pub mod tags;

pub use calibration::{Calibration, CalibrationRow, load_calibration_csv};
pub use scenario::{Scenario, ScenarioStep, load_scenario};
pub use tags::{KnownTags, TagEntry};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// 25 = channel A gain 128, 26 = channel B gain 32, 27 = channel A gain 64
    pub hx711_gain_pulses: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            hx711_dt: 5,
            hx711_sck: 18,
            hx711_gain_pulses: 25,
        }
    }
}

/// One load cell of a multi-cell pallet.
#[derive(Debug, Deserialize, Clone)]
pub struct CellCfg {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    #[serde(default = "default_gain_pulses")]
    pub hx711_gain_pulses: u8,
    /// Raw counts per weight unit for this cell.
    #[serde(default = "default_cell_scale")]
    pub scale_factor: f32,
    /// Unloaded raw reading of this cell.
    #[serde(default)]
    pub offset: i64,
}

fn default_gain_pulses() -> u8 {
    25
}

fn default_cell_scale() -> f32 {
    1.0
}

impl CellCfg {
    pub fn calibration(&self) -> Calibration {
        Calibration {
            scale_factor: self.scale_factor,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Moving-average window (samples).
    pub samples: usize,
    /// Max deviation from the mean, in weight units, for a reading to count as settled.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InventoryCfg {
    /// Weight of one countable item (one bottle).
    pub unit_weight: f32,
    /// At or below this the pallet is reported empty.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TapCfg {
    pub double_tap_window_ms: u64,
    pub debounce_ms: u64,
    pub completion_dwell_ms: u64,
    /// A pending load/unload with no closing tap is discarded after this long.
    pub ready_timeout_ms: u64,
    /// Accept tags that are not listed under `[[tags]]`.
    pub allow_unknown: bool,
}

impl Default for TapCfg {
    fn default() -> Self {
        Self {
            double_tap_window_ms: 3000,
            debounce_ms: 500,
            completion_dwell_ms: 3000,
            ready_timeout_ms: 300_000,
            allow_unknown: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    pub sample_ms: u64,
    pub tag_poll_ms: u64,
    /// Upper bound for a single tag poll.
    pub tag_timeout_ms: u64,
    /// Telemetry snapshot cadence.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    pub read_samples: u8,
    pub tare_samples: u8,
    pub calibration_samples: u8,
    /// Consecutive failed ticks before the sensor is reported faulty.
    pub max_consecutive_failures: u32,
    /// Readings with |raw| at or beyond this are implausible (HX711 rails).
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub inventory: InventoryCfg,
    #[serde(default)]
    pub tap: TapCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub sensor: SensorCfg,
    /// Persisted calibration constants; a calibration CSV given on the
    /// command line takes precedence.
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub tags: Vec<TagEntry>,
    /// Per-cell wiring and constants; when present these replace `[pins]`
    /// and the cell weights are summed.
    #[serde(default)]
    pub cells: Vec<CellCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Known-tag directory built from `[[tags]]`.
    pub fn known_tags(&self) -> KnownTags {
        KnownTags::from_entries(&self.tags)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if !(25..=27).contains(&self.pins.hx711_gain_pulses) {
            eyre::bail!("pins.hx711_gain_pulses must be 25, 26 or 27");
        }
        if self.pins.hx711_dt == self.pins.hx711_sck {
            eyre::bail!("pins.hx711_dt and pins.hx711_sck must differ");
        }

        // Filter
        if self.filter.samples == 0 {
            eyre::bail!("filter.samples must be >= 1");
        }
        if self.filter.samples > 1000 {
            eyre::bail!("filter.samples is unreasonably large (>1000)");
        }
        if !(self.filter.stability_threshold.is_finite() && self.filter.stability_threshold > 0.0)
        {
            eyre::bail!("filter.stability_threshold must be > 0");
        }

        // Inventory
        let inv = &self.inventory;
        if !(inv.unit_weight.is_finite() && inv.unit_weight > 0.0) {
            eyre::bail!("inventory.unit_weight must be > 0");
        }
        if !inv.min_weight.is_finite() || inv.min_weight.is_sign_negative() {
            eyre::bail!("inventory.min_weight must be >= 0");
        }
        if !(inv.max_weight.is_finite() && inv.max_weight > inv.min_weight) {
            eyre::bail!("inventory.max_weight must be > inventory.min_weight");
        }

        // Tap
        if self.tap.double_tap_window_ms == 0 {
            eyre::bail!("tap.double_tap_window_ms must be >= 1");
        }
        if self.tap.debounce_ms >= self.tap.double_tap_window_ms {
            eyre::bail!("tap.debounce_ms must be < tap.double_tap_window_ms");
        }
        if self.tap.completion_dwell_ms > 60_000 {
            eyre::bail!("tap.completion_dwell_ms is unreasonably large (>60s)");
        }
        if self.tap.ready_timeout_ms <= self.tap.double_tap_window_ms {
            eyre::bail!("tap.ready_timeout_ms must be > tap.double_tap_window_ms");
        }

        // Timing
        if self.timing.sample_ms == 0 {
            eyre::bail!("timing.sample_ms must be >= 1");
        }
        if self.timing.tag_poll_ms == 0 {
            eyre::bail!("timing.tag_poll_ms must be >= 1");
        }
        if self.timing.tag_timeout_ms == 0 || self.timing.tag_timeout_ms > 1000 {
            eyre::bail!("timing.tag_timeout_ms must be in [1, 1000]");
        }
        if self.timing.publish_ms == 0 {
            eyre::bail!("timing.publish_ms must be >= 1");
        }

        // Sensor
        if self.sensor.read_samples == 0
            || self.sensor.tare_samples == 0
            || self.sensor.calibration_samples == 0
        {
            eyre::bail!("sensor.*_samples must be >= 1");
        }
        if self.sensor.max_consecutive_failures == 0 {
            eyre::bail!("sensor.max_consecutive_failures must be >= 1");
        }
        if self.sensor.raw_limit <= 0 {
            eyre::bail!("sensor.raw_limit must be > 0");
        }

        // Calibration
        if !(self.calibration.scale_factor.is_finite() && self.calibration.scale_factor != 0.0) {
            eyre::bail!("calibration.scale_factor must be finite and non-zero");
        }

        // Cells
        let mut pins_in_use = std::collections::HashSet::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            if !(25..=27).contains(&cell.hx711_gain_pulses) {
                eyre::bail!("cells[{idx}].hx711_gain_pulses must be 25, 26 or 27");
            }
            if cell.hx711_dt == cell.hx711_sck {
                eyre::bail!("cells[{idx}].hx711_dt and hx711_sck must differ");
            }
            if !pins_in_use.insert(cell.hx711_dt) || !pins_in_use.insert(cell.hx711_sck) {
                eyre::bail!("cells[{idx}] reuses a pin of another cell");
            }
            if !(cell.scale_factor.is_finite() && cell.scale_factor != 0.0) {
                eyre::bail!("cells[{idx}].scale_factor must be finite and non-zero");
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Tags
        tags::validate_entries(&self.tags)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_firmware_defaults() {
        let cfg = load_toml("").expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.filter.samples, 10);
        assert!((cfg.inventory.unit_weight - 0.65).abs() < f32::EPSILON);
        assert_eq!(cfg.tap.double_tap_window_ms, 3000);
        assert_eq!(cfg.tap.debounce_ms, 500);
        assert_eq!(cfg.timing.sample_ms, 100);
        assert!(cfg.tags.is_empty());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = load_toml("[inventory]\nunit_weight = 0.275\n").expect("parse");
        assert!((cfg.inventory.unit_weight - 0.275).abs() < f32::EPSILON);
        assert!((cfg.inventory.max_weight - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cells_parse_with_defaults() {
        let cfg = load_toml(
            "[[cells]]\nhx711_dt = 5\nhx711_sck = 18\nscale_factor = 21500.0\noffset = 8100\n\n\
             [[cells]]\nhx711_dt = 19\nhx711_sck = 21\n",
        )
        .expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.cells.len(), 2);
        assert_eq!(cfg.cells[1].hx711_gain_pulses, 25);
        assert_eq!(
            cfg.cells[0].calibration(),
            Calibration {
                scale_factor: 21_500.0,
                offset: 8_100
            }
        );
    }

    #[test]
    fn cells_sharing_a_pin_are_rejected() {
        let cfg = load_toml(
            "[[cells]]\nhx711_dt = 5\nhx711_sck = 18\n\n[[cells]]\nhx711_dt = 5\nhx711_sck = 21\n",
        )
        .expect("parse");
        let err = cfg.validate().expect_err("pin 5 twice");
        assert!(err.to_string().contains("cells[1]"));
    }

    #[test]
    fn cell_with_zero_scale_is_rejected() {
        let cfg = load_toml("[[cells]]\nhx711_dt = 5\nhx711_sck = 18\nscale_factor = 0.0\n")
            .expect("parse");
        let err = cfg.validate().expect_err("zero scale");
        assert!(err.to_string().contains("cells[0].scale_factor"));
    }

    #[test]
    fn unknown_rotation_is_rejected() {
        let cfg = load_toml("[logging]\nrotation = \"weekly\"\n").expect("parse");
        let err = cfg.validate().expect_err("weekly is not supported");
        assert!(err.to_string().contains("logging.rotation"));
    }
}
