//! `From` implementations bridging `pallet_config` types to `pallet_core` types.

use crate::config::{Calibration, FilterCfg, InventoryCfg, SensorCfg, TapCfg, TimingCfg};

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<&pallet_config::FilterCfg> for FilterCfg {
    fn from(c: &pallet_config::FilterCfg) -> Self {
        Self {
            samples: c.samples,
            stability_threshold: c.stability_threshold,
        }
    }
}

// ── InventoryCfg ─────────────────────────────────────────────────────────────

impl From<&pallet_config::InventoryCfg> for InventoryCfg {
    fn from(c: &pallet_config::InventoryCfg) -> Self {
        Self {
            unit_weight: c.unit_weight,
            min_weight: c.min_weight,
            max_weight: c.max_weight,
        }
    }
}

// ── TapCfg ───────────────────────────────────────────────────────────────────

impl From<&pallet_config::TapCfg> for TapCfg {
    fn from(c: &pallet_config::TapCfg) -> Self {
        Self {
            double_tap_window_ms: c.double_tap_window_ms,
            debounce_ms: c.debounce_ms,
            completion_dwell_ms: c.completion_dwell_ms,
            ready_timeout_ms: c.ready_timeout_ms,
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&pallet_config::TimingCfg> for TimingCfg {
    fn from(c: &pallet_config::TimingCfg) -> Self {
        Self {
            sample_ms: c.sample_ms,
            tag_poll_ms: c.tag_poll_ms,
            tag_timeout_ms: c.tag_timeout_ms,
            publish_ms: c.publish_ms,
        }
    }
}

// ── SensorCfg ────────────────────────────────────────────────────────────────

impl From<&pallet_config::SensorCfg> for SensorCfg {
    fn from(c: &pallet_config::SensorCfg) -> Self {
        Self {
            read_samples: c.read_samples,
            tare_samples: c.tare_samples,
            calibration_samples: c.calibration_samples,
            max_consecutive_failures: c.max_consecutive_failures,
            raw_limit: c.raw_limit,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&pallet_config::Calibration> for Calibration {
    fn from(c: &pallet_config::Calibration) -> Self {
        Self {
            scale_factor: c.scale_factor,
            offset: c.offset,
        }
    }
}

impl From<Calibration> for pallet_config::Calibration {
    fn from(c: Calibration) -> Self {
        Self {
            scale_factor: c.scale_factor,
            offset: c.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_agree_with_config_crate() {
        let cfg = pallet_config::Config::default();
        let f = FilterCfg::from(&cfg.filter);
        let d = FilterCfg::default();
        assert_eq!(f.samples, d.samples);
        assert!((f.stability_threshold - d.stability_threshold).abs() < f32::EPSILON);
        let t = TapCfg::from(&cfg.tap);
        assert_eq!(t.double_tap_window_ms, TapCfg::default().double_tap_window_ms);
        assert_eq!(t.ready_timeout_ms, TapCfg::default().ready_timeout_ms);
        let s = SensorCfg::from(&cfg.sensor);
        assert_eq!(s.raw_limit, SensorCfg::default().raw_limit);
    }

    #[test]
    fn calibration_round_trips_between_crates() {
        let core = Calibration {
            scale_factor: 21_500.0,
            offset: 8_300,
        };
        let cfg: pallet_config::Calibration = core.into();
        assert_eq!(Calibration::from(&cfg), core);
    }
}
