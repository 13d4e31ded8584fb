//! Type-state builder for `PalletController`.
//!
//! The builder enforces at compile time that a weight sensor is provided
//! before `build()` is available. `try_build()` is always available for
//! dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use pallet_traits::clock::{Clock, MonotonicClock};
use pallet_traits::{OpenDirectory, TagDirectory, TagReader, WeightSensor};

use crate::config::{Calibration, FilterCfg, InventoryCfg, SensorCfg, TapCfg, TimingCfg};
use crate::controller::PalletController;
use crate::error::{BuildError, Result};
use crate::estimator::{InventoryEstimator, Transition};
use crate::events::{EventSink, LogSink};
use crate::filter::MovingAverage;
use crate::tap::TapSequencer;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `PalletController`. All fields are validated on `build()`.
pub struct PalletControllerBuilder<S> {
    sensor: Option<Box<dyn WeightSensor>>,
    reader: Option<Box<dyn TagReader>>,
    directory: Option<Box<dyn TagDirectory>>,
    sink: Option<Box<dyn EventSink>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    filter: Option<FilterCfg>,
    inventory: Option<InventoryCfg>,
    tap: Option<TapCfg>,
    timing: Option<TimingCfg>,
    sensor_cfg: Option<SensorCfg>,
    calibration: Option<Calibration>,
    _s: PhantomData<S>,
}

impl Default for PalletControllerBuilder<Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            reader: None,
            directory: None,
            sink: None,
            clock: None,
            filter: None,
            inventory: None,
            tap: None,
            timing: None,
            sensor_cfg: None,
            calibration: None,
            _s: PhantomData,
        }
    }
}

struct Parts {
    sensor: Box<dyn WeightSensor>,
    reader: Option<Box<dyn TagReader>>,
    directory: Box<dyn TagDirectory>,
    sink: Box<dyn EventSink>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    filter: FilterCfg,
    inventory: InventoryCfg,
    tap: TapCfg,
    timing: TimingCfg,
    sensor_cfg: SensorCfg,
    calibration: Calibration,
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and construct the controller.
///
/// Single source of truth for validation, used by both `build()` and
/// `try_build()`.
fn validate_and_build(p: Parts) -> Result<PalletController> {
    // ── Validation ───────────────────────────────────────────────────────────
    if p.filter.samples == 0 {
        return Err(invalid("filter samples must be >= 1"));
    }
    if !(p.filter.stability_threshold.is_finite() && p.filter.stability_threshold > 0.0) {
        return Err(invalid("stability threshold must be > 0"));
    }
    if !(p.inventory.unit_weight.is_finite() && p.inventory.unit_weight > 0.0) {
        return Err(invalid("unit weight must be > 0"));
    }
    if !p.inventory.min_weight.is_finite() || p.inventory.min_weight < 0.0 {
        return Err(invalid("min weight must be >= 0"));
    }
    if !(p.inventory.max_weight.is_finite() && p.inventory.max_weight > p.inventory.min_weight) {
        return Err(invalid("max weight must exceed min weight"));
    }
    if p.tap.double_tap_window_ms == 0 {
        return Err(invalid("double-tap window must be >= 1 ms"));
    }
    if p.tap.debounce_ms >= p.tap.double_tap_window_ms {
        return Err(invalid("debounce must be shorter than the double-tap window"));
    }
    if p.tap.ready_timeout_ms <= p.tap.double_tap_window_ms {
        return Err(invalid("ready timeout must exceed the double-tap window"));
    }
    if p.timing.sample_ms == 0 || p.timing.tag_poll_ms == 0 {
        return Err(invalid("timer intervals must be >= 1 ms"));
    }
    if p.sensor_cfg.max_consecutive_failures == 0 {
        return Err(invalid("max consecutive failures must be >= 1"));
    }
    if p.sensor_cfg.raw_limit <= 0 {
        return Err(invalid("raw limit must be > 0"));
    }
    if !(p.calibration.scale_factor.is_finite() && p.calibration.scale_factor != 0.0) {
        return Err(invalid("scale factor must be finite and non-zero"));
    }

    // ── Construct ────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match p.clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let mut sensor = p.sensor;
    sensor.set_scale(p.calibration.scale_factor);
    sensor.set_offset(p.calibration.offset);

    tracing::debug!(
        samples = p.filter.samples,
        unit_weight = p.inventory.unit_weight,
        scale_factor = p.calibration.scale_factor,
        offset = p.calibration.offset,
        tag_reader = p.reader.is_some(),
        "controller built"
    );

    Ok(PalletController {
        sensor,
        reader: p.reader,
        directory: p.directory,
        sink: p.sink,
        clock,
        epoch,
        filter: MovingAverage::new(p.filter.samples, p.filter.stability_threshold),
        estimator: InventoryEstimator::new(p.inventory),
        taps: TapSequencer::new(p.tap),
        timing: p.timing,
        sensor_cfg: p.sensor_cfg,
        calibration: p.calibration,
        last_sample_ms: None,
        last_tag_poll_ms: None,
        failures: 0,
        fault_latched: false,
        calibrating: false,
        sampled: false,
        last_transition: Transition::Measuring,
    })
}

impl<S> PalletControllerBuilder<S> {
    /// Fallible build available in any type-state; returns a detailed error for missing pieces.
    pub fn try_build(self) -> Result<PalletController> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        validate_and_build(Parts {
            sensor,
            reader: self.reader,
            directory: self.directory.unwrap_or_else(|| Box::new(OpenDirectory)),
            sink: self.sink.unwrap_or_else(|| Box::new(LogSink)),
            clock: self.clock,
            filter: self.filter.unwrap_or_default(),
            inventory: self.inventory.unwrap_or_default(),
            tap: self.tap.unwrap_or_default(),
            timing: self.timing.unwrap_or_default(),
            sensor_cfg: self.sensor_cfg.unwrap_or_default(),
            calibration: self.calibration.unwrap_or_default(),
        })
    }
}

/// Chainable setters that do not affect type-state.
impl<S> PalletControllerBuilder<S> {
    pub fn with_tag_reader(mut self, reader: impl TagReader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }
    /// Defaults to `OpenDirectory` (every tag accepted).
    pub fn with_directory(mut self, directory: impl TagDirectory + 'static) -> Self {
        self.directory = Some(Box::new(directory));
        self
    }
    /// Defaults to `LogSink`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = Some(filter);
        self
    }
    pub fn with_inventory(mut self, inventory: InventoryCfg) -> Self {
        self.inventory = Some(inventory);
        self
    }
    pub fn with_tap(mut self, tap: TapCfg) -> Self {
        self.tap = Some(tap);
        self
    }
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_sensor_cfg(mut self, sensor_cfg: SensorCfg) -> Self {
        self.sensor_cfg = Some(sensor_cfg);
        self
    }
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }
    /// Apply every section of a loaded configuration file.
    ///
    /// The tag directory is the `[[tags]]` list unless `tap.allow_unknown`
    /// is set, in which case every tag is accepted.
    pub fn with_config(self, cfg: &pallet_config::Config) -> Self {
        let b = self
            .with_filter((&cfg.filter).into())
            .with_inventory((&cfg.inventory).into())
            .with_tap((&cfg.tap).into())
            .with_timing((&cfg.timing).into())
            .with_sensor_cfg((&cfg.sensor).into())
            .with_calibration((&cfg.calibration).into());
        if cfg.tap.allow_unknown {
            b.with_directory(OpenDirectory)
        } else {
            b.with_directory(cfg.known_tags())
        }
    }
}

// Setters that advance type-state
impl PalletControllerBuilder<Missing> {
    pub fn with_sensor(self, sensor: impl WeightSensor + 'static) -> PalletControllerBuilder<Set> {
        PalletControllerBuilder {
            sensor: Some(Box::new(sensor)),
            reader: self.reader,
            directory: self.directory,
            sink: self.sink,
            clock: self.clock,
            filter: self.filter,
            inventory: self.inventory,
            tap: self.tap,
            timing: self.timing,
            sensor_cfg: self.sensor_cfg,
            calibration: self.calibration,
            _s: PhantomData,
        }
    }
}

impl PalletControllerBuilder<Set> {
    /// Build with all required collaborators present.
    pub fn build(self) -> Result<PalletController> {
        self.try_build()
    }
}
