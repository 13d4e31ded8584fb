//! Session controller: owns the filter, estimator and tap sequencer and
//! drives them from the sensor and tag reader on independent interval timers.
//!
//! Single-threaded and tick-driven. Call [`PalletController::step`] as often
//! as convenient; each call runs whichever timers are due and returns the
//! event records produced (they have already been handed to the sink).
use std::sync::Arc;
use std::time::{Duration, Instant};

use pallet_traits::{Clock, TagDirectory, TagReader, WeightSensor, normalize_tag_id};

use crate::config::{Calibration, SensorCfg, TimingCfg};
use crate::error::{PalletError, Result};
use crate::estimator::{InventoryEstimator, Transition};
use crate::events::{EventKind, EventRecord, EventSink};
use crate::filter::MovingAverage;
use crate::hw_error::map_hw_error;
use crate::status::{Snapshot, SystemStatus};
use crate::tap::{Expiry, TapOutcome, TapSequencer, TapState};
use crate::util::is_due;

pub struct PalletController {
    pub(crate) sensor: Box<dyn WeightSensor>,
    pub(crate) reader: Option<Box<dyn TagReader>>,
    pub(crate) directory: Box<dyn TagDirectory>,
    pub(crate) sink: Box<dyn EventSink>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,

    pub(crate) filter: MovingAverage,
    pub(crate) estimator: InventoryEstimator,
    pub(crate) taps: TapSequencer,
    pub(crate) timing: TimingCfg,
    pub(crate) sensor_cfg: SensorCfg,
    pub(crate) calibration: Calibration,

    pub(crate) last_sample_ms: Option<u64>,
    pub(crate) last_tag_poll_ms: Option<u64>,
    pub(crate) failures: u32,
    pub(crate) fault_latched: bool,
    pub(crate) calibrating: bool,
    pub(crate) sampled: bool,
    pub(crate) last_transition: Transition,
}

impl core::fmt::Debug for PalletController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.estimator.state();
        f.debug_struct("PalletController")
            .field("weight", &st.filtered_weight)
            .field("unit_count", &st.unit_count)
            .field("tap_state", &self.taps.state())
            .field("failures", &self.failures)
            .field("calibrating", &self.calibrating)
            .finish_non_exhaustive()
    }
}

impl PalletController {
    /// Start building a controller.
    pub fn builder() -> crate::builder::PalletControllerBuilder<crate::builder::Missing> {
        crate::builder::PalletControllerBuilder::default()
    }

    /// Milliseconds since the controller was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// One pass of the control loop.
    ///
    /// Runs the tap timeouts, then the tag poll and the weight sample when
    /// their timers are due. While calibrating, polling and sampling are
    /// suspended. Sensor and reader failures never surface as `Err`.
    pub fn step(&mut self) -> Result<Vec<EventRecord>> {
        let now = self.now_ms();
        let mut events = Vec::new();

        self.expire_taps(now, &mut events);

        if !self.calibrating {
            if is_due(self.last_tag_poll_ms, now, self.timing.tag_poll_ms) {
                self.last_tag_poll_ms = Some(now);
                self.poll_tags(now, &mut events);
            }
            if is_due(self.last_sample_ms, now, self.timing.sample_ms) {
                self.last_sample_ms = Some(now);
                self.sample(now, &mut events);
            }
        }

        self.publish(&events);
        Ok(events)
    }

    /// Take a weight sample now regardless of the sample timer.
    pub fn sample_now(&mut self) -> Result<Vec<EventRecord>> {
        self.ensure_not_calibrating("sample")?;
        let now = self.now_ms();
        self.last_sample_ms = Some(now);
        let mut events = Vec::new();
        self.sample(now, &mut events);
        self.publish(&events);
        Ok(events)
    }

    /// Feed a raw reading obtained elsewhere (e.g. a sampler thread).
    pub fn ingest_raw(&mut self, raw: i64) -> Result<Vec<EventRecord>> {
        self.ensure_not_calibrating("ingest")?;
        let now = self.now_ms();
        let mut events = Vec::new();
        self.ingest_at(raw, now, &mut events);
        self.publish(&events);
        Ok(events)
    }

    /// Feed a tag read obtained elsewhere, as if the reader had returned it.
    pub fn handle_tag(&mut self, tag_id: &str) -> Result<Vec<EventRecord>> {
        self.ensure_not_calibrating("handle tag")?;
        let now = self.now_ms();
        let mut events = Vec::new();
        self.expire_taps(now, &mut events);
        self.tag_at(tag_id, now, &mut events);
        self.publish(&events);
        Ok(events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let st = self.estimator.state();
        let session = self.taps.session();
        let status = if self.calibrating {
            SystemStatus::Calibrating
        } else if self.fault_latched {
            SystemStatus::HardwareError
        } else if !self.sampled {
            SystemStatus::Initializing
        } else if !st.stable {
            SystemStatus::Measuring
        } else if st.unit_count == 0 && st.filtered_weight <= 0.0 {
            SystemStatus::Empty
        } else {
            SystemStatus::Ready
        };
        Snapshot {
            weight: st.filtered_weight,
            unit_count: st.unit_count,
            stable: st.stable,
            transition: self.last_transition,
            status,
            tap_state: session.state,
            tag: session.tag.clone(),
            entity: session.entity.clone(),
            sensor_fault: self.fault_latched,
            calibrating: self.calibrating,
            timestamp_ms: self.now_ms(),
        }
    }

    pub fn tap_state(&self) -> TapState {
        self.taps.state()
    }

    pub fn unit_count(&self) -> u32 {
        self.estimator.state().unit_count
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    // ── Calibration sequence ────────────────────────────────────────────────

    /// Suspend sampling and tag polling until [`end_calibration`](Self::end_calibration).
    pub fn begin_calibration(&mut self) -> Result<()> {
        if self.calibrating {
            return Err(eyre::Report::new(PalletError::State(
                "calibration already in progress".into(),
            )));
        }
        self.calibrating = true;
        tracing::info!("calibration started; sampling suspended");
        Ok(())
    }

    /// Resume normal operation. The filter restarts from a zeroed window.
    pub fn end_calibration(&mut self) {
        if !self.calibrating {
            return;
        }
        self.calibrating = false;
        self.filter.reset();
        self.failures = 0;
        self.last_sample_ms = None;
        self.last_tag_poll_ms = None;
        tracing::info!(
            scale_factor = self.calibration.scale_factor,
            offset = self.calibration.offset,
            "calibration finished; sampling resumed"
        );
    }

    /// Scoped calibration: the sequence ends when the guard is dropped.
    pub fn calibration_session(&mut self) -> Result<CalibrationSession<'_>> {
        self.begin_calibration()?;
        Ok(CalibrationSession { ctrl: self })
    }

    /// Zero the baseline with nothing on the pallet. Returns the new offset.
    pub fn tare(&mut self) -> Result<i64> {
        self.ensure_calibrating("tare")?;
        if !self.sensor.is_ready() {
            return Err(eyre::Report::new(PalletError::SensorNotReady));
        }
        let offset = self
            .sensor
            .tare(self.sensor_cfg.tare_samples)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        self.calibration.offset = offset;
        self.sensor.set_offset(offset);
        tracing::info!(offset, "tared");
        Ok(offset)
    }

    /// With `known_weight` units on a tared pallet, derive the scale factor.
    pub fn calibrate_known(&mut self, known_weight: f32) -> Result<Calibration> {
        self.ensure_calibrating("calibrate")?;
        if !(known_weight.is_finite() && known_weight > 0.0) {
            return Err(eyre::Report::new(PalletError::Config(
                "known weight must be > 0".into(),
            )));
        }
        if !self.sensor.is_ready() {
            return Err(eyre::Report::new(PalletError::SensorNotReady));
        }
        let raw = self
            .sensor
            .read_raw(self.sensor_cfg.calibration_samples)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        let factor = raw.saturating_sub(self.calibration.offset) as f32 / known_weight;
        if !factor.is_finite() || factor == 0.0 {
            return Err(eyre::Report::new(PalletError::State(
                "no load detected; place the reference weight and retry".into(),
            )));
        }
        self.calibration.scale_factor = factor;
        self.sensor.set_scale(factor);
        tracing::info!(raw, known_weight, scale_factor = factor, "scale calibrated");
        Ok(self.calibration)
    }

    /// Replace the calibration constants and push them to the sensor.
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<()> {
        if !(calibration.scale_factor.is_finite() && calibration.scale_factor != 0.0) {
            return Err(eyre::Report::new(PalletError::Config(
                "scale_factor must be finite and non-zero".into(),
            )));
        }
        self.calibration = calibration;
        self.sensor.set_scale(calibration.scale_factor);
        self.sensor.set_offset(calibration.offset);
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn ensure_calibrating(&self, what: &str) -> Result<()> {
        if self.calibrating {
            Ok(())
        } else {
            Err(eyre::Report::new(PalletError::State(format!(
                "{what} is only allowed during calibration"
            ))))
        }
    }

    fn ensure_not_calibrating(&self, what: &str) -> Result<()> {
        if self.calibrating {
            Err(eyre::Report::new(PalletError::State(format!(
                "cannot {what} during calibration"
            ))))
        } else {
            Ok(())
        }
    }

    fn publish(&mut self, events: &[EventRecord]) {
        for e in events {
            self.sink.notify(e);
        }
    }

    fn record(&self, kind: EventKind, delta: i32, now: u64) -> EventRecord {
        let st = self.estimator.state();
        EventRecord {
            kind,
            delta,
            total_count: st.unit_count,
            weight: st.filtered_weight,
            tag: None,
            entity: None,
            timestamp_ms: now,
        }
    }

    fn sample(&mut self, now: u64, events: &mut Vec<EventRecord>) {
        if !self.sensor.is_ready() {
            tracing::warn!(failures = self.failures + 1, "weight sensor not ready; tick skipped");
            self.sensor_failed(now, events);
            return;
        }
        match self.sensor.read_raw(self.sensor_cfg.read_samples) {
            Ok(raw) => self.ingest_at(raw, now, events),
            Err(e) => {
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, "weight sensor read failed; tick skipped");
                self.sensor_failed(now, events);
            }
        }
    }

    fn sensor_failed(&mut self, now: u64, events: &mut Vec<EventRecord>) {
        self.failures = self.failures.saturating_add(1);
        if !self.fault_latched && self.failures >= self.sensor_cfg.max_consecutive_failures {
            self.fault_latched = true;
            tracing::error!(failures = self.failures, "persistent weight sensor fault");
            events.push(self.record(EventKind::SensorFault, 0, now));
        }
    }

    fn ingest_at(&mut self, raw: i64, now: u64, events: &mut Vec<EventRecord>) {
        if raw.saturating_abs() >= self.sensor_cfg.raw_limit {
            let err = PalletError::SensorOutOfRange { raw };
            tracing::warn!(error = %err, "reading discarded");
            self.sensor_failed(now, events);
            return;
        }
        self.failures = 0;
        if self.fault_latched {
            self.fault_latched = false;
            tracing::info!("weight sensor recovered");
            events.push(self.record(EventKind::SensorRecovered, 0, now));
        }

        let units = self.calibration.to_units(raw);
        let units = if units.is_finite() { units.max(0.0) } else { 0.0 };
        let filtered = self.filter.ingest(units);
        let update = self.estimator.update(filtered.mean, filtered.is_stable);
        let est = update.estimate;
        self.sampled = true;
        self.last_transition = est.transition;
        tracing::trace!(
            raw,
            units,
            mean = filtered.mean,
            stable = filtered.is_stable,
            count = est.count,
            "sample"
        );

        if update.overload_started {
            let err = PalletError::Overload {
                weight: filtered.mean,
            };
            tracing::warn!(error = %err, max = self.estimator.cfg().max_weight, "clamping");
            events.push(self.record(EventKind::Overload, 0, now));
        }
        match est.transition {
            Transition::Added(_) | Transition::Removed(_) => {
                let kind = if matches!(est.transition, Transition::Added(_)) {
                    EventKind::Added
                } else {
                    EventKind::Removed
                };
                tracing::debug!(kind = kind.as_str(), delta = est.transition.delta(), total = est.count, "count changed");
                events.push(self.record(kind, est.transition.delta(), now));
            }
            Transition::Stable | Transition::Measuring => {}
        }
    }

    fn poll_tags(&mut self, now: u64, events: &mut Vec<EventRecord>) {
        let timeout = Duration::from_millis(self.timing.tag_timeout_ms);
        let Some(reader) = self.reader.as_mut() else {
            return;
        };
        match reader.poll(timeout) {
            Ok(Some(id)) => self.tag_at(&id, now, events),
            Ok(None) => {}
            Err(e) => {
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, "tag reader poll failed");
            }
        }
    }

    fn tag_at(&mut self, raw_id: &str, now: u64, events: &mut Vec<EventRecord>) {
        let id = normalize_tag_id(raw_id);
        if id.is_empty() {
            return;
        }
        if !self.taps.accept_read(&id, now) {
            tracing::trace!(tag = %id, "tag read debounced");
            return;
        }
        let Some(entity) = self.directory.lookup(&id) else {
            let err = PalletError::UnknownTag(id.clone());
            tracing::warn!(error = %err, "tag ignored");
            let mut rec = self.record(EventKind::UnknownTag, 0, now);
            rec.tag = Some(id);
            events.push(rec);
            return;
        };

        let count = self.estimator.state().unit_count;
        let (kind, delta) = match self.taps.on_tap(&id, &entity, now, count) {
            TapOutcome::LoadStarted => {
                tracing::info!(tag = %id, entity = %entity, start = count, "load session opened");
                (EventKind::LoadStarted, 0)
            }
            TapOutcome::UnloadStarted { double_tap } => {
                tracing::info!(tag = %id, entity = %entity, start = count, double_tap, "unload session opened");
                (EventKind::UnloadStarted, 0)
            }
            TapOutcome::LoadComplete { delta } => {
                tracing::info!(tag = %id, entity = %entity, delta, total = count, "load complete");
                (EventKind::LoadComplete, delta)
            }
            TapOutcome::UnloadComplete { delta } => {
                tracing::info!(tag = %id, entity = %entity, delta, total = count, "unload complete");
                (EventKind::UnloadComplete, delta)
            }
            TapOutcome::Cancelled { pending, entity } => {
                let err = PalletError::MismatchedTapTag {
                    pending: pending.clone(),
                    offending: id.clone(),
                };
                tracing::warn!(error = %err, "pending session discarded");
                let mut rec = self.record(EventKind::TransactionCancelled, 0, now);
                rec.tag = Some(pending);
                rec.entity = entity;
                events.push(rec);
                return;
            }
            TapOutcome::Ignored => {
                tracing::debug!(tag = %id, "tap during completion dwell ignored");
                return;
            }
        };
        let mut rec = self.record(kind, delta, now);
        rec.tag = Some(id);
        rec.entity = Some(entity);
        events.push(rec);
    }

    fn expire_taps(&mut self, now: u64, events: &mut Vec<EventRecord>) {
        match self.taps.tick(now) {
            Some(Expiry::DwellElapsed) => tracing::debug!("completion dwell elapsed"),
            Some(Expiry::ReadyExpired { state, tag, entity }) => {
                tracing::warn!(tag = %tag, state = state.as_str(), "pending session expired");
                let mut rec = self.record(EventKind::TransactionExpired, 0, now);
                rec.tag = Some(tag);
                rec.entity = entity;
                events.push(rec);
            }
            None => {}
        }
    }
}

/// Calibration sequence guard; normal operation resumes on drop.
pub struct CalibrationSession<'a> {
    ctrl: &'a mut PalletController,
}

impl CalibrationSession<'_> {
    pub fn tare(&mut self) -> Result<i64> {
        self.ctrl.tare()
    }

    pub fn calibrate_known(&mut self, known_weight: f32) -> Result<Calibration> {
        self.ctrl.calibrate_known(known_weight)
    }

    /// Read the sensor through the current calibration, bypassing the filter.
    pub fn read_units(&mut self) -> Result<f32> {
        let raw = self
            .ctrl
            .sensor
            .read_raw(self.ctrl.sensor_cfg.calibration_samples)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
        Ok(self.ctrl.calibration.to_units(raw))
    }
}

impl Drop for CalibrationSession<'_> {
    fn drop(&mut self) {
        self.ctrl.end_calibration();
    }
}
