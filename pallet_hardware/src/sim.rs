//! Simulated load cell and tag reader.
//!
//! Both expose a cloneable control handle so a test, a scenario replay or the
//! CLI can change the load and present tags while the controller owns the
//! device itself.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use pallet_traits::{BoxError, TagReader, WeightSensor};

use crate::error::HwError;

/// Raw counts per kilogram of the simulated cell; roughly a 20 kg bar at gain 128.
pub const DEFAULT_COUNTS_PER_UNIT: f32 = 22_000.0;
/// Raw reading of the unloaded simulated cell.
pub const DEFAULT_ZERO_COUNTS: i64 = 8_400;

#[derive(Debug)]
struct SimState {
    load: f32,
    ready: bool,
    fail_reads: u32,
    raw_override: Option<i64>,
    noise_counts: i64,
    rng: u64,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            load: 0.0,
            ready: true,
            fail_reads: 0,
            raw_override: None,
            noise_counts: 0,
            rng: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

impl SimState {
    // xorshift64*, deterministic per seed
    fn next_noise(&mut self) -> i64 {
        if self.noise_counts == 0 {
            return 0;
        }
        let mut x = self.rng;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng = x;
        let span = (self.noise_counts * 2 + 1) as u64;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) % span) as i64 - self.noise_counts
    }
}

/// Shared control surface of a [`SimulatedWeightSensor`].
#[derive(Debug, Clone, Default)]
pub struct SimHandle(Arc<Mutex<SimState>>);

impl SimHandle {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A poisoned lock only means a panicking test thread; the state is plain data.
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Weight currently resting on the cell, in weight units.
    pub fn set_load(&self, load: f32) {
        self.lock().load = load;
    }

    pub fn load(&self) -> f32 {
        self.lock().load
    }

    /// While not ready the converter reports no data.
    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    /// Make the next `n` reads fail with an I/O error.
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().fail_reads = n;
    }

    /// Report this raw value regardless of load (e.g. a rail-stuck converter).
    pub fn force_raw(&self, raw: Option<i64>) {
        self.lock().raw_override = raw;
    }
}

/// HX711 stand-in: `raw = zero_counts + load * counts_per_unit (+ noise)`.
#[derive(Debug)]
pub struct SimulatedWeightSensor {
    handle: SimHandle,
    counts_per_unit: f32,
    zero_counts: i64,
    scale: f32,
    offset: i64,
}

impl Default for SimulatedWeightSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedWeightSensor {
    pub fn new() -> Self {
        Self::with_cell(DEFAULT_COUNTS_PER_UNIT, DEFAULT_ZERO_COUNTS)
    }

    pub fn with_cell(counts_per_unit: f32, zero_counts: i64) -> Self {
        Self {
            handle: SimHandle::default(),
            counts_per_unit,
            zero_counts,
            scale: 1.0,
            offset: 0,
        }
    }

    /// Add uniform noise of ±`amplitude` raw counts, reproducible for a given seed.
    pub fn with_noise(self, amplitude: i64, seed: u64) -> Self {
        {
            let mut st = self.handle.lock();
            st.noise_counts = amplitude.max(0);
            st.rng = seed.max(1);
        }
        self
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    pub fn counts_per_unit(&self) -> f32 {
        self.counts_per_unit
    }

    pub fn zero_counts(&self) -> i64 {
        self.zero_counts
    }

    /// Last values pushed by the controller.
    pub fn calibration(&self) -> (f32, i64) {
        (self.scale, self.offset)
    }

    fn read_once(&self) -> Result<i64, HwError> {
        let mut st = self.handle.lock();
        if !st.ready {
            return Err(HwError::NotReady);
        }
        if st.fail_reads > 0 {
            st.fail_reads -= 1;
            return Err(HwError::Io(std::io::Error::other("simulated read failure")));
        }
        if let Some(raw) = st.raw_override {
            return Ok(raw);
        }
        let base = self.zero_counts + (f64::from(st.load) * f64::from(self.counts_per_unit)).round() as i64;
        Ok(base + st.next_noise())
    }
}

impl WeightSensor for SimulatedWeightSensor {
    fn is_ready(&mut self) -> bool {
        self.handle.lock().ready
    }

    fn read_raw(&mut self, samples: u8) -> Result<i64, BoxError> {
        Ok(crate::util::average_counts(samples, || self.read_once())?)
    }

    fn tare(&mut self, samples: u8) -> Result<i64, BoxError> {
        let offset = crate::util::average_counts(samples, || self.read_once())?;
        self.offset = offset;
        tracing::debug!(offset, "simulated tare");
        Ok(offset)
    }

    fn set_scale(&mut self, factor: f32) {
        self.scale = factor;
    }

    fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }
}

/// Shared queue behind a [`SimulatedTagReader`].
#[derive(Debug, Clone, Default)]
pub struct TagQueue(Arc<Mutex<VecDeque<String>>>);

impl TagQueue {
    /// Present a tag; the next poll returns it.
    pub fn present(&self, tag: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(tag.into());
    }

    pub fn pending(&self) -> usize {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    fn pop(&self) -> Option<String> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }
}

/// Reader that returns queued tags one per poll and never blocks.
#[derive(Debug, Default)]
pub struct SimulatedTagReader {
    queue: TagQueue,
}

impl SimulatedTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> TagQueue {
        self.queue.clone()
    }
}

impl TagReader for SimulatedTagReader {
    fn poll(&mut self, _timeout: Duration) -> Result<Option<String>, BoxError> {
        Ok(self.queue.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_bounded_and_reproducible() {
        let mut a = SimulatedWeightSensor::new().with_noise(50, 7);
        let mut b = SimulatedWeightSensor::new().with_noise(50, 7);
        for _ in 0..100 {
            let ra = a.read_raw(1).expect("read");
            let rb = b.read_raw(1).expect("read");
            assert_eq!(ra, rb);
            assert!((ra - DEFAULT_ZERO_COUNTS).abs() <= 50);
        }
    }

    #[test]
    fn tag_queue_is_fifo() {
        let mut reader = SimulatedTagReader::new();
        let q = reader.queue();
        q.present("AA");
        q.present("BB");
        assert_eq!(reader.poll(Duration::ZERO).expect("poll").as_deref(), Some("AA"));
        assert_eq!(reader.poll(Duration::ZERO).expect("poll").as_deref(), Some("BB"));
        assert!(reader.poll(Duration::ZERO).expect("poll").is_none());
    }
}
