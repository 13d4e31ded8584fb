//! Contracts between the inventory core and the devices around it.
//!
//! Everything the control loop touches (load-cell amplifier, tag reader,
//! known-tag directory, time) goes through these traits so the core can be
//! driven without hardware.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::collections::HashMap;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Load-cell amplifier (HX711 or a simulation of one).
///
/// `read_raw` and `tare` average `samples` conversions; implementations must
/// return promptly when the converter is not ready instead of waiting for it.
pub trait WeightSensor {
    fn is_ready(&mut self) -> bool;

    /// Averaged raw ADC counts, uncompensated.
    fn read_raw(&mut self, samples: u8) -> Result<i64, BoxError>;

    /// Zero the baseline and return the new offset in raw counts.
    fn tare(&mut self, samples: u8) -> Result<i64, BoxError>;

    /// Raw counts per weight unit.
    fn set_scale(&mut self, factor: f32);

    fn set_offset(&mut self, offset: i64);
}

/// Single-shot tag poll; `Ok(None)` when nothing was presented within `timeout`.
pub trait TagReader {
    fn poll(&mut self, timeout: Duration) -> Result<Option<String>, BoxError>;
}

/// Maps a tag id to the entity (vehicle, lorry) it belongs to.
pub trait TagDirectory {
    fn lookup(&self, tag_id: &str) -> Option<String>;
}

impl TagDirectory for HashMap<String, String> {
    fn lookup(&self, tag_id: &str) -> Option<String> {
        self.get(tag_id).cloned()
    }
}

/// Canonical form of a tag UID: upper-case hex digits, separators removed.
///
/// Readers report UIDs as `aa:bb:cc`, `AA BB CC` or `aabbcc`; directory keys
/// and session matching always use the canonical form.
pub fn normalize_tag_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ':' | '-' | ' ' | '\t'))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Directory that accepts every tag and names the entity after the tag id.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenDirectory;

impl TagDirectory for OpenDirectory {
    fn lookup(&self, tag_id: &str) -> Option<String> {
        Some(tag_id.to_string())
    }
}

impl<T: WeightSensor + ?Sized> WeightSensor for Box<T> {
    fn is_ready(&mut self) -> bool {
        (**self).is_ready()
    }
    fn read_raw(&mut self, samples: u8) -> Result<i64, BoxError> {
        (**self).read_raw(samples)
    }
    fn tare(&mut self, samples: u8) -> Result<i64, BoxError> {
        (**self).tare(samples)
    }
    fn set_scale(&mut self, factor: f32) {
        (**self).set_scale(factor);
    }
    fn set_offset(&mut self, offset: i64) {
        (**self).set_offset(offset);
    }
}

impl<T: TagReader + ?Sized> TagReader for Box<T> {
    fn poll(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        (**self).poll(timeout)
    }
}

impl<T: TagDirectory + ?Sized> TagDirectory for Box<T> {
    fn lookup(&self, tag_id: &str) -> Option<String> {
        (**self).lookup(tag_id)
    }
}
