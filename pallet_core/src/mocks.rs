//! Test and helper mocks for pallet_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pallet_traits::{BoxError, TagReader, WeightSensor};

use crate::events::{EventRecord, EventSink};

/// A sensor that is never ready; useful when driving the controller with
/// externally sampled raw values via `ingest_raw`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSensor;

impl WeightSensor for NoopSensor {
    fn is_ready(&mut self) -> bool {
        false
    }
    fn read_raw(&mut self, _samples: u8) -> Result<i64, BoxError> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
    fn tare(&mut self, _samples: u8) -> Result<i64, BoxError> {
        Err(Box::new(std::io::Error::other("noop sensor")))
    }
    fn set_scale(&mut self, _factor: f32) {}
    fn set_offset(&mut self, _offset: i64) {}
}

/// Sensor that replays a script, one entry per tick: `Some(raw)` is a
/// reading, `None` is a not-ready tick. The last entry repeats once the
/// script runs out; an empty script is never ready.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: Arc<Mutex<VecDeque<Option<i64>>>>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
        }
    }

    /// Sensor that always reads `raw`.
    pub fn constant(raw: i64) -> Self {
        Self::new([Some(raw)])
    }

    /// Append entries; clones share the script.
    pub fn push(&self, reading: Option<i64>) {
        if let Ok(mut q) = self.script.lock() {
            q.push_back(reading);
        }
    }

    fn front(&self) -> Option<Option<i64>> {
        self.script.lock().ok().and_then(|q| q.front().copied())
    }

    fn take(&self) -> Option<Option<i64>> {
        let mut q = self.script.lock().ok()?;
        if q.len() > 1 {
            q.pop_front()
        } else {
            q.front().copied()
        }
    }
}

impl WeightSensor for ScriptedSensor {
    fn is_ready(&mut self) -> bool {
        match self.front() {
            Some(Some(_)) => true,
            Some(None) => {
                self.take();
                false
            }
            None => false,
        }
    }
    fn read_raw(&mut self, _samples: u8) -> Result<i64, BoxError> {
        match self.take() {
            Some(Some(raw)) => Ok(raw),
            _ => Err(Box::new(std::io::Error::other("not ready"))),
        }
    }
    fn tare(&mut self, samples: u8) -> Result<i64, BoxError> {
        self.read_raw(samples)
    }
    fn set_scale(&mut self, _factor: f32) {}
    fn set_offset(&mut self, _offset: i64) {}
}

/// Tag reader backed by a shared queue; clones share it.
#[derive(Debug, Clone, Default)]
pub struct QueuedTagReader {
    queue: Arc<Mutex<VecDeque<String>>>,
}

impl QueuedTagReader {
    pub fn present(&self, tag: &str) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(tag.to_string());
        }
    }
}

impl TagReader for QueuedTagReader {
    fn poll(&mut self, _timeout: Duration) -> Result<Option<String>, BoxError> {
        Ok(self.queue.lock().ok().and_then(|mut q| q.pop_front()))
    }
}

/// Sink that keeps every record; clones share the list.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<EventRecord>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn notify(&mut self, event: &EventRecord) {
        if let Ok(mut v) = self.events.lock() {
            v.push(event.clone());
        }
    }
}
