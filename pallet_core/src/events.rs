//! Event records and the sinks that fan them out.
//!
//! Sinks are fire-and-forget: `notify` cannot fail and must not block the
//! control loop. A sink that talks to slow I/O hands records to its own
//! thread (see [`ChannelSink`]).
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Removed,
    LoadStarted,
    UnloadStarted,
    LoadComplete,
    UnloadComplete,
    TransactionCancelled,
    TransactionExpired,
    UnknownTag,
    Overload,
    SensorFault,
    SensorRecovered,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::LoadStarted => "load_started",
            Self::UnloadStarted => "unload_started",
            Self::LoadComplete => "load_complete",
            Self::UnloadComplete => "unload_complete",
            Self::TransactionCancelled => "transaction_cancelled",
            Self::TransactionExpired => "transaction_expired",
            Self::UnknownTag => "unknown_tag",
            Self::Overload => "overload",
            Self::SensorFault => "sensor_fault",
            Self::SensorRecovered => "sensor_recovered",
        }
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::LoadComplete | Self::UnloadComplete)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of something the controller observed.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub kind: EventKind,
    /// Signed count change (added/removed) or transaction size.
    pub delta: i32,
    /// Unit count on the pallet when the record was made.
    pub total_count: u32,
    pub weight: f32,
    pub tag: Option<String>,
    pub entity: Option<String>,
    /// Milliseconds since the controller started.
    pub timestamp_ms: u64,
}

pub trait EventSink {
    fn notify(&mut self, event: &EventRecord);
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn notify(&mut self, event: &EventRecord) {
        (**self).notify(event);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&mut self, _event: &EventRecord) {}
}

/// Writes each record to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&mut self, e: &EventRecord) {
        tracing::info!(
            kind = e.kind.as_str(),
            delta = e.delta,
            total = e.total_count,
            weight = e.weight,
            tag = e.tag.as_deref().unwrap_or(""),
            entity = e.entity.as_deref().unwrap_or(""),
            ts_ms = e.timestamp_ms,
            "pallet event"
        );
    }
}

/// Hands records to another thread through a bounded queue. When the queue is
/// full the record is dropped and counted; the control loop never waits.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<EventRecord>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    pub fn bounded(cap: usize) -> (Self, Receiver<EventRecord>) {
        let (tx, rx) = bounded(cap.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl EventSink for ChannelSink {
    fn notify(&mut self, event: &EventRecord) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(dropped = n, "event queue full; record dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Delivers every record to each inner sink in order.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn EventSink + Send>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanOut {
    fn notify(&mut self, event: &EventRecord) {
        for sink in &mut self.sinks {
            sink.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(kind: EventKind) -> EventRecord {
        EventRecord {
            kind,
            delta: 1,
            total_count: 1,
            weight: 0.65,
            tag: None,
            entity: None,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn channel_sink_drops_when_full() {
        let (mut sink, rx) = ChannelSink::bounded(1);
        sink.notify(&rec(EventKind::Added));
        sink.notify(&rec(EventKind::Removed));
        assert_eq!(sink.dropped(), 1);
        assert_eq!(rx.try_recv().map(|e| e.kind), Ok(EventKind::Added));
    }

    #[test]
    fn fan_out_reaches_every_sink() {
        let (a, rx_a) = ChannelSink::bounded(4);
        let (b, rx_b) = ChannelSink::bounded(4);
        let mut fan = FanOut::new().with(a).with(b).with(LogSink);
        fan.notify(&rec(EventKind::LoadComplete));
        assert_eq!(fan.len(), 3);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(EventKind::TransactionCancelled.as_str(), "transaction_cancelled");
        assert_eq!(EventKind::SensorRecovered.to_string(), "sensor_recovered");
    }
}
