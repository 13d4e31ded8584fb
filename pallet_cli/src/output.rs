//! JSON-lines rendering of event records and snapshots.

use std::io::Write;

use pallet_core::{EventRecord, EventSink, Snapshot};
use pallet_hardware::CellReadings;
use serde_json::{Value, json};

#[inline]
fn round3(x: f32) -> f64 {
    (f64::from(x) * 1000.0).round() / 1000.0
}

pub fn event_json(e: &EventRecord) -> Value {
    json!({
        "type": "event",
        "kind": e.kind.as_str(),
        "delta": e.delta,
        "total_count": e.total_count,
        "weight": round3(e.weight),
        "tag": e.tag,
        "entity": e.entity,
        "ts_ms": e.timestamp_ms,
    })
}

/// `kind` is `snapshot` for periodic telemetry and `final` at the end of a run.
pub fn snapshot_json(s: &Snapshot, kind: &str) -> Value {
    json!({
        "type": kind,
        "weight": round3(s.weight),
        "unit_count": s.unit_count,
        "stable": s.stable,
        "transition": s.transition.as_str(),
        "status": s.status.as_str(),
        "tap_state": s.tap_state.as_str(),
        "tag": s.tag,
        "entity": s.entity,
        "sensor_fault": s.sensor_fault,
        "calibrating": s.calibrating,
        "ts_ms": s.timestamp_ms,
    })
}

/// Adds the per-cell weights of a multi-cell pallet to a snapshot line.
pub fn with_cells(mut line: Value, cells: Option<&CellReadings>) -> Value {
    if let (Some(cells), Some(obj)) = (cells, line.as_object_mut()) {
        let weights: Vec<f64> = cells.get().into_iter().map(round3).collect();
        obj.insert("cells".into(), json!(weights));
    }
    line
}

pub fn print_line(v: &Value) {
    let mut out = std::io::stdout().lock();
    // stdout closed (e.g. piped into `head`) is not our problem
    let _ = writeln!(out, "{v}");
    let _ = out.flush();
}

/// Prints each record as one JSON object per line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn notify(&mut self, event: &EventRecord) {
        print_line(&event_json(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallet_core::EventKind;

    #[test]
    fn event_json_has_core_fields() {
        let v = event_json(&EventRecord {
            kind: EventKind::LoadComplete,
            delta: 2,
            total_count: 1,
            weight: 0.650_000_1,
            tag: Some("AABBCC".into()),
            entity: Some("Lorry 1".into()),
            timestamp_ms: 1234,
        });
        assert_eq!(v["kind"], "load_complete");
        assert_eq!(v["delta"], 2);
        assert_eq!(v["weight"], 0.65);
        assert_eq!(v["tag"], "AABBCC");
        assert_eq!(v["ts_ms"], 1234);
    }

    #[test]
    fn single_cell_snapshot_has_no_cells_field() {
        let v = with_cells(json!({"type": "snapshot"}), None);
        assert!(v.get("cells").is_none());
    }
}
