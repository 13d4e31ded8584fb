//! Point-in-time view of the controller for displays and telemetry.

use crate::estimator::Transition;
use crate::tap::TapState;

/// Overall system status shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// No sample taken yet.
    Initializing,
    Calibrating,
    /// Persistent sensor fault latched.
    HardwareError,
    /// Reading not settled.
    Measuring,
    Empty,
    Ready,
}

impl SystemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::Calibrating => "CALIBRATING",
            Self::HardwareError => "HARDWARE_ERROR",
            Self::Measuring => "MEASURING",
            Self::Empty => "EMPTY",
            Self::Ready => "READY",
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub weight: f32,
    pub unit_count: u32,
    pub stable: bool,
    pub transition: Transition,
    pub status: SystemStatus,
    pub tap_state: TapState,
    /// Tag of the pending or just completed session.
    pub tag: Option<String>,
    pub entity: Option<String>,
    pub sensor_fault: bool,
    pub calibrating: bool,
    pub timestamp_ms: u64,
}
