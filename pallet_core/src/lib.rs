#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Weight-to-inventory core (hardware-agnostic).
//!
//! All hardware interactions go through the `pallet_traits` collaborator
//! traits: `WeightSensor`, `TagReader`, `TagDirectory` and `Clock`.
//!
//! ## Architecture
//!
//! - **Filter**: fixed ring moving average with a stability verdict (`filter`)
//! - **Inventory estimator**: weight → unit count → added/removed/stable/measuring (`estimator`)
//! - **Tap sequencer**: debounced tag taps driving load/unload sessions (`tap`)
//! - **Session controller**: interval-timed sampling and polling, event records,
//!   snapshots and the calibration guard (`controller`)
//! - **Events**: records and fire-and-forget sinks (`events`)
//!
//! ```text
//! sensor ─▶ clamp ≥ 0 ─▶ MovingAverage ─▶ InventoryEstimator ─┐
//!                                                            ├─▶ EventRecord ─▶ EventSink
//! reader ─▶ debounce ─▶ TagDirectory ─▶ TapSequencer ─────────┘
//! ```

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod events;
pub mod filter;
pub mod hw_error;
pub mod mocks;
pub mod status;
pub mod tap;
pub mod util;

pub use builder::PalletControllerBuilder;
pub use config::{Calibration, FilterCfg, InventoryCfg, SensorCfg, TapCfg, TimingCfg};
pub use controller::{CalibrationSession, PalletController};
pub use error::{BuildError, PalletError, Result};
pub use estimator::{Estimate, InventoryEstimator, InventoryState, Transition};
pub use events::{ChannelSink, EventKind, EventRecord, EventSink, FanOut, LogSink, NullSink};
pub use filter::{FilterResult, MovingAverage};
pub use status::{Snapshot, SystemStatus};
pub use tap::{TapOutcome, TapSequencer, TapSession, TapState};
