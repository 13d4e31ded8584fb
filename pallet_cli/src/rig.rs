//! Assembles the weight sensor: HX711 cells with `--features hardware`,
//! otherwise simulated cells whose load comes from the environment. A
//! config with `[[cells]]` gets one converter per cell behind a
//! [`CombinedWeightSensor`].

use pallet_core::Calibration;
use pallet_hardware::combined::VIRTUAL_COUNTS_PER_UNIT;
use pallet_hardware::{CellReadings, CombinedWeightSensor, SimHandle};
use pallet_traits::WeightSensor;

/// Load in weight units placed on the simulated pallet.
#[cfg(not(feature = "hardware"))]
pub const SIM_LOAD_ENV: &str = "PALLET_SIM_LOAD_KG";
/// `0` makes the simulated converters never ready.
#[cfg(not(feature = "hardware"))]
pub const SIM_READY_ENV: &str = "PALLET_SIM_READY";

/// Control over every simulated cell of a rig.
#[derive(Debug, Clone)]
pub struct SimControls(Vec<SimHandle>);

impl SimControls {
    /// Spreads `load` evenly over the cells.
    pub fn set_load(&self, load: f32) {
        let share = load / self.0.len().max(1) as f32;
        for h in &self.0 {
            h.set_load(share);
        }
    }

    pub fn set_ready(&self, ready: bool) {
        for h in &self.0 {
            h.set_ready(ready);
        }
    }
}

pub struct Rig {
    pub sensor: Box<dyn WeightSensor>,
    /// Present when the sensor is simulated.
    pub sim: Option<SimControls>,
    /// Per-cell weights of a multi-cell pallet.
    pub cells: Option<CellReadings>,
    pub calibration: Calibration,
}

/// Controller constants for a combined sensor; never-calibrated defaults
/// become the virtual cell's own resolution.
fn combined_calibration(calibration: Calibration) -> Calibration {
    if calibration == Calibration::default() {
        Calibration {
            scale_factor: VIRTUAL_COUNTS_PER_UNIT,
            offset: 0,
        }
    } else {
        calibration
    }
}

/// Simulated cell consistent with `calibration`. Default constants (never
/// calibrated) get the simulator's own cell so readings stay meaningful.
fn simulated_cell(
    calibration: pallet_config::Calibration,
) -> (pallet_hardware::SimulatedWeightSensor, pallet_config::Calibration) {
    use pallet_hardware::SimulatedWeightSensor;
    use pallet_hardware::sim::{DEFAULT_COUNTS_PER_UNIT, DEFAULT_ZERO_COUNTS};

    if calibration == pallet_config::Calibration::default() {
        (
            SimulatedWeightSensor::new(),
            pallet_config::Calibration {
                scale_factor: DEFAULT_COUNTS_PER_UNIT,
                offset: DEFAULT_ZERO_COUNTS,
            },
        )
    } else {
        (
            SimulatedWeightSensor::with_cell(calibration.scale_factor, calibration.offset),
            calibration,
        )
    }
}

pub fn simulated(cfg: &pallet_config::Config, calibration: Calibration) -> Rig {
    if cfg.cells.is_empty() {
        let (sensor, cal) = simulated_cell(calibration.into());
        let handle = sensor.handle();
        tracing::debug!(
            scale_factor = cal.scale_factor,
            offset = cal.offset,
            "simulated weight sensor"
        );
        return Rig {
            sensor: Box::new(sensor),
            sim: Some(SimControls(vec![handle])),
            cells: None,
            calibration: (&cal).into(),
        };
    }

    let mut combined = CombinedWeightSensor::new();
    let mut handles = Vec::with_capacity(cfg.cells.len());
    for cell in &cfg.cells {
        let (sensor, cal) = simulated_cell(cell.calibration());
        handles.push(sensor.handle());
        combined = combined.with_cell(sensor, cal);
    }
    tracing::debug!(cells = handles.len(), "simulated multi-cell pallet");
    Rig {
        cells: Some(combined.readings()),
        sensor: Box::new(combined),
        sim: Some(SimControls(handles)),
        calibration: combined_calibration(calibration),
    }
}

/// Simulation seeded from `PALLET_SIM_LOAD_KG` / `PALLET_SIM_READY`.
#[cfg(not(feature = "hardware"))]
fn simulated_from_env(cfg: &pallet_config::Config, calibration: Calibration) -> eyre::Result<Rig> {
    let rig = simulated(cfg, calibration);
    if let Some(h) = &rig.sim {
        if let Ok(v) = std::env::var(SIM_LOAD_ENV) {
            let load: f32 = v
                .trim()
                .parse()
                .map_err(|e| eyre::eyre!("{SIM_LOAD_ENV}={v:?} is not a number: {e}"))?;
            h.set_load(load);
        }
        if std::env::var(SIM_READY_ENV).is_ok_and(|v| v.trim() == "0") {
            h.set_ready(false);
        }
    }
    Ok(rig)
}

#[cfg(not(feature = "hardware"))]
pub fn open(cfg: &pallet_config::Config, calibration: Calibration) -> eyre::Result<Rig> {
    simulated_from_env(cfg, calibration)
}

#[cfg(feature = "hardware")]
fn open_hx711(dt: u8, sck: u8, gain_pulses: u8) -> eyre::Result<pallet_hardware::HardwareWeightSensor> {
    use eyre::WrapErr;
    let sensor = pallet_hardware::HardwareWeightSensor::new(dt, sck, gain_pulses)
        .wrap_err_with(|| format!("open hx711 on dt={dt} sck={sck}"))?;
    tracing::info!(dt, sck, gain_pulses, "hx711 opened");
    Ok(sensor)
}

#[cfg(feature = "hardware")]
pub fn open(cfg: &pallet_config::Config, calibration: Calibration) -> eyre::Result<Rig> {
    if cfg.cells.is_empty() {
        let sensor = open_hx711(
            cfg.pins.hx711_dt,
            cfg.pins.hx711_sck,
            cfg.pins.hx711_gain_pulses,
        )?;
        return Ok(Rig {
            sensor: Box::new(sensor),
            sim: None,
            cells: None,
            calibration,
        });
    }

    let mut combined = CombinedWeightSensor::new();
    for cell in &cfg.cells {
        let sensor = open_hx711(cell.hx711_dt, cell.hx711_sck, cell.hx711_gain_pulses)?;
        combined = combined.with_cell(sensor, cell.calibration());
    }
    Ok(Rig {
        cells: Some(combined.readings()),
        sensor: Box::new(combined),
        sim: None,
        calibration: combined_calibration(calibration),
    })
}
