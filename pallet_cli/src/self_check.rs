//! `pallet self-check`: configuration is already validated by the time we
//! get here, so this only probes the sensor.

use pallet_core::PalletError;
use pallet_core::hw_error::map_hw_error;

use crate::rig;

pub fn self_check(cfg: &pallet_config::Config) -> eyre::Result<()> {
    let rig = rig::open(cfg, (&cfg.calibration).into())?;
    let mut sensor = rig.sensor;

    if !sensor.is_ready() {
        return Err(eyre::Report::new(PalletError::SensorNotReady));
    }
    let raw = sensor
        .read_raw(cfg.sensor.read_samples)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
    if raw.abs() >= cfg.sensor.raw_limit {
        return Err(eyre::Report::new(PalletError::SensorOutOfRange { raw }));
    }
    let units = rig.calibration.to_units(raw);
    tracing::info!(raw, units, tags = cfg.tags.len(), "self-check passed");
    println!("self-check ok (raw={raw}, weight={units:.3})");
    Ok(())
}
