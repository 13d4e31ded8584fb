//! `pallet calibrate --known <weight>`: tare the empty pallet, then derive
//! the scale factor from a reference weight. Prints a `[calibration]` block
//! ready to paste into the config file.

use std::io::{BufRead, Write};

use eyre::WrapErr;
use pallet_core::{Calibration, NullSink, PalletController};

use crate::rig::{self, Rig};

pub fn calibrate(cfg: &pallet_config::Config, known: f32) -> eyre::Result<()> {
    if !(known.is_finite() && known > 0.0) {
        eyre::bail!("calibration weight must be positive, got {known}");
    }
    let Rig {
        sensor,
        sim,
        calibration,
        ..
    } = rig::open(cfg, (&cfg.calibration).into())?;

    let mut ctrl = PalletController::builder()
        .with_config(cfg)
        .with_calibration(calibration)
        .with_sink(NullSink)
        .with_sensor(sensor)
        .build()?;

    let result = {
        let mut session = ctrl.calibration_session()?;

        match &sim {
            Some(h) => h.set_load(0.0),
            None => prompt("Remove everything from the pallet, then press Enter")?,
        }
        let offset = session.tare()?;
        tracing::info!(offset, "empty pallet tared");

        match &sim {
            Some(h) => h.set_load(known),
            None => prompt(&format!("Place {known} on the pallet, then press Enter"))?,
        }
        let cal = session.calibrate_known(known)?;
        let check = session.read_units()?;
        tracing::info!(
            scale_factor = cal.scale_factor,
            offset = cal.offset,
            reads = check,
            "calibration derived"
        );
        cal
    };

    print!("{}", render_block(result)?);
    Ok(())
}

fn prompt(msg: &str) -> eyre::Result<()> {
    eprint!("{msg}: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .wrap_err("read confirmation from stdin")?;
    Ok(())
}

fn render_block(cal: Calibration) -> eyre::Result<String> {
    let mut inner = toml::Table::new();
    inner.insert(
        "scale_factor".into(),
        toml::Value::Float(f64::from(cal.scale_factor)),
    );
    inner.insert("offset".into(), toml::Value::Integer(cal.offset));
    let mut root = toml::Table::new();
    root.insert("calibration".into(), toml::Value::Table(inner));
    toml::to_string(&root).wrap_err("render calibration block")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_round_trips_through_config() {
        let text = render_block(Calibration {
            scale_factor: 22_000.0,
            offset: 8_400,
        })
        .expect("render");
        assert!(text.starts_with("[calibration]"));
        let cfg = pallet_config::load_toml(&text).expect("parse");
        assert_eq!(cfg.calibration.offset, 8_400);
        assert!((cfg.calibration.scale_factor - 22_000.0).abs() < 0.5);
    }
}
