//! `pallet simulate`: replay a scenario file on a manual clock.
//!
//! Deterministic and as fast as the CPU allows; every event record and a
//! periodic snapshot are printed as JSON lines, then a `final` snapshot.

use std::path::Path;

use eyre::WrapErr;
use pallet_core::PalletController;
use pallet_hardware::SimulatedTagReader;
use pallet_traits::ManualClock;

use crate::output::{JsonLinesSink, print_line, snapshot_json, with_cells};
use crate::rig;

pub fn simulate(cfg: &pallet_config::Config, scenario_path: &Path) -> eyre::Result<()> {
    let text = std::fs::read_to_string(scenario_path)
        .wrap_err_with(|| format!("read scenario {}", scenario_path.display()))?;
    let scenario = pallet_config::load_scenario(&text)?;

    let rig = rig::simulated(cfg, (&cfg.calibration).into());
    let sim = rig
        .sim
        .clone()
        .ok_or_else(|| eyre::eyre!("simulated rig has no load handle"))?;
    let reader = SimulatedTagReader::new();
    let tags = reader.queue();
    let clock = ManualClock::new();

    let mut ctrl = PalletController::builder()
        .with_config(cfg)
        .with_calibration(rig.calibration)
        .with_tag_reader(reader)
        .with_sink(JsonLinesSink)
        .with_clock(Box::new(clock.clone()))
        .with_sensor(rig.sensor)
        .build()?;

    let tick = cfg.timing.sample_ms.min(cfg.timing.tag_poll_ms);
    let end = scenario.duration_ms();
    let mut steps = scenario.steps.iter().peekable();
    let mut last_publish: Option<u64> = None;
    tracing::info!(steps = scenario.steps.len(), duration_ms = end, "simulation start");

    loop {
        let now = ctrl.now_ms();
        while let Some(step) = steps.next_if(|s| s.at_ms <= now) {
            if let Some(load) = step.load {
                tracing::debug!(at_ms = step.at_ms, load, "scenario load");
                sim.set_load(load);
            }
            if let Some(ready) = step.ready {
                tracing::debug!(at_ms = step.at_ms, ready, "scenario sensor ready");
                sim.set_ready(ready);
            }
            if let Some(tag) = &step.tag {
                tracing::debug!(at_ms = step.at_ms, tag = %tag, "scenario tap");
                tags.present(tag.clone());
            }
        }

        ctrl.step()?;

        if pallet_core::util::is_due(last_publish, now, cfg.timing.publish_ms) {
            last_publish = Some(now);
            print_line(&with_cells(
                snapshot_json(&ctrl.snapshot(), "snapshot"),
                rig.cells.as_ref(),
            ));
        }
        if now >= end {
            break;
        }
        clock.advance_ms(tick);
    }

    print_line(&with_cells(
        snapshot_json(&ctrl.snapshot(), "final"),
        rig.cells.as_ref(),
    ));
    tracing::info!(unit_count = ctrl.unit_count(), "simulation finished");
    Ok(())
}
