//! `pallet run`: real-time control loop until Ctrl-C or `--duration-ms`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use pallet_core::{FanOut, LogSink, PalletController};
use pallet_hardware::LineTagReader;
use pallet_traits::{Clock, MonotonicClock};

use crate::output::{JsonLinesSink, print_line, snapshot_json, with_cells};
use crate::rig;

pub fn run(
    cfg: &pallet_config::Config,
    duration_ms: Option<u64>,
    tags_from: Option<&str>,
) -> eyre::Result<()> {
    let rig = rig::open(cfg, (&cfg.calibration).into())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let sink = FanOut::new().with(LogSink).with(JsonLinesSink);
    let mut builder = PalletController::builder()
        .with_config(cfg)
        .with_calibration(rig.calibration)
        .with_sink(sink)
        .with_clock(Box::new(MonotonicClock::new()));
    match tags_from {
        Some("stdin" | "-") => builder = builder.with_tag_reader(LineTagReader::stdin()),
        Some(path) => {
            let reader = LineTagReader::open(Path::new(path))
                .wrap_err_with(|| format!("open tag source {path}"))?;
            builder = builder.with_tag_reader(reader);
        }
        None => {}
    }
    let mut ctrl = builder.with_sensor(rig.sensor).build()?;

    let tick = Duration::from_millis(cfg.timing.sample_ms.min(cfg.timing.tag_poll_ms));
    let clock = MonotonicClock::new();
    let mut last_publish: Option<u64> = None;
    tracing::info!(
        unit_weight = cfg.inventory.unit_weight,
        tags = cfg.tags.len(),
        simulated = rig.sim.is_some(),
        "pallet running"
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        ctrl.step()?;

        let now = ctrl.now_ms();
        if pallet_core::util::is_due(last_publish, now, cfg.timing.publish_ms) {
            last_publish = Some(now);
            print_line(&with_cells(
                snapshot_json(&ctrl.snapshot(), "snapshot"),
                rig.cells.as_ref(),
            ));
        }
        if duration_ms.is_some_and(|d| now >= d) {
            break;
        }
        clock.sleep(tick);
    }

    print_line(&with_cells(
        snapshot_json(&ctrl.snapshot(), "final"),
        rig.cells.as_ref(),
    ));
    Ok(())
}
