#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `pallet` binary: runs the inventory controller against the HX711 (or a
//! simulated cell), replays scenarios, calibrates and self-checks.

mod calibrate;
mod cli;
mod error_fmt;
mod logging;
mod output;
mod rig;
mod run;
mod self_check;
mod simulate;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // clap prints usage and exits with 2 on bad arguments
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(err) = real_main(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "exiting with error");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(path) = cli.calibration.as_deref() {
        cfg.calibration = pallet_config::load_calibration_csv(path)
            .wrap_err_with(|| format!("calibration CSV {}", path.display()))?;
    }

    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging);
    tracing::debug!(
        tags = cfg.tags.len(),
        scale_factor = cfg.calibration.scale_factor,
        offset = cfg.calibration.offset,
        "configuration loaded"
    );

    match cli.cmd {
        Commands::Run {
            duration_ms,
            tags_from,
        } => run::run(&cfg, duration_ms, tags_from.as_deref()),
        Commands::Simulate { scenario } => simulate::simulate(&cfg, &scenario),
        Commands::Calibrate { known } => calibrate::calibrate(&cfg, known),
        Commands::SelfCheck => self_check::self_check(&cfg),
    }
}

/// Read, parse and validate the config file; defaults when no path is given.
fn load_config(path: Option<&Path>) -> eyre::Result<pallet_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            pallet_config::load_toml(&text)
                .map_err(|e| eyre::eyre!("{e}"))
                .wrap_err("invalid configuration")?
        }
        None => pallet_config::Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}
