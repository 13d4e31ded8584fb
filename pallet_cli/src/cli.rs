//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pallet", version, about = "Smart pallet inventory controller")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Optional calibration CSV (strict header), overrides [calibration]
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); beats `[logging].level`, default info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop in real time until Ctrl-C
    Run {
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Read tag UIDs, one per line, from `stdin` or a file/serial device
        #[arg(long, value_name = "stdin|PATH")]
        tags_from: Option<String>,
    },
    /// Replay a scenario file on a simulated clock and print every event
    Simulate {
        /// Scenario TOML ([[step]] at_ms, load, tag, ready)
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,
    },
    /// Tare, then derive the scale factor from a known reference weight
    Calibrate {
        /// Reference weight in weight units (kg)
        #[arg(long, value_name = "WEIGHT")]
        known: f32,
    },
    /// Validate configuration and probe the weight sensor
    SelfCheck,
}
