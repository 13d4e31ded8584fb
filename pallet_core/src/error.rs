use thiserror::Error;

/// Conditions the control loop reports. None of them stop the loop; they
/// surface as log lines, event records or `Err` from misused calls.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PalletError {
    #[error("weight sensor not ready")]
    SensorNotReady,
    #[error("raw reading {raw} outside plausible range")]
    SensorOutOfRange { raw: i64 },
    #[error("weight {weight:.3} exceeds rated capacity")]
    Overload { weight: f32 },
    #[error("unknown tag {0}")]
    UnknownTag(String),
    #[error("tag {offending} tapped while session for {pending} was pending")]
    MismatchedTapTag { pending: String, offending: String },
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing weight sensor")]
    MissingSensor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
