//! Device drivers for the smart pallet: HX711 load-cell amplifier, the
//! multi-cell combiner, tag readers and the simulations used when no
//! hardware is attached.
pub mod combined;
pub mod error;
pub mod line_reader;
pub mod sim;
pub mod util;

#[cfg(feature = "hardware")]
pub mod hx711;

pub use combined::{CellReadings, CombinedWeightSensor};
pub use line_reader::LineTagReader;
pub use sim::{SimHandle, SimulatedTagReader, SimulatedWeightSensor, TagQueue};

#[cfg(feature = "hardware")]
pub use hardware::HardwareWeightSensor;

#[cfg(feature = "hardware")]
mod hardware {
    use std::time::Duration;

    use pallet_traits::{BoxError, WeightSensor};

    use crate::error::HwError;
    use crate::hx711::Hx711;
    use crate::util::average_counts;

    /// HX711 converts at 10 SPS; allow a little over one period per sample.
    const CONVERSION_TIMEOUT: Duration = Duration::from_millis(150);

    pub struct HardwareWeightSensor {
        hx711: Hx711,
        scale_factor: f32,
        offset: i64,
    }

    impl HardwareWeightSensor {
        pub fn new(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self, HwError> {
            let hx711 = Hx711::new(dt_pin, sck_pin, gain_pulses)?;
            Ok(Self {
                hx711,
                scale_factor: 1.0,
                offset: 0,
            })
        }

        pub fn scale_factor(&self) -> f32 {
            self.scale_factor
        }

        pub fn offset(&self) -> i64 {
            self.offset
        }

        fn read_averaged(&mut self, samples: u8) -> Result<i64, HwError> {
            if !self.hx711.is_ready() {
                return Err(HwError::NotReady);
            }
            let mut attempts = 0;
            let max_attempts = 3;
            average_counts(samples, || loop {
                match self.hx711.read_with_timeout(CONVERSION_TIMEOUT) {
                    Ok(raw) => {
                        tracing::trace!(raw, "hx711 sample");
                        return Ok(i64::from(raw));
                    }
                    Err(HwError::DataReadyTimeout) if attempts < max_attempts => {
                        attempts += 1;
                        tracing::warn!(retries = attempts, "hx711 timeout, retrying");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "hx711 read error");
                        return Err(e);
                    }
                }
            })
        }
    }

    impl WeightSensor for HardwareWeightSensor {
        fn is_ready(&mut self) -> bool {
            self.hx711.is_ready()
        }

        fn read_raw(&mut self, samples: u8) -> Result<i64, BoxError> {
            Ok(self.read_averaged(samples)?)
        }

        fn tare(&mut self, samples: u8) -> Result<i64, BoxError> {
            let offset = self.read_averaged(samples)?;
            self.offset = offset;
            tracing::info!(offset, "hx711 tared");
            Ok(offset)
        }

        fn set_scale(&mut self, factor: f32) {
            self.scale_factor = factor;
        }

        fn set_offset(&mut self, offset: i64) {
            self.offset = offset;
        }
    }
}
