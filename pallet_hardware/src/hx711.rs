use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_low_with_timeout};

/// Bit-banged HX711 24-bit load-cell ADC.
pub struct Hx711 {
    dt: InputPin,
    sck: OutputPin,
    gain_pulses: u8, // 25, 26, 27 based on gain/channel
}

impl Hx711 {
    pub fn new(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input();
        let mut sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_output();
        sck.set_low(); // clock idle low; a long high powers the chip down
        Ok(Self {
            dt,
            sck,
            gain_pulses,
        })
    }

    /// DT low means a conversion is waiting to be clocked out.
    pub fn is_ready(&self) -> bool {
        self.dt.is_low()
    }

    /// Clock out one conversion, waiting at most `timeout` for it.
    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        wait_until_low_with_timeout(
            || self.dt.is_high(),
            timeout,
            Duration::from_micros(200),
        )?;

        // Clock out 24 bits
        let mut value: i32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay_100ns();
            value = (value << 1) | i32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay_100ns();
        }

        // Pulse gain to set next measurement
        for _ in 0..self.gain_pulses.saturating_sub(24) {
            self.sck.set_high();
            spin_delay_100ns();
            self.sck.set_low();
            spin_delay_100ns();
        }

        let value = sign_extend_24(value);
        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }
}

#[inline(always)]
fn spin_delay_100ns() {
    std::hint::spin_loop();
}
