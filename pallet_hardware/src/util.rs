use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (i.e., line goes low),
/// or a timeout expires. Sleeps in small intervals to avoid CPU spinning.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Integer mean of `samples` readings produced by `read`, stopping at the first error.
pub fn average_counts(samples: u8, mut read: impl FnMut() -> Result<i64>) -> Result<i64> {
    let n = i64::from(samples.max(1));
    let mut sum = 0i64;
    for _ in 0..n {
        sum = sum.saturating_add(read()?);
    }
    Ok(sum / n)
}

/// Two's-complement sign extension of a 24-bit HX711 sample.
#[inline]
pub fn sign_extend_24(value: i32) -> i32 {
    if (value & 0x80_0000) != 0 {
        value | !0xFF_FFFF
    } else {
        value & 0xFF_FFFF
    }
}
