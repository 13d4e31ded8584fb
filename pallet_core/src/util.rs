//! Interval timer helpers for the control loop.

/// Milliseconds from `since` to `now`, 0 if the clock appears to run backwards.
#[inline]
pub fn elapsed_ms(since: u64, now: u64) -> u64 {
    now.saturating_sub(since)
}

/// An interval timer is due when it never fired or `interval_ms` has passed.
#[inline]
pub fn is_due(last_ms: Option<u64>, now: u64, interval_ms: u64) -> bool {
    last_ms.is_none_or(|last| elapsed_ms(last, now) >= interval_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_always_due() {
        assert!(is_due(None, 0, 100));
    }

    #[test]
    fn due_exactly_at_interval() {
        assert!(!is_due(Some(0), 99, 100));
        assert!(is_due(Some(0), 100, 100));
    }

    #[test]
    fn backwards_time_saturates() {
        assert_eq!(elapsed_ms(500, 100), 0);
        assert!(!is_due(Some(500), 100, 10));
    }
}
