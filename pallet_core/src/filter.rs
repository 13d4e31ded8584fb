//! Moving-average filter with stability detection.
//!
//! The window is a fixed ring of `samples` slots pre-seeded with zeros, so a
//! mean exists from the first reading and ramps up over one full window after
//! start or a reset. Every call rescans the whole ring; nothing is carried
//! between calls except the slots themselves.

/// Output of one [`MovingAverage::ingest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterResult {
    pub mean: f32,
    pub is_stable: bool,
}

#[derive(Debug, Clone)]
pub struct MovingAverage {
    buf: Vec<f32>,
    cursor: usize,
    threshold: f32,
}

impl MovingAverage {
    /// `samples` is clamped to at least 1.
    pub fn new(samples: usize, stability_threshold: f32) -> Self {
        Self {
            buf: vec![0.0; samples.max(1)],
            cursor: 0,
            threshold: stability_threshold,
        }
    }

    /// Overwrite the oldest slot with `raw` and return the new mean and verdict.
    ///
    /// Callers clamp negative readings before ingesting.
    pub fn ingest(&mut self, raw: f32) -> FilterResult {
        self.buf[self.cursor] = raw;
        self.cursor = (self.cursor + 1) % self.buf.len();
        self.result()
    }

    /// Mean and stability of the current window without modifying it.
    pub fn result(&self) -> FilterResult {
        let mean = self.mean_f64();
        let max_dev = self
            .buf
            .iter()
            .map(|&x| (f64::from(x) - mean).abs())
            .fold(0.0f64, f64::max);
        FilterResult {
            mean: mean as f32,
            is_stable: max_dev < f64::from(self.threshold),
        }
    }

    /// Zero every slot and rewind the cursor.
    pub fn reset(&mut self) {
        self.buf.iter_mut().for_each(|x| *x = 0.0);
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn mean_f64(&self) -> f64 {
        let sum: f64 = self.buf.iter().map(|&x| f64::from(x)).sum();
        sum / self.buf.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_from_zeroed_window() {
        let mut f = MovingAverage::new(10, 0.05);
        let r = f.ingest(1.0);
        assert!((r.mean - 0.1).abs() < 1e-6);
        assert!(!r.is_stable);
    }

    #[test]
    fn cursor_wraps_and_overwrites_oldest() {
        let mut f = MovingAverage::new(3, 0.05);
        f.ingest(3.0);
        f.ingest(3.0);
        f.ingest(3.0);
        let r = f.ingest(0.0);
        assert!((r.mean - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reset_zeroes_the_window() {
        let mut f = MovingAverage::new(4, 0.05);
        for _ in 0..4 {
            f.ingest(2.0);
        }
        f.reset();
        let r = f.result();
        assert_eq!(r.mean, 0.0);
        assert!(r.is_stable);
    }

    #[test]
    fn zero_samples_is_treated_as_one() {
        let mut f = MovingAverage::new(0, 0.05);
        assert_eq!(f.len(), 1);
        assert_eq!(f.ingest(4.0).mean, 4.0);
    }
}
