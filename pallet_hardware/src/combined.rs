//! Several load cells under one pallet, reported as a single sensor.
//!
//! Each cell converts its own raw counts with its own constants, negative
//! cell weights count as zero, and the cell weights are summed. The sum is
//! re-encoded as counts of a virtual cell whose scale and offset are the
//! ones the controller pushes through [`WeightSensor::set_scale`] and
//! [`WeightSensor::set_offset`], so the controller's conversion recovers
//! the total exactly.
use std::sync::{Arc, Mutex, PoisonError};

use pallet_config::Calibration;
use pallet_traits::{BoxError, WeightSensor};

/// Virtual-cell resolution used until the controller pushes its own constants.
pub const VIRTUAL_COUNTS_PER_UNIT: f32 = 10_000.0;

struct Cell {
    sensor: Box<dyn WeightSensor>,
    calibration: Calibration,
}

/// Latest per-cell weights, shared with whoever publishes telemetry.
#[derive(Debug, Clone, Default)]
pub struct CellReadings(Arc<Mutex<Vec<f32>>>);

impl CellReadings {
    pub fn get(&self) -> Vec<f32> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, weights: Vec<f32>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = weights;
    }
}

pub struct CombinedWeightSensor {
    cells: Vec<Cell>,
    readings: CellReadings,
    scale: f32,
    offset: i64,
}

impl Default for CombinedWeightSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl CombinedWeightSensor {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            readings: CellReadings::default(),
            scale: VIRTUAL_COUNTS_PER_UNIT,
            offset: 0,
        }
    }

    /// Add a cell; `calibration` converts its raw counts to weight units.
    pub fn with_cell(mut self, sensor: impl WeightSensor + 'static, calibration: Calibration) -> Self {
        self.cells.push(Cell {
            sensor: Box::new(sensor),
            calibration,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn readings(&self) -> CellReadings {
        self.readings.clone()
    }

    /// Per-cell constants, updated by [`WeightSensor::tare`].
    pub fn cell_calibrations(&self) -> Vec<Calibration> {
        self.cells.iter().map(|c| c.calibration).collect()
    }

    /// Sum of the clamped cell weights.
    fn read_total(&mut self, samples: u8) -> Result<f32, BoxError> {
        let mut weights = Vec::with_capacity(self.cells.len());
        for cell in &mut self.cells {
            let raw = cell.sensor.read_raw(samples)?;
            let units = cell.calibration.to_units(raw);
            weights.push(if units.is_finite() { units.max(0.0) } else { 0.0 });
        }
        let total = weights.iter().sum();
        tracing::trace!(?weights, total, "cell weights");
        self.readings.set(weights);
        Ok(total)
    }
}

impl WeightSensor for CombinedWeightSensor {
    fn is_ready(&mut self) -> bool {
        !self.cells.is_empty() && self.cells.iter_mut().all(|c| c.sensor.is_ready())
    }

    fn read_raw(&mut self, samples: u8) -> Result<i64, BoxError> {
        let total = self.read_total(samples)?;
        let counts = (f64::from(total) * f64::from(self.scale)).round() as i64;
        Ok(self.offset.saturating_add(counts))
    }

    /// Tares every cell; the virtual baseline is unchanged and returned as is.
    fn tare(&mut self, samples: u8) -> Result<i64, BoxError> {
        for (idx, cell) in self.cells.iter_mut().enumerate() {
            let offset = cell.sensor.tare(samples)?;
            cell.calibration.offset = offset;
            cell.sensor.set_offset(offset);
            tracing::info!(cell = idx, offset, "load cell tared");
        }
        Ok(self.offset)
    }

    fn set_scale(&mut self, factor: f32) {
        self.scale = factor;
    }

    fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimulatedWeightSensor;

    #[test]
    fn tare_zeroes_each_cell() {
        let a = SimulatedWeightSensor::with_cell(20_000.0, 1_000);
        let b = SimulatedWeightSensor::with_cell(30_000.0, -2_000);
        let (ha, hb) = (a.handle(), b.handle());
        let cal = |f, o| Calibration {
            scale_factor: f,
            offset: o,
        };
        // constants from an old calibration, both cells drifted
        let mut s = CombinedWeightSensor::new()
            .with_cell(a, cal(20_000.0, 0))
            .with_cell(b, cal(30_000.0, 0));
        ha.set_load(0.5);
        hb.set_load(0.5);
        s.tare(4).expect("tare");
        let offsets: Vec<i64> = s.cell_calibrations().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![11_000, 13_000]);
        assert_eq!(s.read_raw(1).expect("read"), 0);
    }
}
