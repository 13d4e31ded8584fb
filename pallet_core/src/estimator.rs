//! Filtered weight → unit count → transition.

use crate::config::InventoryCfg;

/// Absorbs f32 representation error at exact unit boundaries (1.30 / 0.65).
const COUNT_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    Added(u32),
    Removed(u32),
    Stable,
    /// Reading in flux; count deltas are not classified.
    #[default]
    Measuring,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Removed(_) => "removed",
            Self::Stable => "stable",
            Self::Measuring => "measuring",
        }
    }

    /// Signed count change carried by the transition.
    pub fn delta(&self) -> i32 {
        match *self {
            Self::Added(n) => i32::try_from(n).unwrap_or(i32::MAX),
            Self::Removed(n) => -i32::try_from(n).unwrap_or(i32::MAX),
            Self::Stable | Self::Measuring => 0,
        }
    }
}

/// Result of [`InventoryEstimator::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Reported weight after the zero floor and the overload clamp.
    pub weight: f32,
    pub count: u32,
    pub transition: Transition,
    pub overload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InventoryState {
    pub filtered_weight: f32,
    pub unit_count: u32,
    /// Count at the last stable tick; the baseline for classification.
    pub previous_unit_count: u32,
    pub stable: bool,
}

/// Outcome of folding one filter result into the inventory state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    pub estimate: Estimate,
    /// Overload entered on this tick.
    pub overload_started: bool,
}

#[derive(Debug, Clone)]
pub struct InventoryEstimator {
    cfg: InventoryCfg,
    state: InventoryState,
    overloaded: bool,
}

impl InventoryEstimator {
    pub fn new(cfg: InventoryCfg) -> Self {
        Self {
            cfg,
            state: InventoryState::default(),
            overloaded: false,
        }
    }

    pub fn cfg(&self) -> &InventoryCfg {
        &self.cfg
    }

    pub fn state(&self) -> &InventoryState {
        &self.state
    }

    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    /// Pure classification; does not touch the held state.
    pub fn evaluate(&self, filtered_weight: f32, stable: bool, previous_count: u32) -> Estimate {
        let mut weight = if filtered_weight.is_finite() {
            filtered_weight
        } else {
            0.0
        };
        let mut overload = false;

        let count = if weight <= self.cfg.min_weight {
            weight = 0.0;
            0
        } else {
            if weight > self.cfg.max_weight {
                weight = self.cfg.max_weight;
                overload = true;
            }
            units_in(weight, self.cfg.unit_weight)
        };

        let transition = if !stable {
            Transition::Measuring
        } else if count > previous_count {
            Transition::Added(count - previous_count)
        } else if count < previous_count {
            Transition::Removed(previous_count - count)
        } else {
            Transition::Stable
        };

        Estimate {
            weight,
            count,
            transition,
            overload,
        }
    }

    /// Evaluate against the settled baseline and store the result. The
    /// baseline only moves on stable ticks.
    pub fn update(&mut self, filtered_weight: f32, stable: bool) -> Update {
        let estimate = self.evaluate(filtered_weight, stable, self.state.previous_unit_count);
        self.state.filtered_weight = estimate.weight;
        self.state.unit_count = estimate.count;
        self.state.stable = stable;
        if stable {
            self.state.previous_unit_count = estimate.count;
        }
        let overload_started = estimate.overload && !self.overloaded;
        self.overloaded = estimate.overload;
        Update {
            estimate,
            overload_started,
        }
    }

    /// Forget everything observed so far.
    pub fn reset(&mut self) {
        self.state = InventoryState::default();
        self.overloaded = false;
    }
}

fn units_in(weight: f32, unit_weight: f32) -> u32 {
    let n = (f64::from(weight) / f64::from(unit_weight) + COUNT_EPSILON).floor();
    if n.is_finite() && n > 0.0 {
        n.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn est() -> InventoryEstimator {
        InventoryEstimator::new(InventoryCfg::default())
    }

    #[test]
    fn below_min_weight_reports_empty() {
        let e = est().evaluate(0.08, true, 0);
        assert_eq!(e.count, 0);
        assert_eq!(e.weight, 0.0);
        assert_eq!(e.transition, Transition::Stable);
    }

    #[test]
    fn overload_clamps_before_counting() {
        let e = est().evaluate(25.0, true, 0);
        assert!(e.overload);
        assert_eq!(e.weight, 20.0);
        assert_eq!(e.count, 30);
    }

    #[test]
    fn overload_event_fires_on_rising_edge_only() {
        let mut e = est();
        assert!(e.update(21.0, true).overload_started);
        assert!(!e.update(22.0, true).overload_started);
        assert!(!e.update(5.0, true).overload_started);
        assert!(e.update(21.0, true).overload_started);
    }

    #[test]
    fn baseline_moves_only_when_stable() {
        let mut e = est();
        assert_eq!(e.update(0.7, false).estimate.transition, Transition::Measuring);
        assert_eq!(e.state().previous_unit_count, 0);
        assert_eq!(e.update(1.95, true).estimate.transition, Transition::Added(3));
        assert_eq!(e.state().previous_unit_count, 3);
        assert_eq!(e.update(1.95, true).estimate.transition, Transition::Stable);
    }

    #[test]
    fn signed_delta() {
        assert_eq!(Transition::Added(2).delta(), 2);
        assert_eq!(Transition::Removed(3).delta(), -3);
        assert_eq!(Transition::Measuring.delta(), 0);
    }
}
