//! Reservoir fill level to marginal cost.
//!
//! The curve has a kink at the critical level. At or above it the cost falls
//! linearly from a quarter of the ceiling down to the floor at a full
//! reservoir. Below it the cost climbs exponentially in
//! `(critical − level) / critical`, normalised so an empty reservoir costs
//! exactly the ceiling:
//!
//! ```text
//! cost(l) = knee + (ceiling − knee) · (e^{2x} − 1) / (e^2 − 1),  x = (critical − l) / critical
//! cost(l) = knee − (knee − floor) · (l − critical) / (1 − critical),  l ≥ critical
//! ```
//!
//! Scalar and batch evaluation share one kernel, so both forms are
//! bit-identical. Results are rounded to cents.

use crate::rng::SimRng;
use chrono::Datelike;
use qgrid_core::{Carrier, NetworkModel, SnapshotSet};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

pub const COST_FLOOR: f64 = 5.0;
pub const COST_CEILING: f64 = 35.0;
pub const CRITICAL_LEVEL: f64 = 0.25;

const LEVEL_MIN: f64 = 0.1;
const LEVEL_MAX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservoirCostModel {
    pub floor: f64,
    pub ceiling: f64,
    pub critical: f64,
}

impl Default for ReservoirCostModel {
    fn default() -> Self {
        Self {
            floor: COST_FLOOR,
            ceiling: COST_CEILING,
            critical: CRITICAL_LEVEL,
        }
    }
}

impl ReservoirCostModel {
    /// Cost at the critical level.
    pub fn knee(&self) -> f64 {
        self.ceiling / 4.0
    }

    /// Marginal cost ($/MWh) for a fill level in `[0, 1]`. Levels outside the
    /// range are clamped; an unknown (`NaN`) level costs the ceiling.
    pub fn cost(&self, level: f64) -> f64 {
        round_cents(self.kernel(level))
    }

    /// Batch form of [`ReservoirCostModel::cost`].
    pub fn cost_batch(&self, levels: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; levels.len()];
        self.cost_into(levels, &mut out);
        out
    }

    /// Write costs for `levels` into `out` (lengths must match; extra
    /// entries of the longer slice are left untouched).
    pub fn cost_into(&self, levels: &[f64], out: &mut [f64]) {
        for (slot, &level) in out.iter_mut().zip(levels) {
            *slot = round_cents(self.kernel(level));
        }
    }

    fn kernel(&self, level: f64) -> f64 {
        if level.is_nan() {
            return self.ceiling;
        }
        let level = level.clamp(0.0, 1.0);
        let knee = self.knee();
        if level < self.critical {
            let x = (self.critical - level) / self.critical;
            knee + (self.ceiling - knee) * (2.0 * x).exp_m1() / 2.0_f64.exp_m1()
        } else {
            let span = (1.0 - self.critical).max(f64::EPSILON);
            knee - (knee - self.floor) * (level - self.critical) / span
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Synthetic fill-level trajectory for one reservoir.
///
/// Starts from `U(0.4, 0.8)`, follows a seasonal sine peaking in June and
/// drifts with cumulative `N(0, 0.01)` noise, clipped to `[0.1, 1.0]`.
pub fn simulate_levels(snapshots: &SnapshotSet, rng: &mut SimRng) -> Vec<f64> {
    let initial = rng.uniform_range(0.4, 0.8);
    let mut drift = 0.0;
    snapshots
        .iter()
        .map(|ts| {
            drift += rng.normal(0.0, 0.01);
            let month = ts.month() as f64;
            let seasonal = 0.2 * ((month - 3.0) * PI / 6.0).sin();
            (initial + seasonal + drift).clamp(LEVEL_MIN, LEVEL_MAX)
        })
        .collect()
}

/// Replace the marginal cost series of every reservoir generator with the
/// cost of a simulated level trajectory. Returns the number of generators
/// updated.
pub fn apply_reservoir_costs(
    network: &mut NetworkModel,
    model: &ReservoirCostModel,
    rng: &mut SimRng,
) -> usize {
    let snapshots = network.snapshots().clone();
    let mut updated = 0;
    for generator in network.generators_mut() {
        if generator.carrier != Carrier::HydroReservoir {
            continue;
        }
        let levels = simulate_levels(&snapshots, rng);
        generator.marginal_cost = model.cost_batch(&levels);
        debug!(
            generator = %generator.name,
            mean_level = levels.iter().sum::<f64>() / levels.len().max(1) as f64,
            "reservoir costs updated"
        );
        updated += 1;
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_knee() {
        let model = ReservoirCostModel::default();
        assert_eq!(model.cost(1.0), 5.0);
        assert_eq!(model.cost(0.0), 35.0);
        assert_eq!(model.cost(0.25), 8.75);
        assert_eq!(model.cost(f64::NAN), 35.0);
    }

    #[test]
    fn monotone_non_increasing_in_level() {
        let model = ReservoirCostModel::default();
        let levels: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let costs = model.cost_batch(&levels);
        for pair in costs.windows(2) {
            assert!(pair[1] <= pair[0], "{:?}", pair);
        }
        assert!(costs.iter().all(|c| *c >= COST_FLOOR && *c <= COST_CEILING));
    }

    #[test]
    fn batch_matches_scalar_bitwise() {
        let model = ReservoirCostModel::default();
        let levels = [0.0, 0.013, 0.1, 0.2499, 0.25, 0.61, 0.999, 1.0, 1.7, -0.3];
        let batch = model.cost_batch(&levels);
        for (level, cost) in levels.iter().zip(&batch) {
            assert_eq!(model.cost(*level).to_bits(), cost.to_bits());
        }
    }

    #[test]
    fn simulated_levels_stay_in_bounds() {
        use chrono::NaiveDate;
        use qgrid_core::{TimeStep, TimeWindow};
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let window = TimeWindow::new(start, end, TimeStep::Daily).unwrap();
        let snapshots = SnapshotSet::from_window(&window);
        let mut rng = SimRng::seeded(3);
        let levels = simulate_levels(&snapshots, &mut rng);
        assert_eq!(levels.len(), snapshots.len());
        assert!(levels.iter().all(|l| (LEVEL_MIN..=LEVEL_MAX).contains(l)));
    }
}
