//! Dispatch output and aggregated production statistics.

use crate::{Carrier, SeriesUnit, SnapshotSet, TimeStep};
use serde::{Deserialize, Serialize};

/// Per-generator, per-snapshot allocation produced by the dispatcher.
///
/// `p[t][g]` is indexed by snapshot then by [`crate::GeneratorId`] value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub snapshots: SnapshotSet,
    pub generator_names: Vec<String>,
    pub p: Vec<Vec<f64>>,
    /// Unit of the values in `p`
    pub unit: SeriesUnit,
    /// Total demand per snapshot (MW)
    pub demand: Vec<f64>,
    /// Residual assigned directly to per-day emergency units (MW)
    pub emergency_residual: Vec<f64>,
    /// Residual left below the emergency threshold (MW)
    pub unserved: Vec<f64>,
    /// Line active power; always zero since no flow is computed
    pub line_p0: Vec<Vec<f64>>,
    /// Line reactive power; always zero
    pub line_q0: Vec<Vec<f64>>,
}

impl DispatchResult {
    pub fn snapshot_total(&self, snapshot: usize) -> f64 {
        self.p.get(snapshot).map(|row| row.iter().sum()).unwrap_or(0.0)
    }

    /// Allocated power of one generator over all snapshots.
    pub fn generator_series(&self, generator: usize) -> Vec<f64> {
        self.p
            .iter()
            .map(|row| row.get(generator).copied().unwrap_or(0.0))
            .collect()
    }

    /// Largest `|Σ_g p[t][g] − demand[t]|` over the horizon.
    pub fn max_balance_error(&self) -> f64 {
        self.demand
            .iter()
            .enumerate()
            .map(|(t, d)| (self.snapshot_total(t) - d).abs())
            .fold(0.0, f64::max)
    }

    pub fn total_emergency_residual(&self) -> f64 {
        self.emergency_residual.iter().sum()
    }
}

/// Energy statistics of one carrier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarrierProduction {
    pub carrier: Carrier,
    pub generators: usize,
    pub installed_mw: f64,
    /// Mean of `Σ p_nom × p_max_pu` over the horizon
    pub mean_available_mw: f64,
    pub energy_mwh: f64,
    pub share_pct: f64,
    pub capacity_factor: f64,
    pub cost: f64,
    /// Installed capacity but no dispatched energy
    pub zero_dispatch: bool,
}

/// Emergency units reported as one group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmergencySummary {
    pub generators: usize,
    pub energy_mwh: f64,
    pub peak_mw: f64,
    pub snapshots_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSummary {
    pub step: TimeStep,
    pub snapshots: usize,
    pub total_energy_mwh: f64,
    pub total_demand_mwh: f64,
    pub total_cost: f64,
    pub pilotable_mwh: f64,
    pub non_pilotable_mwh: f64,
    pub by_carrier: Vec<CarrierProduction>,
    pub emergency: EmergencySummary,
    pub max_balance_error_mw: f64,
}

impl ProductionSummary {
    pub fn carrier(&self, carrier: Carrier) -> Option<&CarrierProduction> {
        self.by_carrier.iter().find(|c| c.carrier == carrier)
    }

    pub fn energy_of(&self, carrier: Carrier) -> f64 {
        self.carrier(carrier).map(|c| c.energy_mwh).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn balance_error_tracks_worst_snapshot() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let snapshots =
            SnapshotSet::from_timestamps(vec![start, start + chrono::Duration::hours(1)]).unwrap();
        let result = DispatchResult {
            snapshots,
            generator_names: vec!["a".into(), "b".into()],
            p: vec![vec![30.0, 20.0], vec![10.0, 9.5]],
            unit: SeriesUnit::Power,
            demand: vec![50.0, 20.0],
            emergency_residual: vec![0.0, 0.0],
            unserved: vec![0.0, 0.5],
            line_p0: vec![],
            line_q0: vec![],
        };
        assert_eq!(result.max_balance_error(), 0.5);
        assert_eq!(result.generator_series(1), vec![20.0, 9.5]);
    }
}
