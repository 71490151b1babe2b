//! Aggregate demand: bucketing, scaling and distribution across loads.

use crate::rng::SimRng;
use qgrid_core::{Hours, Megawatts, SeriesUnit, SnapshotSet, TimeStep};
use qgrid_io::DemandRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

const HOURS_PER_YEAR: f64 = 8760.0;
/// Annual demand allowed to drift from the target before rescaling.
pub const SCALING_TOLERANCE_TWH: f64 = 50.0;
pub const FUTURE_YEAR: i32 = 2050;

/// Size categories of individual loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadSize {
    Small,
    Medium,
    Large,
    XLarge,
}

impl LoadSize {
    pub const ALL: [LoadSize; 4] = [
        LoadSize::Small,
        LoadSize::Medium,
        LoadSize::Large,
        LoadSize::XLarge,
    ];
    pub const PROBABILITIES: [f64; 4] = [0.4, 0.3, 0.2, 0.1];

    fn draw_base_weight(self, rng: &mut SimRng) -> f64 {
        match self {
            LoadSize::Small => 0.5 * rng.beta(0.8, 4.0),
            LoadSize::Medium => 0.5 + 1.5 * rng.beta(2.0, 2.0),
            LoadSize::Large => 1.0 + rng.gamma(2.0, 0.9),
            LoadSize::XLarge => 3.0 + rng.gamma(3.0, 1.2),
        }
    }
}

/// Annual target for a year: `(TWh, average MW)`.
pub fn demand_target(year: i32) -> (f64, f64) {
    if year == FUTURE_YEAR {
        (375.0, 43_000.0)
    } else {
        (260.0, 27_000.0)
    }
}

/// Aggregate demand per snapshot in the unit native to the step: average MW
/// for hourly snapshots, MWh per day for daily ones. Snapshots without any
/// record are `NaN`.
pub fn aggregate_records(
    records: &[DemandRecord],
    snapshots: &SnapshotSet,
) -> (Vec<f64>, SeriesUnit) {
    let mut totals = vec![f64::NAN; snapshots.len()];
    for record in records {
        let value = record.total_mwh();
        if !value.is_finite() {
            continue;
        }
        if let Some(t) = snapshots.bucket(record.timestamp) {
            totals[t] = if totals[t].is_nan() { value } else { totals[t] + value };
        }
    }
    (totals, unit_for(snapshots.step()))
}

pub fn unit_for(step: TimeStep) -> SeriesUnit {
    match step {
        TimeStep::Hourly => SeriesUnit::Power,
        TimeStep::Daily => SeriesUnit::EnergyPerPeriod,
    }
}

/// Rescale `series` in place when its annualised energy deviates from the
/// year's target by more than [`SCALING_TOLERANCE_TWH`]. Returns the factor
/// applied (1.0 when untouched).
pub fn scale_to_target(
    series: &mut [f64],
    unit: SeriesUnit,
    hours_per_step: f64,
    year: i32,
) -> f64 {
    let powers: Vec<f64> = series
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| unit.to_power(*v, hours_per_step))
        .collect();
    if powers.is_empty() {
        return 1.0;
    }
    let avg_mw = powers.iter().sum::<f64>() / powers.len() as f64;
    let annual_twh = (Megawatts(avg_mw) * Hours(HOURS_PER_YEAR)).to_twh();
    let (target_twh, target_avg_mw) = demand_target(year);
    if (annual_twh - target_twh).abs() <= SCALING_TOLERANCE_TWH || avg_mw <= 0.0 {
        return 1.0;
    }
    let factor = target_avg_mw / avg_mw;
    for value in series.iter_mut().filter(|v| v.is_finite()) {
        *value *= factor;
    }
    info!(annual_twh, target_twh, factor, "demand rescaled to annual target");
    factor
}

/// Constant profile at the year's average target, used when the demand
/// provider is unavailable.
pub fn flat_profile(snapshots: &SnapshotSet, year: i32) -> (Vec<f64>, SeriesUnit) {
    let (_, avg_mw) = demand_target(year);
    let unit = unit_for(snapshots.step());
    let value = match unit {
        SeriesUnit::Power => avg_mw,
        SeriesUnit::EnergyPerPeriod => avg_mw * snapshots.hours_per_step(),
    };
    (vec![value; snapshots.len()], unit)
}

/// Per-load demand matrix `series[load][t]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandFrame {
    pub unit: SeriesUnit,
    pub loads: Vec<String>,
    pub sizes: Vec<LoadSize>,
    series: Vec<Vec<Option<f64>>>,
}

impl DemandFrame {
    pub fn series(&self, load: usize) -> Vec<f64> {
        self.series
            .get(load)
            .map(|s| s.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .unwrap_or_default()
    }

    pub fn snapshot_len(&self) -> usize {
        self.series.first().map(Vec::len).unwrap_or(0)
    }
}

/// Split an aggregate series across `loads` with random size categories and
/// a smooth temporal modulation. Weights are floored at 0.01 and normalised
/// per snapshot, so the per-snapshot sum over loads equals the aggregate.
pub fn distribute(
    aggregate: &[f64],
    unit: SeriesUnit,
    loads: &[String],
    rng: &mut SimRng,
) -> DemandFrame {
    let sizes: Vec<LoadSize> = loads
        .iter()
        .map(|_| LoadSize::ALL[rng.choose_weighted(&LoadSize::PROBABILITIES)])
        .collect();
    let base: Vec<f64> = sizes.iter().map(|s| s.draw_base_weight(rng)).collect();

    let mut series = vec![Vec::with_capacity(aggregate.len()); loads.len()];
    let mut weights = vec![0.0; loads.len()];
    for (t, total) in aggregate.iter().enumerate() {
        let tf = t as f64;
        let daily = 0.7 + 0.6 * (tf / 20.0).sin();
        for (i, weight) in weights.iter_mut().enumerate() {
            let local = 0.6 + 0.8 * (tf / 10.0 + 0.5 * i as f64).sin();
            let jitter = 0.7 + 0.6 * rng.uniform();
            *weight = (base[i] * daily * local * jitter).max(0.01);
        }
        let sum: f64 = weights.iter().sum();
        for (i, weight) in weights.iter().enumerate() {
            let value = total * weight / sum;
            series[i].push(value.is_finite().then_some(value));
        }
    }

    DemandFrame {
        unit,
        loads: loads.to_vec(),
        sizes,
        series,
    }
}
