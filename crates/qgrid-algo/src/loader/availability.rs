//! Availability (`p_max_pu`) series for generators.

use crate::rng::SimRng;
use chrono::Datelike;
use qgrid_core::{Carrier, SnapshotSet};
use qgrid_io::ProductionSample;
use std::f64::consts::PI;

/// Default availability of a carrier at every snapshot, used when no
/// production data can be obtained.
///
/// Run-of-river follows the seasonal flow with noise; reservoir and thermal
/// units get a small random derating; the rest are constant.
pub fn fallback_profile(carrier: Carrier, snapshots: &SnapshotSet, rng: &mut SimRng) -> Vec<f64> {
    snapshots
        .iter()
        .map(|ts| match carrier {
            Carrier::HydroRunOfRiver => {
                let month = ts.month() as f64;
                let seasonal = 0.3 * (PI * (month - 3.0) / 6.0).sin();
                (0.7 + seasonal + 0.1 * rng.normal(0.0, 1.0)).clamp(0.5, 1.0)
            }
            Carrier::HydroReservoir => (0.95 + 0.05 * rng.uniform()).min(1.0),
            Carrier::Thermal => (0.90 + 0.05 * rng.uniform()).min(1.0),
            other => other.fallback_availability(),
        })
        .collect()
}

/// Convert production samples into per-snapshot availability.
///
/// Samples are averaged inside each snapshot interval and divided by
/// `p_nom`. Snapshots with no sample take the value of `fallback` at the
/// same index. Returns the series and the number of snapshots filled from
/// the fallback.
pub fn availability_from_production(
    samples: &[ProductionSample],
    p_nom: f64,
    snapshots: &SnapshotSet,
    fallback: &[f64],
) -> (Vec<f64>, usize) {
    let n = snapshots.len();
    let mut sums = vec![0.0; n];
    let mut counts = vec![0usize; n];
    for (ts, mw) in samples {
        if !mw.is_finite() {
            continue;
        }
        if let Some(t) = snapshots.bucket(*ts) {
            sums[t] += mw;
            counts[t] += 1;
        }
    }

    let mut filled = 0;
    let series: Vec<f64> = (0..n)
        .map(|t| {
            if counts[t] > 0 && p_nom > 0.0 {
                (sums[t] / counts[t] as f64 / p_nom).clamp(0.0, 1.0)
            } else {
                filled += 1;
                fallback.get(t).copied().unwrap_or(1.0)
            }
        })
        .collect();
    (series, filled)
}
