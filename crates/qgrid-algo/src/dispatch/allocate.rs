//! Single-snapshot merit-order allocation.

use super::backend::StepView;
use qgrid_core::Carrier;

/// Share of demand reserved for the reservoir fleet before any other tier.
pub const RESERVOIR_MIN_SHARE: f64 = 0.2;
const EPS: f64 = 1e-9;

/// Outcome of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAllocation {
    /// Power per generator (MW)
    pub p: Vec<f64>,
    /// Demand left after every tier (MW)
    pub residual: f64,
    /// Reservoir power reserved by the minimum-contribution rule (MW)
    pub reservoir_minimum: f64,
}

/// Allocate `demand` (MW) over the generators of `view`:
///
/// 1. reservoir minimum `min(share × demand, reservoir capacity)`
/// 2. fatale carriers (wind, solar, run-of-river, nuclear)
/// 3. remaining reservoir headroom
/// 4. thermal, import, emergency
///
/// Within a tier generators are called in the view's cost order, each up to
/// its remaining headroom.
pub fn allocate_step(view: &StepView<'_>, demand: f64, reservoir_share: f64) -> StepAllocation {
    let mut p = vec![0.0; view.capacity.len()];
    let demand = if demand.is_finite() { demand.max(0.0) } else { 0.0 };
    let mut remaining = demand;

    let reservoir = view.tier(Carrier::HydroReservoir);
    let reservoir_target =
        (reservoir_share * demand).min(view.tier_capacity(Carrier::HydroReservoir));
    let reservoir_minimum = fill(reservoir, view.capacity, &mut p, reservoir_target);
    remaining -= reservoir_minimum;

    for carrier in Carrier::FATALE {
        remaining -= fill(view.tier(carrier), view.capacity, &mut p, remaining);
    }
    remaining -= fill(reservoir, view.capacity, &mut p, remaining);
    for carrier in Carrier::BACKUP {
        remaining -= fill(view.tier(carrier), view.capacity, &mut p, remaining);
    }

    StepAllocation {
        p,
        residual: remaining.max(0.0),
        reservoir_minimum,
    }
}

/// Fill up to `amount` from `tier` in order; returns the amount placed.
fn fill(tier: &[usize], capacity: &[f64], p: &mut [f64], amount: f64) -> f64 {
    if amount <= EPS {
        return 0.0;
    }
    let mut left = amount;
    for &g in tier {
        if left <= EPS {
            break;
        }
        let headroom = capacity[g] - p[g];
        if headroom <= 0.0 {
            continue;
        }
        let take = headroom.min(left);
        p[g] += take;
        left -= take;
    }
    amount - left
}
