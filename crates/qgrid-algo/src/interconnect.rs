//! Import/export sizing against historical consumption.
//!
//! The gap between the historical annual energy and the simulated demand is
//! spread as a constant power `Pmax` over the horizon, searched by
//! bisection between the smallest and largest per-step import need
//! (`demand − wind/solar/run-of-river availability`). A positive `Pmax`
//! becomes an import generator at the border bus; a negative one becomes an
//! export load.

use crate::loader::demand::unit_for;
use qgrid_core::{Carrier, Generator, Load, NetworkModel, QgridResult, SeriesUnit};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const BORDER_BUS: &str = "Stanstead";
pub const BISECTION_TOLERANCE: f64 = 0.1;
pub const BISECTION_MAX_ITERATIONS: usize = 100;

const HISTORICAL_MWH: [(i32, f64); 3] = [(2022, 210.8e6), (2023, 205.2e6), (2024, 208.0e6)];

/// Carriers whose output counts against the import need.
const UNCONTROLLED: [Carrier; 3] = [Carrier::Wind, Carrier::Solar, Carrier::HydroRunOfRiver];

/// Historical annual consumption (MWh); years without data use the mean.
pub fn historical_consumption_mwh(year: i32) -> f64 {
    HISTORICAL_MWH
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, e)| *e)
        .unwrap_or_else(|| {
            HISTORICAL_MWH.iter().map(|(_, e)| e).sum::<f64>() / HISTORICAL_MWH.len() as f64
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterconnectionPlan {
    pub year: i32,
    pub historical_mwh: f64,
    pub simulated_mwh: f64,
    pub delta_mwh: f64,
    /// Positive: import capacity. Negative: export demand (MW).
    pub p_max_mw: f64,
    pub iterations: usize,
}

/// Size the interconnection for the network's horizon.
pub fn plan_interconnection(network: &NetworkModel) -> InterconnectionPlan {
    let snapshots = network.snapshots();
    let year = snapshots.year().unwrap_or(0);
    let hours = snapshots.hours_per_step();
    let total_hours = snapshots.total_hours();

    let demand = network.demand_series();
    let simulated_mwh: f64 = demand.iter().map(|d| d * hours).sum();
    let historical_mwh = historical_consumption_mwh(year);
    let delta_mwh = historical_mwh - simulated_mwh;

    let import_need: Vec<f64> = demand
        .iter()
        .enumerate()
        .map(|(t, d)| {
            let uncontrolled: f64 = network
                .generators()
                .iter()
                .filter(|g| UNCONTROLLED.contains(&g.carrier))
                .map(|g| g.available_at(t))
                .sum();
            d - uncontrolled
        })
        .collect();

    let (p_max_mw, iterations) = bisect(&import_need, total_hours, delta_mwh);
    info!(year, delta_mwh, p_max_mw, iterations, "interconnection sized");
    InterconnectionPlan {
        year,
        historical_mwh,
        simulated_mwh,
        delta_mwh,
        p_max_mw,
        iterations,
    }
}

/// Solve `p × total_hours ≈ target` for `p` within the range of `bounds`.
fn bisect(bounds: &[f64], total_hours: f64, target: f64) -> (f64, usize) {
    if bounds.is_empty() || total_hours <= 0.0 {
        return (0.0, 0);
    }
    let mut lo = bounds.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = bounds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut p = (lo + hi) / 2.0;
    let mut iterations = 0;
    while iterations < BISECTION_MAX_ITERATIONS {
        iterations += 1;
        let total = p * total_hours;
        if (total - target).abs() < BISECTION_TOLERANCE {
            break;
        }
        if total > target {
            hi = p;
        } else {
            lo = p;
        }
        p = (lo + hi) / 2.0;
    }
    (p, iterations)
}

/// Attach the planned import generator (`import_{bus}`) or export load
/// (`export_{bus}`) at the border bus, falling back to the first bus.
/// Returns the element name, or `None` when the network has no bus.
pub fn attach_interconnection(
    network: &mut NetworkModel,
    plan: &InterconnectionPlan,
) -> QgridResult<Option<String>> {
    let bus = match network.bus_id(BORDER_BUS) {
        Some(id) => id,
        None => match network.buses().first() {
            Some(first) => {
                warn!(
                    border = BORDER_BUS,
                    fallback = %first.name,
                    "border bus missing; using first bus"
                );
                first.id
            }
            None => return Ok(None),
        },
    };
    let bus_name = network.bus(bus).map(|b| b.name.clone()).unwrap_or_default();
    let n = network.snapshots().len();

    if plan.p_max_mw >= 0.0 {
        let name = format!("import_{bus_name}");
        if network.generator_id(&name).is_none() {
            network.add_generator(
                Generator::new(name.clone(), bus, Carrier::Import, plan.p_max_mw)
                    .with_availability(vec![1.0; n])
                    .with_cost(vec![Carrier::Import.default_marginal_cost(); n]),
            )?;
        }
        Ok(Some(name))
    } else {
        let name = format!("export_{bus_name}");
        let unit = unit_for(network.snapshots().step());
        let magnitude = plan.p_max_mw.abs();
        let value = match unit {
            SeriesUnit::Power => magnitude,
            SeriesUnit::EnergyPerPeriod => magnitude * network.snapshots().hours_per_step(),
        };
        network.add_load(Load::new(name.clone(), bus).with_profile(vec![value; n], unit))?;
        Ok(Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgrid_core::{Bus, BusRole, SnapshotSet};

    #[test]
    fn historical_table_and_mean() {
        assert_eq!(historical_consumption_mwh(2023), 205.2e6);
        let mean = (210.8e6 + 205.2e6 + 208.0e6) / 3.0;
        assert!((historical_consumption_mwh(2030) - mean).abs() < 1e-3);
    }

    #[test]
    fn bisection_converges_inside_bounds() {
        let (p, iterations) = bisect(&[0.0, 100.0], 10.0, 420.0);
        assert!((p * 10.0 - 420.0).abs() < BISECTION_TOLERANCE);
        assert!(iterations <= BISECTION_MAX_ITERATIONS);
    }

    #[test]
    fn bisection_clamps_to_bound() {
        let (p, _) = bisect(&[-5.0, 20.0], 10.0, 1e9);
        assert!((p - 20.0).abs() < 1e-6);
    }

    #[test]
    fn negative_plan_adds_export_load() {
        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut network = NetworkModel::new("n", SnapshotSet::from_timestamps(vec![t0]).unwrap());
        network.add_bus(Bus::new("Montreal", BusRole::Conso));
        network.add_bus(Bus::new(BORDER_BUS, BusRole::Line));
        let plan = InterconnectionPlan {
            year: 2024,
            historical_mwh: 0.0,
            simulated_mwh: 0.0,
            delta_mwh: -10.0,
            p_max_mw: -12.5,
            iterations: 1,
        };
        let name = attach_interconnection(&mut network, &plan).unwrap();
        assert_eq!(name.as_deref(), Some("export_Stanstead"));
        assert_eq!(network.demand_at(0), 12.5);
    }
}
