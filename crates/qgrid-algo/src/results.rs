//! Energy and cost aggregation of a dispatch.
//!
//! Power values are converted to energy with the step duration (×24 for
//! daily snapshots) unless the result is already energy-valued.

use qgrid_core::{
    Carrier, CarrierProduction, Diagnostics, DispatchResult, EmergencySummary, Hours,
    MegawattHours, Megawatts, NetworkModel, ProductionSummary,
};
use tracing::{debug, info, warn};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn summarize(
        &self,
        network: &NetworkModel,
        result: &DispatchResult,
        diagnostics: &mut Diagnostics,
    ) -> ProductionSummary {
        let hours = result.snapshots.hours_per_step();
        let n = result.p.len();
        let energy = |power: f64| result.unit.to_energy(power, hours);
        let generators = network.generators();

        let mut by_carrier = Vec::new();
        let mut total_cost = 0.0;
        for carrier in Carrier::ALL {
            let members: Vec<usize> = generators
                .iter()
                .enumerate()
                .filter(|(g, gen)| gen.carrier == carrier && *g < result.generator_names.len())
                .map(|(g, _)| g)
                .collect();
            if members.is_empty() {
                continue;
            }
            let installed_mw: f64 = members.iter().map(|&g| generators[g].p_nom.max(0.0)).sum();
            let mut energy_mwh = 0.0;
            let mut cost = 0.0;
            let mut available = 0.0;
            for t in 0..n {
                for &g in &members {
                    let e = energy(result.p[t].get(g).copied().unwrap_or(0.0));
                    energy_mwh += e;
                    cost += e * generators[g].cost_at(t);
                    available += generators[g].available_at(t);
                }
            }
            let mean_available_mw = if n > 0 { available / n as f64 } else { 0.0 };
            let horizon_hours = n as f64 * hours;
            let capacity_factor = if installed_mw > 0.0 && horizon_hours > 0.0 {
                energy_mwh / (installed_mw * horizon_hours)
            } else {
                0.0
            };
            let zero_dispatch =
                carrier != Carrier::Emergency && installed_mw > 0.0 && energy_mwh <= EPS;
            total_cost += cost;
            by_carrier.push(CarrierProduction {
                carrier,
                generators: members.len(),
                installed_mw,
                mean_available_mw,
                energy_mwh,
                share_pct: 0.0,
                capacity_factor,
                cost,
                zero_dispatch,
            });
        }

        let total_energy_mwh: f64 = by_carrier.iter().map(|c| c.energy_mwh).sum();
        for row in &mut by_carrier {
            row.share_pct = if total_energy_mwh > 0.0 {
                100.0 * row.energy_mwh / total_energy_mwh
            } else {
                0.0
            };
            debug!(
                carrier = %row.carrier,
                installed_mw = row.installed_mw,
                mean_available_mw = row.mean_available_mw,
                energy_mwh = row.energy_mwh,
                capacity_factor = row.capacity_factor,
                share_pct = row.share_pct,
                "carrier production"
            );
            if row.zero_dispatch {
                warn!(
                    carrier = %row.carrier,
                    installed_mw = row.installed_mw,
                    "installed capacity produced no energy"
                );
                diagnostics.add_warning_with_entity(
                    "results",
                    &format!(
                        "{:.1} MW installed but nothing dispatched; check availability data",
                        row.installed_mw
                    ),
                    row.carrier.as_str(),
                );
            }
        }

        let emergency = emergency_summary(network, result, hours);
        if emergency.energy_mwh > 0.0 {
            warn!(
                energy_mwh = emergency.energy_mwh,
                peak_mw = emergency.peak_mw,
                snapshots = emergency.snapshots_used,
                "emergency units dispatched"
            );
        }

        let sum_of = |pred: fn(Carrier) -> bool| -> f64 {
            by_carrier
                .iter()
                .filter(|c| pred(c.carrier))
                .map(|c| c.energy_mwh)
                .sum()
        };
        let pilotable_mwh = sum_of(Carrier::is_pilotable);
        let non_pilotable_mwh = sum_of(Carrier::is_fatale);
        let total_demand_mwh = result
            .demand
            .iter()
            .map(|d| Megawatts(*d) * Hours(hours))
            .sum::<MegawattHours>()
            .0;

        info!(
            total_energy_mwh,
            total_demand_mwh,
            total_cost,
            "production summarised"
        );

        ProductionSummary {
            step: result.snapshots.step(),
            snapshots: n,
            total_energy_mwh,
            total_demand_mwh,
            total_cost,
            pilotable_mwh,
            non_pilotable_mwh,
            by_carrier,
            emergency,
            max_balance_error_mw: result.max_balance_error(),
        }
    }
}

fn emergency_summary(
    network: &NetworkModel,
    result: &DispatchResult,
    hours: f64,
) -> EmergencySummary {
    let members: Vec<usize> = network
        .generators()
        .iter()
        .enumerate()
        .filter(|(_, g)| g.carrier == Carrier::Emergency)
        .map(|(g, _)| g)
        .collect();
    let mut summary = EmergencySummary {
        generators: members.len(),
        ..EmergencySummary::default()
    };
    for row in &result.p {
        let power: f64 = members.iter().map(|&g| row.get(g).copied().unwrap_or(0.0)).sum();
        if power > EPS {
            summary.snapshots_used += 1;
        }
        summary.peak_mw = summary.peak_mw.max(power);
        summary.energy_mwh += result.unit.to_energy(power, hours);
    }
    summary
}
