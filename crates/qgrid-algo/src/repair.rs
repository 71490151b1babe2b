//! Solvability repair: temporal alignment, connectivity and capacity.
//!
//! Each repair step is idempotent. Synthetic elements carry deterministic
//! names (`virtual_{bus}_{reference}`, `emergency_gen_{YYYYMMDD}`) so that a
//! second pass finds them instead of adding duplicates.

use crate::loader::fallback_profile;
use crate::rng::SimRng;
use chrono::Duration;
use qgrid_core::{
    find_islands, BusId, Carrier, Diagnostics, Generator, Line, NetworkModel, QgridResult,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Rating of virtual links (effectively unbounded).
pub const VIRTUAL_LINE_S_NOM: f64 = 1e6;
/// Emergency units are sized at this multiple of the shortfall.
pub const CAPACITY_MARGIN: f64 = 1.1;
const CAPACITY_TOLERANCE_MW: f64 = 1e-6;

/// Corrective actions taken by one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub reference_bus: Option<String>,
    pub generator_values_filled: usize,
    pub load_values_filled: usize,
    pub virtual_lines: Vec<String>,
    pub emergency_generators: Vec<String>,
    pub deficit_snapshots: usize,
    pub peak_shortfall_mw: f64,
}

impl RepairReport {
    pub fn is_noop(&self) -> bool {
        self.generator_values_filled == 0
            && self.load_values_filled == 0
            && self.virtual_lines.is_empty()
            && self.emergency_generators.is_empty()
            && self.deficit_snapshots == 0
    }
}

#[derive(Debug, Clone)]
pub struct SolvabilityRepairer {
    pub capacity_margin: f64,
    pub virtual_s_nom: f64,
}

impl Default for SolvabilityRepairer {
    fn default() -> Self {
        Self {
            capacity_margin: CAPACITY_MARGIN,
            virtual_s_nom: VIRTUAL_LINE_S_NOM,
        }
    }
}

impl SolvabilityRepairer {
    /// Run alignment, connectivity and capacity repair in that order.
    pub fn repair(
        &self,
        mut network: NetworkModel,
        rng: &mut SimRng,
        diagnostics: &mut Diagnostics,
    ) -> QgridResult<(NetworkModel, RepairReport)> {
        let mut report = RepairReport::default();
        self.align(&mut network, rng, diagnostics, &mut report);
        self.connect(&mut network, diagnostics, &mut report)?;
        self.ensure_capacity(&mut network, diagnostics, &mut report)?;
        if report.is_noop() {
            info!("network already solvable");
        } else {
            info!(
                generator_values = report.generator_values_filled,
                load_values = report.load_values_filled,
                virtual_lines = report.virtual_lines.len(),
                emergency_generators = report.emergency_generators.len(),
                "solvability repair applied"
            );
        }
        Ok((network, report))
    }

    /// Resize every series to the snapshot count and fill missing values.
    pub fn align(
        &self,
        network: &mut NetworkModel,
        rng: &mut SimRng,
        diagnostics: &mut Diagnostics,
        report: &mut RepairReport,
    ) {
        let snapshots = network.snapshots().clone();
        let n = snapshots.len();

        for generator in network.generators_mut() {
            let mut filled = 0;
            generator.p_max_pu.resize(n, f64::NAN);
            if generator.p_max_pu.iter().all(|v| !v.is_finite()) && n > 0 {
                generator.p_max_pu = fallback_profile(generator.carrier, &snapshots, rng);
                filled += n;
            } else {
                filled += fill_gaps(&mut generator.p_max_pu);
            }
            for value in &mut generator.p_max_pu {
                *value = value.clamp(0.0, 1.0);
            }

            generator.marginal_cost.resize(n, f64::NAN);
            if generator.marginal_cost.iter().all(|v| !v.is_finite()) && n > 0 {
                generator.marginal_cost = vec![generator.carrier.default_marginal_cost(); n];
                filled += n;
            } else {
                filled += fill_gaps(&mut generator.marginal_cost);
            }

            if filled > 0 {
                warn!(generator = %generator.name, filled, "generator series realigned");
                diagnostics.add_warning_with_entity(
                    "alignment",
                    &format!("{filled} missing availability/cost values filled"),
                    &generator.name,
                );
                report.generator_values_filled += filled;
            }
        }

        for load in network.loads_mut() {
            load.p_set.resize(n, f64::NAN);
            let filled = fill_load(&mut load.p_set, &snapshots, rng);
            if filled > 0 {
                warn!(load = %load.name, filled, "load series realigned");
                diagnostics.add_warning_with_entity(
                    "alignment",
                    &format!("{filled} missing or negative demand values filled"),
                    &load.name,
                );
                report.load_values_filled += filled;
            }
        }
    }

    /// Link every island to the reference bus with a virtual line.
    pub fn connect(
        &self,
        network: &mut NetworkModel,
        diagnostics: &mut Diagnostics,
        report: &mut RepairReport,
    ) -> QgridResult<()> {
        let Some(reference) = reference_bus(network) else {
            return Ok(());
        };
        report.reference_bus = network.bus(reference).map(|b| b.name.clone());
        let islands = find_islands(network);
        if islands.is_connected() {
            return Ok(());
        }
        let reference_island = islands.island_of(reference);
        let reference_name = network
            .bus(reference)
            .map(|b| b.name.clone())
            .unwrap_or_default();

        for island in &islands.islands {
            if Some(island.island_id) == reference_island {
                continue;
            }
            let Some(anchor) = island.buses.first().and_then(|id| network.bus(*id)) else {
                continue;
            };
            let name = format!("virtual_{}_{}", anchor.name, reference_name);
            if network.has_line(&name) {
                continue;
            }
            let mut line = Line::new(name.clone(), anchor.name.clone(), reference_name.clone())
                .with_s_nom(self.virtual_s_nom);
            line.is_virtual = true;
            network.add_line(line)?;
            warn!(line = %name, buses = island.buses.len(), "island linked to reference bus");
            diagnostics.add_warning_with_entity(
                "connectivity",
                &format!(
                    "island of {} bus(es) linked to '{}' by a virtual line",
                    island.buses.len(),
                    reference_name
                ),
                &name,
            );
            report.virtual_lines.push(name);
        }
        Ok(())
    }

    /// Add per-day emergency capacity wherever available capacity falls
    /// short of demand.
    pub fn ensure_capacity(
        &self,
        network: &mut NetworkModel,
        diagnostics: &mut Diagnostics,
        report: &mut RepairReport,
    ) -> QgridResult<()> {
        let Some(reference) = reference_bus(network) else {
            return Ok(());
        };
        let n = network.snapshots().len();
        for t in 0..n {
            let demand = network.demand_at(t);
            let capacity = network.available_capacity_at(t);
            if capacity + CAPACITY_TOLERANCE_MW >= demand {
                continue;
            }
            let shortfall = demand - capacity;
            let Some(date) = network.snapshots().date(t) else {
                continue;
            };
            let name = format!("emergency_gen_{}", date.format("%Y%m%d"));

            let id = match network.generator_id(&name) {
                Some(id) => id,
                None => {
                    let generator = Generator::new(name.clone(), reference, Carrier::Emergency, 0.0)
                        .with_availability(vec![0.0; n])
                        .with_cost(vec![Carrier::Emergency.default_marginal_cost(); n]);
                    report.emergency_generators.push(name.clone());
                    network.add_generator(generator)?
                }
            };
            if let Some(generator) = network.generator_mut(id) {
                let without = capacity - generator.available_at(t);
                let needed = self.capacity_margin * (demand - without);
                generator.p_nom = generator.p_nom.max(needed);
                if let Some(pu) = generator.p_max_pu.get_mut(t) {
                    *pu = 1.0;
                }
            }
            report.deficit_snapshots += 1;
            report.peak_shortfall_mw = report.peak_shortfall_mw.max(shortfall);
            diagnostics.add_warning_at_snapshot(
                "capacity",
                &format!("capacity short by {shortfall:.1} MW; covered by {name}"),
                t,
            );
        }
        if report.deficit_snapshots > 0 {
            warn!(
                snapshots = report.deficit_snapshots,
                peak_mw = report.peak_shortfall_mw,
                "emergency capacity added"
            );
        }
        Ok(())
    }
}

/// Bus that anchors virtual links and emergency capacity: the first bus
/// with both load and generation, else the first with generation, else the
/// first bus.
pub fn reference_bus(network: &NetworkModel) -> Option<BusId> {
    let buses = network.buses();
    buses
        .iter()
        .find(|b| network.bus_has_load(b.id) && network.bus_has_generation(b.id))
        .or_else(|| buses.iter().find(|b| network.bus_has_generation(b.id)))
        .or_else(|| buses.first())
        .map(|b| b.id)
}

/// Forward-fill then back-fill non-finite values. Returns how many were filled.
fn fill_gaps(series: &mut [f64]) -> usize {
    let mut filled = 0;
    let mut last = None;
    for value in series.iter_mut() {
        if value.is_finite() {
            last = Some(*value);
        } else if let Some(prev) = last {
            *value = prev;
            filled += 1;
        }
    }
    let mut next = None;
    for value in series.iter_mut().rev() {
        if value.is_finite() {
            next = Some(*value);
        } else if let Some(following) = next {
            *value = following;
            filled += 1;
        }
    }
    filled
}

/// Fill missing demand from the same time one week earlier, else from the
/// series mean plus `N(0, 0.1·σ)` noise clamped to three deviations.
/// Negative values are floored at zero.
fn fill_load(series: &mut [f64], snapshots: &qgrid_core::SnapshotSet, rng: &mut SimRng) -> usize {
    let known: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    let mean = if known.is_empty() {
        0.0
    } else {
        known.iter().sum::<f64>() / known.len() as f64
    };
    let std = if known.len() > 1 {
        (known.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (known.len() - 1) as f64).sqrt()
    } else {
        0.0
    };
    let noise_sd = 0.1 * std;

    let mut filled = 0;
    for t in 0..series.len() {
        let value = series[t];
        if value.is_finite() {
            if value < 0.0 {
                series[t] = 0.0;
                filled += 1;
            }
            continue;
        }
        let week_before = snapshots
            .get(t)
            .and_then(|ts| snapshots.position(ts - Duration::days(7)))
            .map(|prior| series[prior])
            .filter(|v| v.is_finite());
        series[t] = match week_before {
            Some(prior) => prior,
            None => {
                let noise = rng.normal(0.0, noise_sd).clamp(-3.0 * noise_sd, 3.0 * noise_sd);
                (mean + noise).max(0.0)
            }
        };
        filled += 1;
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use qgrid_core::{Bus, BusRole, Load, SeriesUnit, SnapshotSet, TimeStep, TimeWindow};

    fn snapshots(days: i64, step: TimeStep) -> SnapshotSet {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = start + Duration::days(days) - step.duration();
        SnapshotSet::from_window(&TimeWindow::new(start, end, step).unwrap())
    }

    #[test]
    fn gaps_fill_forward_then_backward() {
        let mut series = vec![f64::NAN, 2.0, f64::NAN, 4.0, f64::NAN];
        assert_eq!(fill_gaps(&mut series), 3);
        assert_eq!(series, vec![2.0, 2.0, 2.0, 4.0, 4.0]);
    }

    #[test]
    fn load_gap_uses_prior_week() {
        let snaps = snapshots(14, TimeStep::Daily);
        let mut series: Vec<f64> = (0..14).map(|d| 100.0 + d as f64).collect();
        series[9] = f64::NAN;
        series[10] = -5.0;
        let filled = fill_load(&mut series, &snaps, &mut SimRng::seeded(1));
        assert_eq!(filled, 2);
        assert_eq!(series[9], 102.0);
        assert_eq!(series[10], 0.0);
    }

    #[test]
    fn load_gap_without_history_stays_near_mean() {
        let snaps = snapshots(3, TimeStep::Daily);
        let mut series = vec![f64::NAN, 100.0, 120.0];
        fill_load(&mut series, &snaps, &mut SimRng::seeded(5));
        let std = (200.0_f64).sqrt();
        assert!((series[0] - 110.0).abs() <= 0.3 * std + 1e-9);
    }

    #[test]
    fn reference_prefers_bus_with_load_and_generation() {
        let mut network = NetworkModel::new("n", snapshots(1, TimeStep::Daily));
        let a = network.add_bus(Bus::new("A", BusRole::Prod));
        let b = network.add_bus(Bus::new("B", BusRole::Conso));
        network.add_generator(Generator::new("g", a, Carrier::Wind, 10.0)).unwrap();
        assert_eq!(reference_bus(&network), Some(a));
        network.add_generator(Generator::new("h", b, Carrier::Thermal, 10.0)).unwrap();
        network.add_load(Load::new("l", b).with_profile(vec![1.0], SeriesUnit::Power)).unwrap();
        assert_eq!(reference_bus(&network), Some(b));
    }

    #[test]
    fn capacity_shortfall_adds_daily_emergency_unit() {
        let mut network = NetworkModel::new("n", snapshots(1, TimeStep::Hourly));
        let a = network.add_bus(Bus::new("A", BusRole::Prod));
        network
            .add_generator(
                Generator::new("wind", a, Carrier::Wind, 100.0).with_availability(vec![0.3; 24]),
            )
            .unwrap();
        let mut profile = vec![20.0; 24];
        profile[5] = 50.0;
        profile[6] = 40.0;
        network.add_load(Load::new("l", a).with_profile(profile, SeriesUnit::Power)).unwrap();

        let repairer = SolvabilityRepairer::default();
        let mut diag = Diagnostics::new();
        let (network, report) = repairer
            .repair(network, &mut SimRng::seeded(0), &mut diag)
            .unwrap();
        assert_eq!(report.emergency_generators, vec!["emergency_gen_20240304".to_string()]);
        assert_eq!(report.deficit_snapshots, 2);
        let id = network.generator_id("emergency_gen_20240304").unwrap();
        let emergency = network.generator(id).unwrap();
        assert!((emergency.p_nom - 22.0).abs() < 1e-9);
        assert_eq!(emergency.p_max_pu[5], 1.0);
        assert_eq!(emergency.p_max_pu[6], 1.0);
        assert_eq!(emergency.p_max_pu[0], 0.0);
        for t in 0..24 {
            assert!(network.available_capacity_at(t) + 1e-9 >= network.demand_at(t));
        }

        let (again, second) = repairer.repair(network, &mut SimRng::seeded(0), &mut diag).unwrap();
        assert!(second.is_noop());
        assert_eq!(again.generators().len(), 2);
    }
}
