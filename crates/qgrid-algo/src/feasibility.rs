//! Pre-dispatch feasibility check. Purely diagnostic; nothing here fails a run.

use qgrid_core::{find_islands, Diagnostics, NetworkModel};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub installed_mw: f64,
    pub peak_demand_mw: f64,
    /// Smallest `available − demand` over the horizon (MW)
    pub min_margin_mw: f64,
    pub deficit_snapshots: usize,
    pub max_deficit_mw: f64,
    /// Islands (by bus names) that carry load but no generation
    pub islands_without_generation: Vec<Vec<String>>,
    /// Sum of `s_nom` over non-virtual lines (MVA)
    pub real_line_capacity_mva: f64,
    /// Names of series whose length differs from the snapshot count
    pub misaligned_series: Vec<String>,
}

impl FeasibilityReport {
    pub fn is_feasible(&self) -> bool {
        self.deficit_snapshots == 0
            && self.islands_without_generation.is_empty()
            && self.misaligned_series.is_empty()
    }
}

pub fn assess(network: &NetworkModel, diagnostics: &mut Diagnostics) -> FeasibilityReport {
    let n = network.snapshots().len();
    let mut report = FeasibilityReport {
        installed_mw: network.installed_capacity(),
        min_margin_mw: if n == 0 { 0.0 } else { f64::INFINITY },
        ..FeasibilityReport::default()
    };

    for t in 0..n {
        let demand = network.demand_at(t);
        let margin = network.available_capacity_at(t) - demand;
        report.peak_demand_mw = report.peak_demand_mw.max(demand);
        report.min_margin_mw = report.min_margin_mw.min(margin);
        if margin < 0.0 {
            report.deficit_snapshots += 1;
            report.max_deficit_mw = report.max_deficit_mw.max(-margin);
        }
    }

    let islands = find_islands(network);
    for island in islands.islands.iter().filter(|i| i.has_load && !i.has_generation) {
        let names: Vec<String> = island
            .buses
            .iter()
            .filter_map(|id| network.bus(*id).map(|b| b.name.clone()))
            .collect();
        warn!(buses = ?names, "island with load but no generation");
        diagnostics.add_warning(
            "connectivity",
            &format!("island {:?} has load but no generation", names),
        );
        report.islands_without_generation.push(names);
    }

    report.real_line_capacity_mva = network
        .lines()
        .iter()
        .filter(|l| !l.is_virtual)
        .map(|l| l.s_nom.max(0.0))
        .sum();
    if report.max_deficit_mw > 0.0 && report.real_line_capacity_mva < report.max_deficit_mw {
        diagnostics.add_warning(
            "capacity",
            &format!(
                "real line capacity {:.0} MVA below peak deficit {:.0} MW",
                report.real_line_capacity_mva, report.max_deficit_mw
            ),
        );
    }

    for generator in network.generators() {
        if generator.p_max_pu.len() != n || generator.marginal_cost.len() != n {
            report.misaligned_series.push(generator.name.clone());
        }
    }
    for load in network.loads() {
        if load.p_set.len() != n {
            report.misaligned_series.push(load.name.clone());
        }
    }
    if !report.misaligned_series.is_empty() {
        diagnostics.add_warning(
            "alignment",
            &format!("{} series not aligned to snapshots", report.misaligned_series.len()),
        );
    }

    if report.deficit_snapshots > 0 {
        warn!(
            snapshots = report.deficit_snapshots,
            max_deficit_mw = report.max_deficit_mw,
            "available capacity below demand"
        );
        diagnostics.add_warning(
            "capacity",
            &format!(
                "capacity below demand at {} snapshot(s), worst {:.1} MW",
                report.deficit_snapshots, report.max_deficit_mw
            ),
        );
    }
    info!(
        installed_mw = report.installed_mw,
        peak_demand_mw = report.peak_demand_mw,
        min_margin_mw = report.min_margin_mw,
        feasible = report.is_feasible(),
        "feasibility assessed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgrid_core::{Bus, BusRole, Carrier, Generator, Load, SeriesUnit, SnapshotSet};

    #[test]
    fn reports_unsupplied_island_and_deficit() {
        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut network = NetworkModel::new("n", SnapshotSet::from_timestamps(vec![t0]).unwrap());
        let a = network.add_bus(Bus::new("A", BusRole::Prod));
        let b = network.add_bus(Bus::new("B", BusRole::Conso));
        network.add_generator(Generator::new("g", a, Carrier::Thermal, 10.0)).unwrap();
        network.add_load(Load::new("l", b).with_profile(vec![25.0], SeriesUnit::Power)).unwrap();

        let mut diag = Diagnostics::new();
        let report = assess(&network, &mut diag);
        assert_eq!(report.islands_without_generation, vec![vec!["B".to_string()]]);
        assert_eq!(report.deficit_snapshots, 1);
        assert_eq!(report.max_deficit_mw, 15.0);
        assert!(!report.is_feasible());
        assert!(diag.warning_count() >= 2);
    }
}
