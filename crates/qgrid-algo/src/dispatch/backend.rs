//! Per-snapshot capacity and merit-order views.
//!
//! A backend answers two questions for a snapshot `t`: how much each
//! generator can produce, and in which order the generators of each carrier
//! tier are called. [`SequentialBackend`] computes both on demand;
//! [`VectorizedBackend`] precomputes the whole horizon up front. Both use
//! the same capacity expression and the same stable cost sort, so their
//! views are identical.

use qgrid_core::{Carrier, NetworkModel};

/// Capacity and sorted tiers of one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    /// `p_nom × p_max_pu` per generator (MW)
    pub capacity: &'a [f64],
    /// Generator indices per carrier, indexed by [`Carrier::priority`],
    /// each sorted by ascending marginal cost
    pub tiers: &'a [Vec<usize>],
}

impl StepView<'_> {
    pub fn tier(&self, carrier: Carrier) -> &[usize] {
        self.tiers
            .get(carrier.priority())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Aggregate capacity of one carrier.
    pub fn tier_capacity(&self, carrier: Carrier) -> f64 {
        self.tier(carrier).iter().map(|&g| self.capacity[g]).sum()
    }
}

pub trait DispatchBackend {
    fn snapshot_count(&self) -> usize;
    fn step(&mut self, t: usize) -> StepView<'_>;
}

/// Generator indices grouped by carrier, in data-loading order.
fn carrier_groups(network: &NetworkModel) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); Carrier::ALL.len()];
    for (idx, generator) in network.generators().iter().enumerate() {
        groups[generator.carrier.priority()].push(idx);
    }
    groups
}

/// Stable ascending sort by cost; equal costs keep loading order.
fn sort_by_cost(indices: &mut [usize], costs: &[f64]) {
    indices.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
}

/// Computes each snapshot's view when asked.
pub struct SequentialBackend<'n> {
    network: &'n NetworkModel,
    groups: Vec<Vec<usize>>,
    capacity: Vec<f64>,
    costs: Vec<f64>,
    tiers: Vec<Vec<usize>>,
}

impl<'n> SequentialBackend<'n> {
    pub fn new(network: &'n NetworkModel) -> Self {
        let n = network.generators().len();
        let groups = carrier_groups(network);
        Self {
            network,
            tiers: groups.clone(),
            groups,
            capacity: vec![0.0; n],
            costs: vec![0.0; n],
        }
    }
}

impl DispatchBackend for SequentialBackend<'_> {
    fn snapshot_count(&self) -> usize {
        self.network.snapshots().len()
    }

    fn step(&mut self, t: usize) -> StepView<'_> {
        for (g, generator) in self.network.generators().iter().enumerate() {
            self.capacity[g] = generator.available_at(t);
            self.costs[g] = generator.cost_at(t);
        }
        for (tier, group) in self.tiers.iter_mut().zip(&self.groups) {
            tier.clone_from(group);
            sort_by_cost(tier, &self.costs);
        }
        StepView {
            capacity: &self.capacity,
            tiers: &self.tiers,
        }
    }
}

/// Precomputes a `[t × g]` capacity matrix and every snapshot's sorted tiers.
pub struct VectorizedBackend {
    snapshots: usize,
    generators: usize,
    capacity: Vec<f64>,
    tiers: Vec<Vec<Vec<usize>>>,
}

impl VectorizedBackend {
    pub fn new(network: &NetworkModel) -> Self {
        let snapshots = network.snapshots().len();
        let generators = network.generators().len();
        let mut capacity = vec![0.0; snapshots * generators];
        let mut costs = vec![0.0; snapshots * generators];
        for (g, generator) in network.generators().iter().enumerate() {
            for t in 0..snapshots {
                capacity[t * generators + g] = generator.available_at(t);
                costs[t * generators + g] = generator.cost_at(t);
            }
        }

        let groups = carrier_groups(network);
        let tiers = (0..snapshots)
            .map(|t| {
                let row = &costs[t * generators..(t + 1) * generators];
                groups
                    .iter()
                    .map(|group| {
                        let mut tier = group.clone();
                        sort_by_cost(&mut tier, row);
                        tier
                    })
                    .collect()
            })
            .collect();

        Self {
            snapshots,
            generators,
            capacity,
            tiers,
        }
    }
}

impl DispatchBackend for VectorizedBackend {
    fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    fn step(&mut self, t: usize) -> StepView<'_> {
        let start = t * self.generators;
        StepView {
            capacity: &self.capacity[start..start + self.generators],
            tiers: &self.tiers[t],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgrid_core::{Bus, BusRole, Generator, SnapshotSet};

    fn network() -> NetworkModel {
        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let snaps =
            SnapshotSet::from_timestamps(vec![t0, t0 + chrono::Duration::hours(1)]).unwrap();
        let mut network = NetworkModel::new("n", snaps);
        let a = network.add_bus(Bus::new("A", BusRole::Prod));
        network
            .add_generator(
                Generator::new("r1", a, Carrier::HydroReservoir, 100.0).with_cost(vec![9.0, 6.0]),
            )
            .unwrap();
        network
            .add_generator(
                Generator::new("r2", a, Carrier::HydroReservoir, 50.0)
                    .with_cost(vec![7.0, f64::NAN]),
            )
            .unwrap();
        network
            .add_generator(
                Generator::new("r3", a, Carrier::HydroReservoir, 50.0).with_cost(vec![7.0, 6.0]),
            )
            .unwrap();
        network
    }

    #[test]
    fn tiers_sort_by_cost_with_stable_ties() {
        let network = network();
        let mut backend = SequentialBackend::new(&network);
        let view = backend.step(0);
        assert_eq!(view.tier(Carrier::HydroReservoir), &[1, 2, 0]);
        // NaN cost falls back to the 7.0 default
        let view = backend.step(1);
        assert_eq!(view.tier(Carrier::HydroReservoir), &[0, 2, 1]);
        assert_eq!(view.tier_capacity(Carrier::HydroReservoir), 200.0);
        assert!(view.tier(Carrier::Wind).is_empty());
    }

    #[test]
    fn backends_agree() {
        let network = network();
        let mut sequential = SequentialBackend::new(&network);
        let mut vectorized = VectorizedBackend::new(&network);
        for t in 0..2 {
            let a = sequential.step(t);
            let (cap, tiers) = (a.capacity.to_vec(), a.tiers.to_vec());
            let b = vectorized.step(t);
            assert_eq!(cap, b.capacity);
            assert_eq!(tiers, b.tiers);
        }
    }
}
