//! Merit-order dispatch without a solver.
//!
//! One allocation core ([`allocate_step`]) runs over a [`DispatchBackend`]:
//! the sequential backend builds each snapshot's view on the fly, the
//! vectorized backend precomputes them. Both produce identical matrices.
//!
//! Demand left after every tier beyond [`DispatchSettings::emergency_threshold_mw`]
//! is handed to a per-day `emergency_{YYYYMMDD}` unit created after the
//! allocation pass, so the balance invariant always holds and infeasibility
//! is never reported as an error.

pub mod allocate;
pub mod backend;

pub use allocate::{allocate_step, StepAllocation, RESERVOIR_MIN_SHARE};
pub use backend::{DispatchBackend, SequentialBackend, StepView, VectorizedBackend};

use qgrid_core::{
    BusRole, Carrier, Diagnostics, DispatchResult, Generator, NetworkModel, QgridError,
    QgridResult, SeriesUnit,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Sequential,
    Vectorized,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Sequential => f.write_str("sequential"),
            DispatchMode::Vectorized => f.write_str("vectorized"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = QgridError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sequential" | "loop" => Ok(DispatchMode::Sequential),
            "vectorized" | "vectorised" => Ok(DispatchMode::Vectorized),
            other => Err(QgridError::Config(format!("unknown dispatch mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchSettings {
    pub reservoir_min_share: f64,
    /// Residual above this is assigned to an emergency unit (MW)
    pub emergency_threshold_mw: f64,
    /// Emergency unit size relative to the residual it absorbs
    pub emergency_margin: f64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            reservoir_min_share: RESERVOIR_MIN_SHARE,
            emergency_threshold_mw: 1.0,
            emergency_margin: 1.2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeritOrderDispatcher {
    pub mode: DispatchMode,
    pub settings: DispatchSettings,
}

impl MeritOrderDispatcher {
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            mode,
            settings: DispatchSettings::default(),
        }
    }

    /// Dispatch every snapshot. Takes the network by value and returns it
    /// with any emergency units added.
    pub fn dispatch(
        &self,
        mut network: NetworkModel,
        diagnostics: &mut Diagnostics,
    ) -> QgridResult<(NetworkModel, DispatchResult)> {
        check_aligned(&network)?;
        let demand = network.demand_series();
        let allocations = match self.mode {
            DispatchMode::Sequential => {
                self.allocate_all(&mut SequentialBackend::new(&network), &demand)
            }
            DispatchMode::Vectorized => {
                self.allocate_all(&mut VectorizedBackend::new(&network), &demand)
            }
        };
        let result = self.finish(&mut network, demand, allocations, diagnostics)?;
        info!(
            mode = %self.mode,
            snapshots = result.snapshots.len(),
            generators = result.generator_names.len(),
            emergency_mwh = result.total_emergency_residual() * result.snapshots.hours_per_step(),
            "dispatch complete"
        );
        Ok((network, result))
    }

    /// Run the allocation core over a backend.
    pub fn allocate_all<B: DispatchBackend>(
        &self,
        backend: &mut B,
        demand: &[f64],
    ) -> Vec<StepAllocation> {
        (0..backend.snapshot_count())
            .map(|t| {
                let view = backend.step(t);
                let d = demand.get(t).copied().unwrap_or(0.0);
                allocate_step(&view, d, self.settings.reservoir_min_share)
            })
            .collect()
    }

    /// Assign residuals to emergency units and assemble the result matrix.
    fn finish(
        &self,
        network: &mut NetworkModel,
        demand: Vec<f64>,
        allocations: Vec<StepAllocation>,
        diagnostics: &mut Diagnostics,
    ) -> QgridResult<DispatchResult> {
        let n = network.snapshots().len();
        let mut p: Vec<Vec<f64>> = Vec::with_capacity(n);
        let mut emergency_residual = vec![0.0; n];
        let mut unserved = vec![0.0; n];
        let mut pending = Vec::new();

        for (t, allocation) in allocations.into_iter().enumerate() {
            if allocation.residual > self.settings.emergency_threshold_mw {
                pending.push((t, allocation.residual));
                emergency_residual[t] = allocation.residual;
            } else {
                unserved[t] = allocation.residual;
            }
            p.push(allocation.p);
        }

        if !pending.is_empty() {
            let Some(bus) = emergency_bus(network) else {
                diagnostics.add_error(
                    "dispatch",
                    "residual demand but no bus can host an emergency unit",
                );
                for (t, residual) in pending {
                    unserved[t] += residual;
                    emergency_residual[t] = 0.0;
                }
                return Ok(self.assemble(network, p, demand, emergency_residual, unserved));
            };
            for (t, residual) in pending {
                let Some(date) = network.snapshots().date(t) else {
                    continue;
                };
                let name = format!("emergency_{}", date.format("%Y%m%d"));
                let id = match network.generator_id(&name) {
                    Some(id) => id,
                    None => network.add_generator(
                        Generator::new(name.clone(), bus, Carrier::Emergency, 0.0)
                            .with_availability(vec![0.0; n])
                            .with_cost(vec![Carrier::Emergency.default_marginal_cost(); n]),
                    )?,
                };
                if let Some(generator) = network.generator_mut(id) {
                    generator.p_nom = generator
                        .p_nom
                        .max(self.settings.emergency_margin * residual);
                    if let Some(pu) = generator.p_max_pu.get_mut(t) {
                        *pu = 1.0;
                    }
                }
                let column = id.value();
                for row in p.iter_mut() {
                    if row.len() <= column {
                        row.resize(column + 1, 0.0);
                    }
                }
                p[t][column] += residual;
                warn!(
                    generator = %name,
                    residual_mw = residual,
                    snapshot = t,
                    "residual assigned to emergency unit"
                );
                diagnostics.add_warning_at_snapshot(
                    "dispatch",
                    &format!("{residual:.1} MW residual assigned to {name}"),
                    t,
                );
            }
        }

        Ok(self.assemble(network, p, demand, emergency_residual, unserved))
    }

    fn assemble(
        &self,
        network: &NetworkModel,
        mut p: Vec<Vec<f64>>,
        demand: Vec<f64>,
        emergency_residual: Vec<f64>,
        unserved: Vec<f64>,
    ) -> DispatchResult {
        let generators = network.generators().len();
        for row in p.iter_mut() {
            row.resize(generators, 0.0);
        }
        let n = network.snapshots().len();
        let lines = network.lines().len();
        let peak_unserved = unserved.iter().copied().fold(0.0, f64::max);
        if peak_unserved > 0.0 {
            debug!(peak_unserved, "sub-threshold residual left unserved");
        }
        DispatchResult {
            snapshots: network.snapshots().clone(),
            generator_names: network.generators().iter().map(|g| g.name.clone()).collect(),
            p,
            unit: SeriesUnit::Power,
            demand,
            emergency_residual,
            unserved,
            line_p0: vec![vec![0.0; lines]; n],
            line_q0: vec![vec![0.0; lines]; n],
        }
    }
}

/// Every generator and load series must span the snapshot index.
fn check_aligned(network: &NetworkModel) -> QgridResult<()> {
    let n = network.snapshots().len();
    if let Some(g) = network
        .generators()
        .iter()
        .find(|g| g.p_max_pu.len() != n || g.marginal_cost.len() != n)
    {
        return Err(QgridError::Validation(format!(
            "generator '{}' series not aligned to {n} snapshots; run solvability repair first",
            g.name
        )));
    }
    if let Some(l) = network.loads().iter().find(|l| l.p_set.len() != n) {
        return Err(QgridError::Validation(format!(
            "load '{}' series not aligned to {n} snapshots; run solvability repair first",
            l.name
        )));
    }
    Ok(())
}

/// First `prod` or `conso` bus, else the first bus.
fn emergency_bus(network: &NetworkModel) -> Option<qgrid_core::BusId> {
    network
        .buses()
        .iter()
        .find(|b| matches!(b.role, BusRole::Prod | BusRole::Conso))
        .or_else(|| network.buses().first())
        .map(|b| b.id)
}
