//! The [`NetworkModel`] container.
//!
//! Element arenas are append-only: handles stay valid for the lifetime of
//! the model and equal the element's insertion position, which is also the
//! data-loading order used to break cost ties during dispatch.

use crate::error::{QgridError, QgridResult};
use crate::time::SnapshotSet;
use crate::{
    Bus, BusId, BusRole, Carrier, Generator, GeneratorId, Line, LineId, LineType, Load, LoadId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    pub name: String,
    snapshots: SnapshotSet,
    buses: Vec<Bus>,
    line_types: Vec<LineType>,
    lines: Vec<Line>,
    generators: Vec<Generator>,
    loads: Vec<Load>,
    #[serde(skip)]
    bus_index: HashMap<String, BusId>,
    #[serde(skip)]
    line_index: HashMap<String, LineId>,
    #[serde(skip)]
    generator_index: HashMap<String, GeneratorId>,
    #[serde(skip)]
    load_index: HashMap<String, LoadId>,
}

impl NetworkModel {
    pub fn new(name: impl Into<String>, snapshots: SnapshotSet) -> Self {
        Self {
            name: name.into(),
            snapshots,
            buses: Vec::new(),
            line_types: Vec::new(),
            lines: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
            bus_index: HashMap::new(),
            line_index: HashMap::new(),
            generator_index: HashMap::new(),
            load_index: HashMap::new(),
        }
    }

    /// Restore a model serialized with [`NetworkModel::to_json_vec`].
    pub fn from_json_slice(bytes: &[u8]) -> QgridResult<Self> {
        let mut network: NetworkModel = serde_json::from_slice(bytes)?;
        network.rebuild_indexes()?;
        Ok(network)
    }

    pub fn to_json_vec(&self) -> QgridResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn rebuild_indexes(&mut self) -> QgridResult<()> {
        self.bus_index.clear();
        for (idx, bus) in self.buses.iter().enumerate() {
            if bus.id.value() != idx {
                return Err(QgridError::Parse(format!(
                    "bus '{}' stored at position {} has id {}",
                    bus.name,
                    idx,
                    bus.id.value()
                )));
            }
            self.bus_index.insert(bus.name.clone(), bus.id);
        }
        self.line_index = self
            .lines
            .iter()
            .map(|l| (l.name.clone(), l.id))
            .collect();
        self.generator_index = self
            .generators
            .iter()
            .map(|g| (g.name.clone(), g.id))
            .collect();
        self.load_index = self.loads.iter().map(|l| (l.name.clone(), l.id)).collect();
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn snapshots(&self) -> &SnapshotSet {
        &self.snapshots
    }

    /// Replace the snapshot index. Series are left untouched; callers are
    /// responsible for re-aligning them.
    pub fn set_snapshots(&mut self, snapshots: SnapshotSet) {
        self.snapshots = snapshots;
    }

    // =========================================================================
    // Buses
    // =========================================================================

    /// Add a bus; a bus with the same name is returned unchanged.
    pub fn add_bus(&mut self, mut bus: Bus) -> BusId {
        if let Some(id) = self.bus_index.get(&bus.name) {
            return *id;
        }
        let id = BusId::new(self.buses.len());
        bus.id = id;
        self.bus_index.insert(bus.name.clone(), id);
        self.buses.push(bus);
        id
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses.get(id.value())
    }

    pub fn bus_id(&self, name: &str) -> Option<BusId> {
        self.bus_index.get(name).copied()
    }

    /// Mark a bus as hosting generation.
    pub fn promote_to_prod(&mut self, id: BusId) -> bool {
        match self.buses.get_mut(id.value()) {
            Some(bus) if bus.role != BusRole::Prod => {
                bus.role = BusRole::Prod;
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Lines
    // =========================================================================

    pub fn add_line_type(&mut self, line_type: LineType) {
        if !self.line_types.iter().any(|t| t.name == line_type.name) {
            self.line_types.push(line_type);
        }
    }

    pub fn line_types(&self) -> &[LineType] {
        &self.line_types
    }

    pub fn line_type(&self, name: &str) -> Option<&LineType> {
        self.line_types.iter().find(|t| t.name == name)
    }

    /// Add a line after checking both endpoints exist. A line with the same
    /// name is returned unchanged.
    pub fn add_line(&mut self, mut line: Line) -> QgridResult<LineId> {
        if let Some(id) = self.line_index.get(&line.name) {
            return Ok(*id);
        }
        for endpoint in [&line.bus_from, &line.bus_to] {
            if !self.bus_index.contains_key(endpoint) {
                return Err(QgridError::Network(format!(
                    "line '{}' references unknown bus '{}'",
                    line.name, endpoint
                )));
            }
        }
        if let Some(type_name) = &line.line_type {
            if line.s_nom <= 0.0 {
                if let Some(t) = self.line_type(type_name) {
                    line.s_nom = t.s_nom;
                }
            }
        }
        let id = LineId::new(self.lines.len());
        line.id = id;
        self.line_index.insert(line.name.clone(), id);
        self.lines.push(line);
        Ok(id)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn has_line(&self, name: &str) -> bool {
        self.line_index.contains_key(name)
    }

    /// Endpoints of a line as bus handles.
    pub fn line_endpoints(&self, line: &Line) -> Option<(BusId, BusId)> {
        Some((self.bus_id(&line.bus_from)?, self.bus_id(&line.bus_to)?))
    }

    // =========================================================================
    // Generators
    // =========================================================================

    /// Add a generator. Empty series are initialised to full availability and
    /// the carrier's default cost.
    pub fn add_generator(&mut self, mut generator: Generator) -> QgridResult<GeneratorId> {
        if self.generator_index.contains_key(&generator.name) {
            return Err(QgridError::Validation(format!(
                "duplicate generator '{}'",
                generator.name
            )));
        }
        if self.bus(generator.bus).is_none() {
            return Err(QgridError::Network(format!(
                "generator '{}' references unknown bus {}",
                generator.name,
                generator.bus.value()
            )));
        }
        let n = self.snapshots.len();
        if generator.p_max_pu.is_empty() {
            generator.p_max_pu = vec![1.0; n];
        }
        if generator.marginal_cost.is_empty() {
            generator.marginal_cost = vec![generator.carrier.default_marginal_cost(); n];
        }
        let id = GeneratorId::new(self.generators.len());
        generator.id = id;
        self.generator_index.insert(generator.name.clone(), id);
        self.generators.push(generator);
        Ok(id)
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn generators_mut(&mut self) -> &mut [Generator] {
        &mut self.generators
    }

    pub fn generator(&self, id: GeneratorId) -> Option<&Generator> {
        self.generators.get(id.value())
    }

    pub fn generator_mut(&mut self, id: GeneratorId) -> Option<&mut Generator> {
        self.generators.get_mut(id.value())
    }

    pub fn generator_id(&self, name: &str) -> Option<GeneratorId> {
        self.generator_index.get(name).copied()
    }

    pub fn generators_of(&self, carrier: Carrier) -> impl Iterator<Item = &Generator> {
        self.generators.iter().filter(move |g| g.carrier == carrier)
    }

    // =========================================================================
    // Loads
    // =========================================================================

    /// Add a load; a load with the same name is returned unchanged.
    pub fn add_load(&mut self, mut load: Load) -> QgridResult<LoadId> {
        if let Some(id) = self.load_index.get(&load.name) {
            return Ok(*id);
        }
        if self.bus(load.bus).is_none() {
            return Err(QgridError::Network(format!(
                "load '{}' references unknown bus {}",
                load.name,
                load.bus.value()
            )));
        }
        let id = LoadId::new(self.loads.len());
        load.id = id;
        self.load_index.insert(load.name.clone(), id);
        self.loads.push(load);
        Ok(id)
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn loads_mut(&mut self) -> &mut [Load] {
        &mut self.loads
    }

    pub fn load_id(&self, name: &str) -> Option<LoadId> {
        self.load_index.get(name).copied()
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Total demand at a snapshot as average power (MW).
    pub fn demand_at(&self, snapshot: usize) -> f64 {
        let hours = self.snapshots.hours_per_step();
        self.loads.iter().map(|l| l.power_at(snapshot, hours)).sum()
    }

    /// Total demand for every snapshot as average power (MW).
    pub fn demand_series(&self) -> Vec<f64> {
        (0..self.snapshots.len()).map(|t| self.demand_at(t)).collect()
    }

    /// `Σ p_nom × p_max_pu` over all generators at a snapshot.
    pub fn available_capacity_at(&self, snapshot: usize) -> f64 {
        self.generators.iter().map(|g| g.available_at(snapshot)).sum()
    }

    pub fn installed_capacity(&self) -> f64 {
        self.generators.iter().map(|g| g.p_nom.max(0.0)).sum()
    }

    /// True when a bus carries at least one load.
    pub fn bus_has_load(&self, bus: BusId) -> bool {
        self.loads.iter().any(|l| l.bus == bus)
    }

    /// True when a bus carries at least one generator.
    pub fn bus_has_generation(&self, bus: BusId) -> bool {
        self.generators.iter().any(|g| g.bus == bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{TimeStep, TimeWindow};
    use crate::SeriesUnit;
    use chrono::NaiveDate;

    fn snapshots(hours: u32) -> SnapshotSet {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = start + chrono::Duration::hours(hours as i64 - 1);
        SnapshotSet::from_window(&TimeWindow::new(start, end, TimeStep::Hourly).unwrap())
    }

    #[test]
    fn add_bus_is_idempotent() {
        let mut net = NetworkModel::new("t", snapshots(2));
        let a = net.add_bus(Bus::new("A", BusRole::Conso));
        let again = net.add_bus(Bus::new("A", BusRole::Prod));
        assert_eq!(a, again);
        assert_eq!(net.buses().len(), 1);
        assert_eq!(net.bus(a).unwrap().role, BusRole::Conso);
    }

    #[test]
    fn line_requires_existing_endpoints() {
        let mut net = NetworkModel::new("t", snapshots(2));
        net.add_bus(Bus::new("A", BusRole::Prod));
        let err = net.add_line(Line::new("A-Z", "A", "Z")).unwrap_err();
        assert!(matches!(err, QgridError::Network(_)));
    }

    #[test]
    fn line_inherits_type_rating() {
        let mut net = NetworkModel::new("t", snapshots(2));
        net.add_bus(Bus::new("A", BusRole::Prod));
        net.add_bus(Bus::new("B", BusRole::Conso));
        net.add_line_type(LineType {
            name: "735kV".into(),
            r_per_length: 0.01,
            x_per_length: 0.3,
            s_nom: 2000.0,
        });
        let id = net.add_line(Line::new("A-B", "A", "B").with_type("735kV")).unwrap();
        assert_eq!(net.lines()[id.value()].s_nom, 2000.0);
    }

    #[test]
    fn generator_series_are_initialised() {
        let mut net = NetworkModel::new("t", snapshots(3));
        let a = net.add_bus(Bus::new("A", BusRole::Prod));
        let id = net
            .add_generator(Generator::new("th", a, Carrier::Thermal, 10.0))
            .unwrap();
        let gen = net.generator(id).unwrap();
        assert_eq!(gen.p_max_pu, vec![1.0; 3]);
        assert_eq!(gen.marginal_cost, vec![30.0; 3]);
        assert!(net
            .add_generator(Generator::new("th", a, Carrier::Thermal, 10.0))
            .is_err());
    }

    #[test]
    fn demand_and_capacity_aggregates() {
        let mut net = NetworkModel::new("t", snapshots(2));
        let a = net.add_bus(Bus::new("A", BusRole::Conso));
        net.add_load(Load::new("l1", a).with_profile(vec![10.0, 20.0], SeriesUnit::Power))
            .unwrap();
        net.add_load(Load::new("l2", a).with_profile(vec![5.0, f64::NAN], SeriesUnit::Power))
            .unwrap();
        net.add_generator(
            Generator::new("w", a, Carrier::Wind, 100.0).with_availability(vec![0.5, 0.25]),
        )
        .unwrap();
        assert_eq!(net.demand_series(), vec![15.0, 20.0]);
        assert_eq!(net.available_capacity_at(0), 50.0);
        assert_eq!(net.available_capacity_at(1), 25.0);
    }

    #[test]
    fn json_roundtrip_rebuilds_indexes() {
        let mut net = NetworkModel::new("t", snapshots(2));
        let a = net.add_bus(Bus::new("A", BusRole::Prod));
        net.add_generator(Generator::new("g", a, Carrier::Nuclear, 1.0))
            .unwrap();
        let bytes = net.to_json_vec().unwrap();
        let restored = NetworkModel::from_json_slice(&bytes).unwrap();
        assert_eq!(restored.bus_id("A"), Some(a));
        assert!(restored.generator_id("g").is_some());
        assert_eq!(restored.load_id("missing"), None);
    }
}
