//! Network construction from topology, plant catalog, production and demand
//! providers.
//!
//! [`DataLoader::load`] builds a fresh [`NetworkModel`] for one
//! (scenario, infrastructure selection) pair, or restores it from the cache
//! when a valid entry exists. Only configuration errors abort the build:
//! provider failures fall back to default profiles and cache failures are
//! treated as misses. Both are recorded in the diagnostics trail.

pub mod availability;
pub mod demand;
pub mod geo;

use crate::rng::SimRng;
use qgrid_core::{
    Bus, BusRole, Diagnostics, Generator, Line, LineType, Load, NetworkModel, QgridError,
    QgridResult, SeriesUnit, SnapshotSet,
};
use qgrid_io::{
    demand_cache_key, network_cache_key, CacheStore, DemandProvider, InfrastructureCatalog,
    PlantCategory, PlantRecord, ProductionModel, TopologyProvider,
};
use qgrid_scenarios::{InfrastructureSelection, ResolvedScenario};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub use availability::{availability_from_production, fallback_profile};
pub use demand::{distribute, DemandFrame, LoadSize};
pub use geo::{haversine_km, nearest_bus};

/// Upper bound of an extendable pilotable unit relative to its nameplate.
pub const EXTENDABLE_HEADROOM: f64 = 1.1;

pub struct DataLoader<'a> {
    topology: &'a dyn TopologyProvider,
    catalog: &'a dyn InfrastructureCatalog,
    production: &'a dyn ProductionModel,
    demand: &'a dyn DemandProvider,
    cache: Option<&'a dyn CacheStore>,
}

impl<'a> DataLoader<'a> {
    pub fn new(
        topology: &'a dyn TopologyProvider,
        catalog: &'a dyn InfrastructureCatalog,
        production: &'a dyn ProductionModel,
        demand: &'a dyn DemandProvider,
    ) -> Self {
        Self {
            topology,
            catalog,
            production,
            demand,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn load(
        &self,
        scenario: &ResolvedScenario,
        selection: &InfrastructureSelection,
        rng: &mut SimRng,
        diagnostics: &mut Diagnostics,
    ) -> QgridResult<NetworkModel> {
        let signature = format!(
            "{}|{:?}|seed={}",
            selection.signature(),
            scenario.demand_request(),
            scenario.seed
        );
        let key = network_cache_key(scenario.id, scenario.year(), selection.id, &signature);
        let snapshots = SnapshotSet::from_window(&scenario.window);

        if let Some(network) = self.restore_network(&key, &snapshots, diagnostics) {
            info!(key = %key, "network restored from cache");
            return Ok(network);
        }

        let mut network = NetworkModel::new(
            format!("{} / {}", scenario.name, selection.name),
            snapshots,
        );
        self.load_topology(&mut network)?;
        for category in PlantCategory::ALL {
            let plants = self.catalog.plants(category, selection.ids(category))?;
            for plant in &plants {
                self.add_plant(&mut network, scenario, plant, rng, diagnostics)?;
            }
        }
        self.load_demand(&mut network, scenario, rng, diagnostics);

        info!(
            buses = network.buses().len(),
            lines = network.lines().len(),
            generators = network.generators().len(),
            loads = network.loads().len(),
            snapshots = network.snapshots().len(),
            "network built"
        );
        self.store_network(&key, &network, diagnostics);
        Ok(network)
    }

    /// Add buses, line types and lines. Every `conso` bus receives a load
    /// named `load_{bus}` with a zero series.
    pub fn load_topology(&self, network: &mut NetworkModel) -> QgridResult<()> {
        for record in self.topology.line_types()? {
            network.add_line_type(LineType {
                name: record.name,
                r_per_length: record.r_per_length,
                x_per_length: record.x_per_length,
                s_nom: record.s_nom,
            });
        }

        let n = network.snapshots().len();
        for record in self.topology.buses()? {
            let role = BusRole::from_str(&record.bus_type)?;
            let mut bus = Bus::new(record.name.clone(), role);
            bus.latitude = record.latitude;
            bus.longitude = record.longitude;
            if let Some(v_nom) = record.v_nom {
                bus.v_nom = v_nom;
            }
            if let Some(control) = record.control {
                bus.control = control;
            }
            let id = network.add_bus(bus);
            if role == BusRole::Conso {
                network.add_load(
                    Load::new(format!("load_{}", record.name), id)
                        .with_profile(vec![0.0; n], SeriesUnit::Power),
                )?;
            }
        }

        for record in self.topology.lines()? {
            let mut line = Line::new(record.name, record.bus0, record.bus1)
                .with_s_nom(record.s_nom.unwrap_or(0.0));
            line.line_type = record.line_type;
            line.length_km = record.length;
            line.cost = record.capital_cost;
            network.add_line(line)?;
        }
        debug!(
            buses = network.buses().len(),
            lines = network.lines().len(),
            "topology loaded"
        );
        Ok(())
    }

    /// Place a plant on its nearest bus and attach its series.
    fn add_plant(
        &self,
        network: &mut NetworkModel,
        scenario: &ResolvedScenario,
        plant: &PlantRecord,
        rng: &mut SimRng,
        diagnostics: &mut Diagnostics,
    ) -> QgridResult<()> {
        let (bus, distance_km) = nearest_bus(network, plant.latitude, plant.longitude)
            .ok_or_else(|| {
                QgridError::Network(format!(
                    "no bus with coordinates to host plant '{}'",
                    plant.name
                ))
            })?;
        network.promote_to_prod(bus);

        let name = if network.generator_id(&plant.name).is_some() {
            format!("{}_{}_{}", plant.name, plant.category, plant.id)
        } else {
            plant.name.clone()
        };
        let snapshots = network.snapshots().clone();
        let generator = if plant.carrier.is_pilotable() {
            Generator::new(name, bus, plant.carrier, plant.p_nom)
                .extendable(EXTENDABLE_HEADROOM * plant.p_nom)
                .with_availability(vec![1.0; snapshots.len()])
        } else {
            let fallback = fallback_profile(plant.carrier, &snapshots, rng);
            let p_max_pu = match self.production.production(plant, &scenario.window) {
                Ok(samples) if !samples.is_empty() => {
                    let (series, filled) =
                        availability_from_production(&samples, plant.p_nom, &snapshots, &fallback);
                    if filled > 0 {
                        debug!(plant = %plant.name, filled, "snapshots without production data");
                    }
                    series
                }
                Ok(_) => {
                    warn!(plant = %plant.name, "empty production series; using default profile");
                    diagnostics.add_warning_with_entity(
                        "provider",
                        "empty production series, default profile used",
                        &plant.name,
                    );
                    fallback
                }
                Err(err) => {
                    warn!(
                        plant = %plant.name,
                        error = %err,
                        "production model failed; using default profile"
                    );
                    diagnostics.add_warning_with_entity(
                        "provider",
                        &format!("production model failed ({err}), default profile used"),
                        &plant.name,
                    );
                    fallback
                }
            };
            Generator::new(name, bus, plant.carrier, plant.p_nom).with_availability(p_max_pu)
        };
        debug!(plant = %plant.name, carrier = %plant.carrier, distance_km, "plant placed");
        network.add_generator(generator)?;
        Ok(())
    }

    /// Fill every load's series from the aggregate demand.
    fn load_demand(
        &self,
        network: &mut NetworkModel,
        scenario: &ResolvedScenario,
        rng: &mut SimRng,
        diagnostics: &mut Diagnostics,
    ) {
        let load_names: Vec<String> = network.loads().iter().map(|l| l.name.clone()).collect();
        if load_names.is_empty() {
            warn!("no loads to carry demand");
            diagnostics.add_warning("provider", "network has no loads; demand not distributed");
            return;
        }
        let snapshots = network.snapshots().clone();
        let year = scenario.year();
        let request = scenario.demand_request();
        let key = demand_cache_key(scenario.id, &request, scenario.seed, &load_names);

        let frame = match self.restore_demand(&key, &load_names, snapshots.len(), diagnostics) {
            Some(frame) => frame,
            None => {
                let (mut aggregate, unit) = match self.demand.demand(&request) {
                    Ok(records) if !records.is_empty() => {
                        let (mut aggregate, unit) = demand::aggregate_records(&records, &snapshots);
                        demand::scale_to_target(
                            &mut aggregate,
                            unit,
                            snapshots.hours_per_step(),
                            year,
                        );
                        (aggregate, unit)
                    }
                    outcome => {
                        let reason = match outcome {
                            Err(err) => err.to_string(),
                            Ok(_) => "empty demand series".to_string(),
                        };
                        warn!(%reason, "demand provider unavailable; using flat profile");
                        diagnostics.add_warning(
                            "provider",
                            &format!("demand provider unavailable ({reason}), flat profile used"),
                        );
                        demand::flat_profile(&snapshots, year)
                    }
                };
                aggregate.truncate(snapshots.len());
                let frame = distribute(&aggregate, unit, &load_names, rng);
                self.store_demand(&key, &frame, diagnostics);
                frame
            }
        };

        for (idx, load) in network.loads_mut().iter_mut().enumerate() {
            load.p_set = frame.series(idx);
            load.unit = frame.unit;
        }
    }

    fn restore_network(
        &self,
        key: &str,
        snapshots: &SnapshotSet,
        diagnostics: &mut Diagnostics,
    ) -> Option<NetworkModel> {
        let cache = self.cache?;
        if !cache.exists(key) {
            return None;
        }
        let restored = cache
            .read(key)
            .and_then(|bytes| NetworkModel::from_json_slice(&bytes))
            .and_then(|network| {
                if network.snapshots() == snapshots {
                    Ok(network)
                } else {
                    Err(QgridError::Cache("snapshot index differs from scenario".into()))
                }
            });
        match restored {
            Ok(network) => Some(network),
            Err(err) => {
                warn!(key, error = %err, "discarding unreadable network cache entry");
                diagnostics.add_warning(
                    "cache",
                    &format!("network cache entry {key} discarded: {err}"),
                );
                if let Err(err) = cache.delete(key) {
                    debug!(key, error = %err, "could not delete cache entry");
                }
                None
            }
        }
    }

    fn store_network(&self, key: &str, network: &NetworkModel, diagnostics: &mut Diagnostics) {
        let Some(cache) = self.cache else { return };
        if let Err(err) = network.to_json_vec().and_then(|bytes| cache.write(key, &bytes)) {
            warn!(key, error = %err, "network cache write failed");
            diagnostics.add_warning("cache", &format!("network cache write failed: {err}"));
        }
    }

    fn restore_demand(
        &self,
        key: &str,
        loads: &[String],
        snapshot_len: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<DemandFrame> {
        let cache = self.cache?;
        if !cache.exists(key) {
            return None;
        }
        let restored = cache.read(key).and_then(|bytes| {
            let frame: DemandFrame = serde_json::from_slice(&bytes)?;
            if frame.loads == loads && frame.snapshot_len() == snapshot_len {
                Ok(frame)
            } else {
                Err(QgridError::Cache("demand frame shape differs from network".into()))
            }
        });
        match restored {
            Ok(frame) => {
                debug!(key, "demand restored from cache");
                Some(frame)
            }
            Err(err) => {
                warn!(key, error = %err, "discarding unreadable demand cache entry");
                diagnostics.add_warning(
                    "cache",
                    &format!("demand cache entry {key} discarded: {err}"),
                );
                if let Err(err) = cache.delete(key) {
                    debug!(key, error = %err, "could not delete cache entry");
                }
                None
            }
        }
    }

    fn store_demand(&self, key: &str, frame: &DemandFrame, diagnostics: &mut Diagnostics) {
        let Some(cache) = self.cache else { return };
        let written = serde_json::to_vec(frame)
            .map_err(QgridError::from)
            .and_then(|bytes| cache.write(key, &bytes));
        if let Err(err) = written {
            warn!(key, error = %err, "demand cache write failed");
            diagnostics.add_warning("cache", &format!("demand cache write failed: {err}"));
        }
    }
}
