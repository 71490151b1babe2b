//! End-to-end simulation: build, repair, dispatch, aggregate.
//!
//! Each stage takes the network by value and hands it to the next, so the
//! order of mutations is explicit:
//!
//! ```text
//! DataLoader → interconnection sizing → [daily resample] → reservoir costs
//!   → interconnection attach → feasibility → SolvabilityRepairer
//!   → MeritOrderDispatcher → ResultAggregator
//! ```

use crate::dispatch::{DispatchMode, MeritOrderDispatcher};
use crate::feasibility::{self, FeasibilityReport};
use crate::interconnect::{attach_interconnection, plan_interconnection, InterconnectionPlan};
use crate::loader::DataLoader;
use crate::repair::{RepairReport, SolvabilityRepairer};
use crate::reservoir::{apply_reservoir_costs, ReservoirCostModel};
use crate::resample::resample_daily;
use crate::results::ResultAggregator;
use crate::rng::{SimRng, Stage};
use anyhow::{Context, Result};
use qgrid_core::{Diagnostics, DispatchResult, NetworkModel, ProductionSummary};
use qgrid_io::{
    write_dispatch_csv, write_json, write_production_csv, CsvCatalog, CsvDemandProvider,
    CsvProductionArchive, CsvTopology, FileCacheStore,
};
use qgrid_scenarios::{InfrastructureSelection, PathsSpec, ResolvedScenario};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOptions {
    pub mode: DispatchMode,
    pub use_cache: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Sequential,
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: ResolvedScenario,
    pub infrastructure: InfrastructureSelection,
    pub mode: DispatchMode,
    pub interconnection: Option<InterconnectionPlan>,
    pub interconnection_element: Option<String>,
    pub reservoirs_costed: usize,
    pub feasibility: FeasibilityReport,
    pub repair: RepairReport,
    pub production: ProductionSummary,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub network: NetworkModel,
    pub dispatch: DispatchResult,
    pub report: SimulationReport,
}

pub struct Simulation<'a> {
    loader: DataLoader<'a>,
    pub repairer: SolvabilityRepairer,
    pub dispatcher: MeritOrderDispatcher,
    pub cost_model: ReservoirCostModel,
}

impl<'a> Simulation<'a> {
    pub fn new(loader: DataLoader<'a>, mode: DispatchMode) -> Self {
        Self {
            loader,
            repairer: SolvabilityRepairer::default(),
            dispatcher: MeritOrderDispatcher::new(mode),
            cost_model: ReservoirCostModel::default(),
        }
    }

    pub fn run(
        &self,
        scenario: &ResolvedScenario,
        selection: &InfrastructureSelection,
    ) -> Result<SimulationOutput> {
        let mut diagnostics = Diagnostics::new();

        let network = self
            .loader
            .load(
                scenario,
                selection,
                &mut SimRng::for_stage(scenario.seed, Stage::Loader),
                &mut diagnostics,
            )
            .with_context(|| format!("building network for scenario '{}'", scenario.name))?;

        let plan = scenario.interconnection.then(|| plan_interconnection(&network));

        let mut network = if scenario.daily_resample {
            resample_daily(network).context("resampling to daily snapshots")?
        } else {
            network
        };

        let reservoirs_costed = apply_reservoir_costs(
            &mut network,
            &self.cost_model,
            &mut SimRng::for_stage(scenario.seed, Stage::Reservoir),
        );

        let interconnection_element = match &plan {
            Some(plan) => attach_interconnection(&mut network, plan)
                .context("attaching interconnection")?,
            None => None,
        };

        let feasibility = feasibility::assess(&network, &mut diagnostics);

        let (network, repair) = self
            .repairer
            .repair(
                network,
                &mut SimRng::for_stage(scenario.seed, Stage::Repair),
                &mut diagnostics,
            )
            .context("repairing network")?;

        let (network, dispatch) = self
            .dispatcher
            .dispatch(network, &mut diagnostics)
            .context("dispatching")?;

        let production = ResultAggregator.summarize(&network, &dispatch, &mut diagnostics);
        info!(
            scenario = %scenario.name,
            warnings = diagnostics.warning_count(),
            errors = diagnostics.error_count(),
            "simulation finished"
        );

        Ok(SimulationOutput {
            network,
            dispatch,
            report: SimulationReport {
                scenario: scenario.clone(),
                infrastructure: selection.clone(),
                mode: self.dispatcher.mode,
                interconnection: plan,
                interconnection_element,
                reservoirs_costed,
                feasibility,
                repair,
                production,
                diagnostics,
            },
        })
    }
}

struct CsvSources {
    topology: CsvTopology,
    catalog: CsvCatalog,
    production: CsvProductionArchive,
    demand: CsvDemandProvider,
    cache: FileCacheStore,
}

impl CsvSources {
    fn open(paths: &PathsSpec) -> Result<Self> {
        Ok(Self {
            topology: CsvTopology::open(paths.topology_dir()).context("opening topology")?,
            catalog: CsvCatalog::open(paths.infrastructure_dir()).context("opening plant catalog")?,
            production: CsvProductionArchive::new(paths.production_dir()),
            demand: CsvDemandProvider::new(paths.demand_file()),
            cache: FileCacheStore::new(&paths.cache_dir),
        })
    }

    fn loader(&self, use_cache: bool) -> DataLoader<'_> {
        let loader = DataLoader::new(&self.topology, &self.catalog, &self.production, &self.demand);
        if use_cache {
            loader.with_cache(&self.cache)
        } else {
            loader
        }
    }
}

/// Run with the CSV providers and file cache found under `paths`.
pub fn run_with_paths(
    scenario: &ResolvedScenario,
    selection: &InfrastructureSelection,
    paths: &PathsSpec,
    options: SimulationOptions,
) -> Result<SimulationOutput> {
    let sources = CsvSources::open(paths)?;
    Simulation::new(sources.loader(options.use_cache), options.mode).run(scenario, selection)
}

/// Build the network only, without repair or dispatch. The cache is not
/// consulted.
pub fn build_with_paths(
    scenario: &ResolvedScenario,
    selection: &InfrastructureSelection,
    paths: &PathsSpec,
) -> Result<(NetworkModel, Diagnostics)> {
    let sources = CsvSources::open(paths)?;
    let mut rng = SimRng::for_stage(scenario.seed, Stage::Loader);
    let mut diagnostics = Diagnostics::new();
    let network = sources
        .loader(false)
        .load(scenario, selection, &mut rng, &mut diagnostics)
        .with_context(|| format!("building network for scenario '{}'", scenario.name))?;
    Ok((network, diagnostics))
}

/// Write `production_by_carrier.csv`, `dispatch.csv` and `report.json`.
pub fn write_outputs(output: &SimulationOutput, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory '{}'", dir.display()))?;
    let production = dir.join("production_by_carrier.csv");
    write_production_csv(&production, &output.report.production)
        .with_context(|| format!("writing '{}'", production.display()))?;
    let dispatch = dir.join("dispatch.csv");
    write_dispatch_csv(&dispatch, &output.dispatch)
        .with_context(|| format!("writing '{}'", dispatch.display()))?;
    let report = dir.join("report.json");
    write_json(&report, &output.report).with_context(|| format!("writing '{}'", report.display()))?;
    Ok(vec![production, dispatch, report])
}
