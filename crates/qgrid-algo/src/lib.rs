//! # qgrid-algo: Network Construction and Merit-Order Dispatch
//!
//! Builds a [`NetworkModel`](qgrid_core::NetworkModel) from the providers in
//! `qgrid-io`, makes it dispatchable, and runs a carrier-priority merit
//! order over every snapshot.
//!
//! | Stage | Entry point |
//! |-------|-------------|
//! | Network construction | [`DataLoader::load`] |
//! | Reservoir water value | [`ReservoirCostModel`], [`apply_reservoir_costs`] |
//! | Import/export sizing | [`plan_interconnection`], [`attach_interconnection`] |
//! | Pre-dispatch check | [`feasibility::assess`] |
//! | Solvability repair | [`SolvabilityRepairer::repair`] |
//! | Dispatch | [`MeritOrderDispatcher::dispatch`] |
//! | Aggregation | [`ResultAggregator::summarize`] |
//!
//! [`workflow::Simulation`] chains the stages in order.
//!
//! ## Dispatch
//!
//! Both [`DispatchMode`]s drive the same per-snapshot allocation
//! ([`dispatch::allocate_step`]) through a [`DispatchBackend`]: the
//! sequential backend reads generator series one snapshot at a time, the
//! vectorized backend precomputes the capacity matrix and cost ordering for
//! the whole horizon. Results are identical.
//!
//! ## Randomness
//!
//! Every stochastic draw goes through a [`SimRng`] seeded from the scenario,
//! so a run is reproducible from its configuration. Loader, reservoir levels
//! and repair each read their own [`Stage`] stream: a warm cache gives the
//! same results as a cold one.
//!
//! ## Example
//!
//! ```ignore
//! use qgrid_algo::workflow::{run_with_paths, write_outputs, SimulationOptions};
//!
//! let doc = qgrid_scenarios::load_document_from_path("scenario.yaml".as_ref())?;
//! let (scenario, selection) = qgrid_scenarios::resolve(&doc)?;
//! let output = run_with_paths(&scenario, &selection, &doc.paths, SimulationOptions::default())?;
//! write_outputs(&output, "out".as_ref())?;
//! ```

pub mod dispatch;
pub mod feasibility;
pub mod interconnect;
pub mod loader;
pub mod repair;
pub mod resample;
pub mod reservoir;
pub mod results;
pub mod rng;
pub mod workflow;

pub use dispatch::{
    DispatchBackend, DispatchMode, DispatchSettings, MeritOrderDispatcher, SequentialBackend,
    VectorizedBackend,
};
pub use feasibility::FeasibilityReport;
pub use interconnect::{attach_interconnection, plan_interconnection, InterconnectionPlan};
pub use loader::DataLoader;
pub use repair::{RepairReport, SolvabilityRepairer};
pub use resample::resample_daily;
pub use reservoir::{apply_reservoir_costs, simulate_levels, ReservoirCostModel};
pub use results::ResultAggregator;
pub use rng::{SimRng, Stage};
pub use workflow::{
    build_with_paths, run_with_paths, write_outputs, Simulation, SimulationOptions,
    SimulationOutput,
    SimulationReport,
};
