//! # qgrid-io: External Interfaces
//!
//! Traits for the collaborators the simulation consumes, each with a
//! file-backed implementation:
//!
//! | Interface | Trait | File implementation |
//! |-----------|-------|---------------------|
//! | Static topology | [`TopologyProvider`] | [`CsvTopology`] (buses, line types, lines) |
//! | Plant catalog | [`InfrastructureCatalog`] | [`CsvCatalog`] (one table per [`PlantCategory`]) |
//! | Production models | [`ProductionModel`] | [`CsvProductionArchive`] |
//! | Aggregate demand | [`DemandProvider`] | [`CsvDemandProvider`] |
//! | Cache | [`CacheStore`] | [`FileCacheStore`] |
//!
//! Missing topology or catalog tables are configuration errors and abort the
//! run. Production/demand failures surface as `QgridError::Provider` so the
//! loader can fall back to default profiles.

pub mod cache;
pub mod catalog;
pub mod demand;
pub mod export;
mod helpers;
pub mod production;
pub mod topology;

pub use cache::{
    demand_cache_key, network_cache_key, scenario_key_prefixes, CacheStore, FileCacheStore,
};
pub use catalog::{CsvCatalog, InfrastructureCatalog, PlantCategory, PlantRecord};
pub use demand::{CsvDemandProvider, DemandProvider, DemandRecord, DemandRequest};
pub use export::{write_dispatch_csv, write_json, write_production_csv};
pub use helpers::{parse_timestamp, slug};
pub use production::{CsvProductionArchive, NoProduction, ProductionModel, ProductionSample};
pub use topology::{BusRecord, CsvTopology, LineRecord, LineTypeRecord, TopologyProvider};
