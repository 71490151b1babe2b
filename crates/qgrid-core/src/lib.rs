//! # qgrid-core: Grid Model for Merit-Order Dispatch
//!
//! Typed data model for a bus/line/generator/load network whose generators
//! and loads carry time series aligned to one shared [`SnapshotSet`].
//!
//! ## Design
//!
//! - Elements live in arenas inside [`NetworkModel`] and are addressed by
//!   newtype handles ([`BusId`], [`LineId`], [`GeneratorId`], [`LoadId`]).
//!   A handle is the element's position in its arena, so it also indexes
//!   dispatch result columns.
//! - [`Carrier`] is a closed enum; its declaration order is the dispatch
//!   priority.
//! - Series are dense `Vec<f64>` of snapshot length. `NaN` marks a missing
//!   value that the solvability repair stage fills in.
//! - Load series carry a [`SeriesUnit`] tag: hourly data is average power,
//!   daily data is energy per period. Conversions go through
//!   [`SeriesUnit::to_power`] / [`SeriesUnit::to_energy`].
//!
//! ## Quick Start
//!
//! ```
//! use qgrid_core::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(3, 0, 0).unwrap();
//! let window = TimeWindow::new(start, end, TimeStep::Hourly).unwrap();
//!
//! let mut network = NetworkModel::new("demo", SnapshotSet::from_window(&window));
//! let a = network.add_bus(Bus::new("A", BusRole::Prod));
//! network.add_bus(Bus::new("B", BusRole::Conso));
//! network.add_line(Line::new("A-B", "A", "B").with_s_nom(500.0)).unwrap();
//! network
//!     .add_generator(Generator::new("wind-1", a, Carrier::Wind, 100.0))
//!     .unwrap();
//! assert_eq!(network.generators().len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`network`] - the [`NetworkModel`] container
//! - [`time`] - snapshots and simulation windows
//! - [`carrier`] - carrier tiers, default costs and availabilities
//! - [`result`] - dispatch matrices and production summaries
//! - [`graph_utils`] - bus connectivity (islands)
//! - [`diagnostics`] - non-fatal issue trail

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub mod carrier;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod network;
pub mod result;
pub mod time;
pub mod units;

pub use carrier::Carrier;
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{QgridError, QgridResult};
pub use graph_utils::{find_islands, graph_stats, GraphStats, IslandAnalysis, IslandSummary};
pub use network::NetworkModel;
pub use result::{CarrierProduction, DispatchResult, EmergencySummary, ProductionSummary};
pub use time::{SnapshotSet, TimeStep, TimeWindow};
pub use units::{Hours, MegawattHours, Megawatts};

// Newtype wrappers for arena handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LineId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct GeneratorId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LoadId(usize);

macro_rules! impl_handle {
    ($type:ty) => {
        impl $type {
            #[inline]
            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(&self) -> usize {
                self.0
            }
        }
    };
}

impl_handle!(BusId);
impl_handle!(LineId);
impl_handle!(GeneratorId);
impl_handle!(LoadId);

/// Electrical role of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusRole {
    Prod,
    Conso,
    #[default]
    Line,
}

impl FromStr for BusRole {
    type Err = QgridError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "prod" => Ok(BusRole::Prod),
            "conso" => Ok(BusRole::Conso),
            "line" | "ligne" => Ok(BusRole::Line),
            other => Err(QgridError::Config(format!("unknown bus type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub role: BusRole,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub v_nom: f64,
    pub control: String,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId::default(),
            name: String::new(),
            role: BusRole::Line,
            latitude: None,
            longitude: None,
            v_nom: 735.0,
            control: "PQ".to_string(),
        }
    }
}

impl Bus {
    pub fn new(name: impl Into<String>, role: BusRole) -> Self {
        Self {
            name: name.into(),
            role,
            ..Self::default()
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Electrical parameters shared by lines of the same type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineType {
    pub name: String,
    pub r_per_length: f64,
    pub x_per_length: f64,
    pub s_nom: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub bus_from: String,
    pub bus_to: String,
    pub line_type: Option<String>,
    pub s_nom: f64,
    pub length_km: f64,
    pub cost: f64,
    /// Synthetic zero-impedance link added by connectivity repair.
    pub is_virtual: bool,
}

impl Line {
    pub fn new(
        name: impl Into<String>,
        bus_from: impl Into<String>,
        bus_to: impl Into<String>,
    ) -> Self {
        Self {
            id: LineId::default(),
            name: name.into(),
            bus_from: bus_from.into(),
            bus_to: bus_to.into(),
            line_type: None,
            s_nom: 0.0,
            length_km: 0.0,
            cost: 0.0,
            is_virtual: false,
        }
    }

    pub fn with_s_nom(mut self, s_nom: f64) -> Self {
        self.s_nom = s_nom;
        self
    }

    pub fn with_type(mut self, line_type: impl Into<String>) -> Self {
        self.line_type = Some(line_type.into());
        self
    }
}

/// Whether the operator can schedule the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Pilotable,
    NonPilotable,
    /// Added by the pipeline (import, emergency)
    Synthetic,
}

impl GeneratorKind {
    pub fn for_carrier(carrier: Carrier) -> Self {
        if carrier.is_synthetic() {
            GeneratorKind::Synthetic
        } else if carrier.is_pilotable() {
            GeneratorKind::Pilotable
        } else {
            GeneratorKind::NonPilotable
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Generator {
    pub id: GeneratorId,
    pub name: String,
    pub bus: BusId,
    pub carrier: Carrier,
    pub kind: GeneratorKind,
    pub p_nom: f64,
    pub p_nom_min: f64,
    pub p_nom_extendable: bool,
    pub p_nom_max: Option<f64>,
    /// Availability fraction per snapshot (0..=1)
    #[serde(with = "series_serde")]
    pub p_max_pu: Vec<f64>,
    /// $/MWh per snapshot
    #[serde(with = "series_serde")]
    pub marginal_cost: Vec<f64>,
}

impl Generator {
    pub fn new(name: impl Into<String>, bus: BusId, carrier: Carrier, p_nom: f64) -> Self {
        Self {
            id: GeneratorId::default(),
            name: name.into(),
            bus,
            carrier,
            kind: GeneratorKind::for_carrier(carrier),
            p_nom,
            p_nom_min: 0.0,
            p_nom_extendable: false,
            p_nom_max: None,
            p_max_pu: Vec::new(),
            marginal_cost: Vec::new(),
        }
    }

    /// Mark as extendable up to `p_nom_max`.
    pub fn extendable(mut self, p_nom_max: f64) -> Self {
        self.p_nom_extendable = true;
        self.p_nom_max = Some(p_nom_max);
        self
    }

    pub fn with_availability(mut self, p_max_pu: Vec<f64>) -> Self {
        self.p_max_pu = p_max_pu;
        self
    }

    pub fn with_cost(mut self, marginal_cost: Vec<f64>) -> Self {
        self.marginal_cost = marginal_cost;
        self
    }

    /// Usable capacity at a snapshot (`p_nom × p_max_pu`); missing values count as zero.
    pub fn available_at(&self, snapshot: usize) -> f64 {
        let pu = self.p_max_pu.get(snapshot).copied().unwrap_or(f64::NAN);
        if pu.is_finite() {
            (self.p_nom * pu.clamp(0.0, 1.0)).max(0.0)
        } else {
            0.0
        }
    }

    /// Marginal cost at a snapshot, falling back to the carrier default when not finite.
    pub fn cost_at(&self, snapshot: usize) -> f64 {
        match self.marginal_cost.get(snapshot) {
            Some(cost) if cost.is_finite() => *cost,
            _ => self.carrier.default_marginal_cost(),
        }
    }
}

/// Unit of a load series value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeriesUnit {
    /// Average power over the snapshot (MW)
    #[default]
    Power,
    /// Energy delivered over the snapshot (MWh)
    EnergyPerPeriod,
}

impl SeriesUnit {
    pub fn to_power(self, value: f64, hours_per_step: f64) -> f64 {
        match self {
            SeriesUnit::Power => value,
            SeriesUnit::EnergyPerPeriod => value / hours_per_step,
        }
    }

    pub fn to_energy(self, value: f64, hours_per_step: f64) -> f64 {
        match self {
            SeriesUnit::Power => value * hours_per_step,
            SeriesUnit::EnergyPerPeriod => value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    #[serde(with = "series_serde")]
    pub p_set: Vec<f64>,
    pub unit: SeriesUnit,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id: LoadId::default(),
            name: name.into(),
            bus,
            p_set: Vec::new(),
            unit: SeriesUnit::Power,
        }
    }

    pub fn with_profile(mut self, p_set: Vec<f64>, unit: SeriesUnit) -> Self {
        self.p_set = p_set;
        self.unit = unit;
        self
    }

    /// Demand at a snapshot as average power; missing or negative values count as zero.
    pub fn power_at(&self, snapshot: usize, hours_per_step: f64) -> f64 {
        match self.p_set.get(snapshot) {
            Some(v) if v.is_finite() && *v > 0.0 => self.unit.to_power(*v, hours_per_step),
            _ => 0.0,
        }
    }
}

/// Series values with `NaN` written as `null`, since JSON has no NaN.
mod series_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect::<Vec<Option<f64>>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
