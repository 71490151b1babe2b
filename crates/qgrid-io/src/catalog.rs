//! Infrastructure catalog: plant records per energy-source category.
//!
//! Each category has its own table with native units; records are normalised
//! into [`PlantRecord`] with `p_nom` in MW and a resolved [`Carrier`].

use crate::helpers::read_required;
use qgrid_core::{Carrier, QgridError, QgridResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Source category of a plant table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantCategory {
    Wind,
    Solar,
    /// Run-of-river and reservoir plants share one table
    Hydro,
    Nuclear,
    Thermal,
}

impl PlantCategory {
    pub const ALL: [PlantCategory; 5] = [
        PlantCategory::Wind,
        PlantCategory::Solar,
        PlantCategory::Hydro,
        PlantCategory::Nuclear,
        PlantCategory::Thermal,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            PlantCategory::Wind => "wind_farms.csv",
            PlantCategory::Solar => "solar_farms.csv",
            PlantCategory::Hydro => "hydro_plants.csv",
            PlantCategory::Nuclear => "nuclear_plants.csv",
            PlantCategory::Thermal => "thermal_plants.csv",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlantCategory::Wind => "wind",
            PlantCategory::Solar => "solar",
            PlantCategory::Hydro => "hydro",
            PlantCategory::Nuclear => "nuclear",
            PlantCategory::Thermal => "thermal",
        }
    }
}

impl fmt::Display for PlantCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantCategory {
    type Err = QgridError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "wind" | "eolienne" | "eolien" => Ok(PlantCategory::Wind),
            "solar" | "solaire" => Ok(PlantCategory::Solar),
            "hydro" | "hydroelectrique" => Ok(PlantCategory::Hydro),
            "nuclear" | "nucleaire" | "nucléaire" => Ok(PlantCategory::Nuclear),
            "thermal" | "thermique" => Ok(PlantCategory::Thermal),
            other => Err(QgridError::Config(format!(
                "unknown infrastructure category '{other}'"
            ))),
        }
    }
}

/// A plant normalised for network construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantRecord {
    pub id: u32,
    pub name: String,
    pub category: PlantCategory,
    pub carrier: Carrier,
    pub latitude: f64,
    pub longitude: f64,
    /// Nominal capacity in MW
    pub p_nom: f64,
}

#[derive(Debug, Deserialize)]
struct WindRow {
    id: u32,
    name: String,
    latitude: f64,
    longitude: f64,
    rated_kw: f64,
    turbine_count: f64,
}

#[derive(Debug, Deserialize)]
struct MegawattRow {
    id: u32,
    name: String,
    latitude: f64,
    longitude: f64,
    p_nom_mw: f64,
}

#[derive(Debug, Deserialize)]
struct HydroRow {
    id: u32,
    name: String,
    latitude: f64,
    longitude: f64,
    p_nom_mw: f64,
    dam_type: String,
}

#[derive(Debug, Deserialize)]
struct KilowattRow {
    id: u32,
    name: String,
    latitude: f64,
    longitude: f64,
    rated_kw: f64,
}

/// Carrier of a hydro plant from its dam type.
pub fn hydro_carrier(dam_type: &str) -> QgridResult<Carrier> {
    let normalised = dam_type.trim().to_lowercase();
    match normalised.as_str() {
        "fil de l'eau" | "fil de l’eau" | "run_of_river" | "run-of-river" => {
            Ok(Carrier::HydroRunOfRiver)
        }
        "reservoir" | "réservoir" => Ok(Carrier::HydroReservoir),
        _ => Err(QgridError::Config(format!("unknown dam type '{dam_type}'"))),
    }
}

/// Plant records per category, filtered by an optional id set.
pub trait InfrastructureCatalog {
    /// `ids = None` selects every plant of the category.
    fn plants(&self, category: PlantCategory, ids: Option<&[u32]>) -> QgridResult<Vec<PlantRecord>>;
}

/// Catalog stored as one CSV table per category.
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    dir: PathBuf,
}

impl CsvCatalog {
    pub fn open(dir: impl AsRef<Path>) -> QgridResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(QgridError::Config(format!(
                "infrastructure directory '{}' not found",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn read_category(&self, category: PlantCategory) -> QgridResult<Vec<PlantRecord>> {
        let path = self.dir.join(category.table_name());
        let table = category.as_str();
        let records = match category {
            PlantCategory::Wind => read_required::<WindRow>(&path, table)?
                .into_iter()
                .map(|r| PlantRecord {
                    id: r.id,
                    name: r.name,
                    category,
                    carrier: Carrier::Wind,
                    latitude: r.latitude,
                    longitude: r.longitude,
                    p_nom: r.rated_kw * r.turbine_count * 1e-3,
                })
                .collect(),
            PlantCategory::Solar => read_required::<MegawattRow>(&path, table)?
                .into_iter()
                .map(|r| PlantRecord {
                    id: r.id,
                    name: r.name,
                    category,
                    carrier: Carrier::Solar,
                    latitude: r.latitude,
                    longitude: r.longitude,
                    p_nom: r.p_nom_mw,
                })
                .collect(),
            PlantCategory::Hydro => {
                let rows = read_required::<HydroRow>(&path, table)?;
                let mut out = Vec::with_capacity(rows.len());
                for r in rows {
                    out.push(PlantRecord {
                        carrier: hydro_carrier(&r.dam_type)?,
                        id: r.id,
                        name: r.name,
                        category,
                        latitude: r.latitude,
                        longitude: r.longitude,
                        p_nom: r.p_nom_mw,
                    });
                }
                out
            }
            PlantCategory::Nuclear | PlantCategory::Thermal => {
                let carrier = if category == PlantCategory::Nuclear {
                    Carrier::Nuclear
                } else {
                    Carrier::Thermal
                };
                read_required::<KilowattRow>(&path, table)?
                    .into_iter()
                    .map(|r| PlantRecord {
                        id: r.id,
                        name: r.name,
                        category,
                        carrier,
                        latitude: r.latitude,
                        longitude: r.longitude,
                        p_nom: r.rated_kw * 1e-3,
                    })
                    .collect()
            }
        };
        Ok(records)
    }
}

impl InfrastructureCatalog for CsvCatalog {
    fn plants(
        &self,
        category: PlantCategory,
        ids: Option<&[u32]>,
    ) -> QgridResult<Vec<PlantRecord>> {
        let mut records = self.read_category(category)?;
        if let Some(ids) = ids {
            records.retain(|r| ids.contains(&r.id));
        }
        Ok(records)
    }
}
