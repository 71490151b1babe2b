//! Static grid topology (buses, line types, lines).

use crate::helpers::read_required;
use qgrid_core::{QgridError, QgridResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub bus_type: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub v_nom: Option<f64>,
    #[serde(default)]
    pub control: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineTypeRecord {
    pub name: String,
    #[serde(default)]
    pub r_per_length: f64,
    #[serde(default)]
    pub x_per_length: f64,
    #[serde(default)]
    pub s_nom: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineRecord {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    #[serde(rename = "type", default)]
    pub line_type: Option<String>,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub s_nom: Option<f64>,
    #[serde(default)]
    pub capital_cost: f64,
}

/// Source of static topology records.
pub trait TopologyProvider {
    fn buses(&self) -> QgridResult<Vec<BusRecord>>;
    fn line_types(&self) -> QgridResult<Vec<LineTypeRecord>>;
    fn lines(&self) -> QgridResult<Vec<LineRecord>>;
}

/// Topology stored as `buses.csv`, `line_types.csv` and `lines.csv` in one directory.
#[derive(Debug, Clone)]
pub struct CsvTopology {
    dir: PathBuf,
}

impl CsvTopology {
    /// Fails with a configuration error when the directory does not exist.
    pub fn open(dir: impl AsRef<Path>) -> QgridResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(QgridError::Config(format!(
                "topology directory '{}' not found",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TopologyProvider for CsvTopology {
    fn buses(&self) -> QgridResult<Vec<BusRecord>> {
        read_required(&self.dir.join("buses.csv"), "bus")
    }

    fn line_types(&self) -> QgridResult<Vec<LineTypeRecord>> {
        read_required(&self.dir.join("line_types.csv"), "line type")
    }

    fn lines(&self) -> QgridResult<Vec<LineRecord>> {
        read_required(&self.dir.join("lines.csv"), "line")
    }
}
