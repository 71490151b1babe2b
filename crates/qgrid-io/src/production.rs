//! Production-model providers.
//!
//! The physical plant models live outside this workspace; here they are an
//! opaque hourly `(timestamp, MW)` series per plant.

use crate::catalog::PlantRecord;
use crate::helpers::{parse_timestamp, read_records, slug};
use chrono::NaiveDateTime;
use qgrid_core::{QgridError, QgridResult, TimeWindow};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One production sample.
pub type ProductionSample = (NaiveDateTime, f64);

pub trait ProductionModel {
    /// Hourly production (MW) of `plant` over `window`. An error or an empty
    /// series makes the caller fall back to the carrier's default profile.
    fn production(
        &self,
        plant: &PlantRecord,
        window: &TimeWindow,
    ) -> QgridResult<Vec<ProductionSample>>;
}

/// Pre-computed production series stored as `<dir>/<category>/<slug(name)>.csv`
/// with columns `timestamp,production_mw`.
#[derive(Debug, Clone)]
pub struct CsvProductionArchive {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProductionRow {
    timestamp: String,
    production_mw: f64,
}

impl CsvProductionArchive {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, plant: &PlantRecord) -> PathBuf {
        self.dir
            .join(plant.category.as_str())
            .join(format!("{}.csv", slug(&plant.name)))
    }
}

impl ProductionModel for CsvProductionArchive {
    fn production(
        &self,
        plant: &PlantRecord,
        window: &TimeWindow,
    ) -> QgridResult<Vec<ProductionSample>> {
        let path = self.path_for(plant);
        if !path.is_file() {
            return Err(QgridError::Provider(format!(
                "no production series for '{}' at '{}'",
                plant.name,
                path.display()
            )));
        }
        let rows: Vec<ProductionRow> = read_records(&path, "production")?;
        let mut samples = Vec::with_capacity(rows.len());
        for row in rows {
            let ts = parse_timestamp(&row.timestamp)?;
            if window.covers(ts) {
                samples.push((ts, row.production_mw));
            }
        }
        Ok(samples)
    }
}

/// Provider with no data; every plant falls back to its default profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProduction;

impl ProductionModel for NoProduction {
    fn production(
        &self,
        plant: &PlantRecord,
        _window: &TimeWindow,
    ) -> QgridResult<Vec<ProductionSample>> {
        Err(QgridError::Provider(format!(
            "no production model configured for '{}'",
            plant.name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlantCategory;
    use qgrid_core::{Carrier, TimeStep};
    use std::fs;
    use tempfile::tempdir;

    fn plant() -> PlantRecord {
        PlantRecord {
            id: 1,
            name: "Parc des Moulins".into(),
            category: PlantCategory::Wind,
            carrier: Carrier::Wind,
            latitude: 46.0,
            longitude: -71.0,
            p_nom: 100.0,
        }
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            parse_timestamp("2024-01-01 00:00:00").unwrap(),
            parse_timestamp("2024-01-01 02:00:00").unwrap(),
            TimeStep::Hourly,
        )
        .unwrap()
    }

    #[test]
    fn reads_series_inside_window() {
        let dir = tempdir().unwrap();
        let archive = CsvProductionArchive::new(dir.path());
        let path = archive.path_for(&plant());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            concat!(
                "timestamp,production_mw\n",
                "2023-12-31 23:00:00,5\n",
                "2024-01-01 00:00:00,10\n",
                "2024-01-01 01:00:00,20\n",
                "2024-01-01 02:00:00,30\n",
                "2024-01-01 03:00:00,40\n",
            ),
        )
        .unwrap();
        let samples = archive.production(&plant(), &window()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].1, 10.0);
    }

    #[test]
    fn missing_series_is_provider_error() {
        let dir = tempdir().unwrap();
        let archive = CsvProductionArchive::new(dir.path());
        let err = archive.production(&plant(), &window()).unwrap_err();
        assert!(matches!(err, QgridError::Provider(_)));
        assert!(!err.is_fatal());
    }
}
