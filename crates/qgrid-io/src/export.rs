//! Result writers (CSV tables, JSON reports).

use qgrid_core::{DispatchResult, ProductionSummary, QgridError, QgridResult};
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;

fn csv_err(path: &Path, err: impl std::fmt::Display) -> QgridError {
    QgridError::Other(format!("writing '{}': {err}", path.display()))
}

/// Snapshot × generator power matrix.
pub fn write_dispatch_csv(path: &Path, result: &DispatchResult) -> QgridResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    let mut header = Vec::with_capacity(result.generator_names.len() + 1);
    header.push("snapshot".to_string());
    header.extend(result.generator_names.iter().cloned());
    wtr.write_record(&header).map_err(|e| csv_err(path, e))?;

    for (t, row) in result.p.iter().enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        let label = result
            .snapshots
            .get(t)
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        record.push(label);
        record.extend(row.iter().map(|p| format!("{p:.3}")));
        wtr.write_record(&record).map_err(|e| csv_err(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per carrier.
pub fn write_production_csv(path: &Path, summary: &ProductionSummary) -> QgridResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    for row in &summary.by_carrier {
        wtr.serialize(row).map_err(|e| csv_err(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> QgridResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgrid_core::{
        Carrier, CarrierProduction, EmergencySummary, SeriesUnit, SnapshotSet, TimeStep,
    };
    use tempfile::tempdir;

    #[test]
    fn writes_production_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("production.csv");
        let summary = ProductionSummary {
            step: TimeStep::Hourly,
            snapshots: 1,
            total_energy_mwh: 50.0,
            total_demand_mwh: 50.0,
            total_cost: 5.0,
            pilotable_mwh: 0.0,
            non_pilotable_mwh: 50.0,
            by_carrier: vec![CarrierProduction {
                carrier: Carrier::Wind,
                generators: 1,
                installed_mw: 100.0,
                mean_available_mw: 30.0,
                energy_mwh: 50.0,
                share_pct: 100.0,
                capacity_factor: 0.5,
                cost: 5.0,
                zero_dispatch: false,
            }],
            emergency: EmergencySummary::default(),
            max_balance_error_mw: 0.0,
        };
        write_production_csv(&path, &summary).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("carrier,generators,installed_mw"));
        assert!(text.contains("wind,1,100.0"));
    }

    #[test]
    fn writes_dispatch_matrix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dispatch.csv");
        let t0 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let result = DispatchResult {
            snapshots: SnapshotSet::from_timestamps(vec![t0]).unwrap(),
            generator_names: vec!["wind".into(), "import_A".into()],
            p: vec![vec![30.0, 20.0]],
            unit: SeriesUnit::Power,
            demand: vec![50.0],
            emergency_residual: vec![0.0],
            unserved: vec![0.0],
            line_p0: vec![],
            line_q0: vec![],
        };
        write_dispatch_csv(&path, &result).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("snapshot,wind,import_A"));
        assert_eq!(lines.next(), Some("2024-01-01 00:00:00,30.000,20.000"));
    }
}
