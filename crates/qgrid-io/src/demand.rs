//! Aggregate demand providers.

use crate::helpers::{parse_timestamp, read_records};
use chrono::NaiveDateTime;
use qgrid_core::{QgridError, QgridResult, TimeWindow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scenario assumptions forwarded to the demand model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRequest {
    pub weather: String,
    pub consumption: String,
    /// Customer class (e.g., "residential", "all")
    pub customer_class: String,
    pub window: TimeWindow,
}

/// Energy demand of one period, split by sector (kWh).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub timestamp: NaiveDateTime,
    pub electricity_kwh: f64,
    pub gas_kwh: f64,
}

impl DemandRecord {
    /// Sum over sectors in MWh.
    pub fn total_mwh(&self) -> f64 {
        (self.electricity_kwh + self.gas_kwh) / 1000.0
    }
}

pub trait DemandProvider {
    fn demand(&self, request: &DemandRequest) -> QgridResult<Vec<DemandRecord>>;
}

/// Demand table with columns `date,electricity,gas` in kWh per period.
#[derive(Debug, Clone)]
pub struct CsvDemandProvider {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DemandRow {
    date: String,
    #[serde(default)]
    electricity: Option<f64>,
    #[serde(default)]
    gas: Option<f64>,
}

impl CsvDemandProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DemandProvider for CsvDemandProvider {
    fn demand(&self, request: &DemandRequest) -> QgridResult<Vec<DemandRecord>> {
        if !self.path.is_file() {
            return Err(QgridError::Provider(format!(
                "demand table '{}' not found",
                self.path.display()
            )));
        }
        let rows: Vec<DemandRow> = read_records(&self.path, "demand")?;
        let mut records = Vec::new();
        for row in rows {
            let timestamp = parse_timestamp(&row.date)?;
            if !request.window.covers(timestamp) {
                continue;
            }
            records.push(DemandRecord {
                timestamp,
                electricity_kwh: row.electricity.unwrap_or(0.0),
                gas_kwh: row.gas.unwrap_or(0.0),
            });
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgrid_core::TimeStep;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn filters_window_and_sums_sectors() {
        let tmp = NamedTempFile::new().unwrap();
        fs::write(
            tmp.path(),
            concat!(
                "date,electricity,gas\n",
                "2024-01-01 01:00:00,2000,500\n",
                "2024-01-01 00:00:00,1000,\n",
                "2024-01-02 00:00:00,9,9\n",
            ),
        )
        .unwrap();
        let provider = CsvDemandProvider::new(tmp.path());
        let request = DemandRequest {
            weather: "typical".into(),
            consumption: "reference".into(),
            customer_class: "all".into(),
            window: TimeWindow::new(
                parse_timestamp("2024-01-01 00:00:00").unwrap(),
                parse_timestamp("2024-01-01 23:00:00").unwrap(),
                TimeStep::Hourly,
            )
            .unwrap(),
        };
        let records = provider.demand(&request).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_mwh(), 1.0);
        assert_eq!(records[1].total_mwh(), 2.5);
    }
}
