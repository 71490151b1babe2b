use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use qgrid_core::{QgridError, QgridResult};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read every record of a required CSV table. A missing file is a
/// configuration error; a malformed row is a parse error.
pub(crate) fn read_required<T: DeserializeOwned>(path: &Path, table: &str) -> QgridResult<Vec<T>> {
    if !path.is_file() {
        return Err(QgridError::Config(format!(
            "missing required {} table '{}'",
            table,
            path.display()
        )));
    }
    read_records(path, table)
}

pub(crate) fn read_records<T: DeserializeOwned>(path: &Path, table: &str) -> QgridResult<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| QgridError::Parse(format!("opening {} '{}': {e}", table, path.display())))?;
    let mut records = Vec::new();
    for (row, result) in rdr.deserialize().enumerate() {
        let record: T = result.map_err(|e| {
            QgridError::Parse(format!(
                "{} '{}' row {}: {e}",
                table,
                path.display(),
                row + 2
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM`
/// and bare dates (midnight).
pub fn parse_timestamp(value: &str) -> QgridResult<NaiveDateTime> {
    let value = value.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| QgridError::Parse(format!("unrecognised timestamp '{value}'")))
}

/// Lower-case, filesystem-safe form of a plant name.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
