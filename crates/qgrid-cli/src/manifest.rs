use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub run_id: String,
    pub command: String,
    pub version: String,
    pub timestamp: String,
    pub outputs: Vec<String>,
    pub params: Vec<Param>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

/// Write `run-<uuid>.json` into `dir` and return its path.
pub fn record_manifest(
    dir: &Path,
    command: &str,
    outputs: &[&Path],
    params: &[(&str, &str)],
) -> Result<std::path::PathBuf> {
    fs::create_dir_all(dir)?;
    let run_id = Uuid::new_v4().to_string();
    let manifest = ManifestEntry {
        run_id: run_id.clone(),
        command: command.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        outputs: outputs.iter().map(|p| p.display().to_string()).collect(),
        params: params
            .iter()
            .map(|(k, v)| Param {
                name: k.to_string(),
                value: v.to_string(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    let path = dir.join(format!("run-{run_id}.json"));
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<ManifestEntry> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let manifest = serde_json::from_str(&json)?;
    Ok(manifest)
}
