//! Advisory on-disk cache for built networks and distributed demand.
//!
//! The store holds opaque byte blobs under string keys. There are no
//! cross-key guarantees; callers treat every failure as a cache miss.

use crate::demand::DemandRequest;
use qgrid_core::{QgridError, QgridResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait CacheStore {
    fn exists(&self, key: &str) -> bool;
    fn read(&self, key: &str) -> QgridResult<Vec<u8>>;
    fn write(&self, key: &str, bytes: &[u8]) -> QgridResult<()>;
    fn delete(&self, key: &str) -> QgridResult<()>;
    /// Delete every entry whose key starts with `prefix`; returns the count removed.
    fn purge_prefix(&self, prefix: &str) -> QgridResult<usize>;
}

/// One file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    root: PathBuf,
}

impl FileCacheStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> QgridResult<PathBuf> {
        if key.is_empty() || key.contains(|c: char| c == '/' || c == '\\') || key.starts_with('.') {
            return Err(QgridError::Cache(format!("invalid cache key '{key}'")));
        }
        Ok(self.root.join(key))
    }
}

impl CacheStore for FileCacheStore {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, key: &str) -> QgridResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| QgridError::Cache(format!("reading '{}': {e}", path.display())))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> QgridResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(|e| {
            QgridError::Cache(format!("creating cache dir '{}': {e}", self.root.display()))
        })?;
        let tmp = path.with_extension("partial");
        fs::write(&tmp, bytes)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| QgridError::Cache(format!("writing '{}': {e}", path.display())))?;
        debug!(key, bytes = bytes.len(), "cache entry written");
        Ok(())
    }

    fn delete(&self, key: &str) -> QgridResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QgridError::Cache(format!(
                "deleting '{}': {e}",
                path.display()
            ))),
        }
    }

    fn purge_prefix(&self, prefix: &str) -> QgridResult<usize> {
        if !self.root.is_dir() {
            return Ok(0);
        }
        let entries = fs::read_dir(&self.root).map_err(|e| {
            QgridError::Cache(format!("listing '{}': {e}", self.root.display()))
        })?;
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(prefix) && entry.path().is_file() {
                fs::remove_file(entry.path()).map_err(|e| {
                    QgridError::Cache(format!("deleting '{}': {e}", entry.path().display()))
                })?;
                removed += 1;
            }
        }
        debug!(prefix, removed, "cache entries purged");
        Ok(removed)
    }
}

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Prefix shared by every network entry of a scenario.
pub fn network_key_prefix(scenario_id: u32) -> String {
    format!("network_s{scenario_id}_")
}

/// Prefix shared by every demand entry of a scenario.
pub fn demand_key_prefix(scenario_id: u32) -> String {
    format!("demand_s{scenario_id}_")
}

/// Every key prefix owned by a scenario.
pub fn scenario_key_prefixes(scenario_id: u32) -> [String; 2] {
    [
        network_key_prefix(scenario_id),
        demand_key_prefix(scenario_id),
    ]
}

/// `network_s{scenario}_{year}_i{infra}_{hash8}.json`, where `hash8` covers
/// `signature` (selection contents and anything else the build depends on).
pub fn network_cache_key(
    scenario_id: u32,
    year: i32,
    infrastructure_id: u32,
    signature: &str,
) -> String {
    let hash = sha256_hex(signature.as_bytes());
    format!(
        "{}{}_i{}_{}.json",
        network_key_prefix(scenario_id),
        year,
        infrastructure_id,
        &hash[..8]
    )
}

/// `demand_s{scenario}_{year}_{hash16}.json`. The hash covers the demand
/// assumptions and window, the seed of the distribution and the load set.
pub fn demand_cache_key(
    scenario_id: u32,
    request: &DemandRequest,
    seed: u64,
    loads: &[String],
) -> String {
    let raw = format!(
        "{}|{}|{}|{}|{}|{:?}|seed={}|loads={}",
        request.weather,
        request.consumption,
        request.customer_class,
        request.window.start,
        request.window.end,
        request.window.step,
        seed,
        loads.join(",")
    );
    let hash = sha256_hex(raw.as_bytes());
    format!(
        "{}{}_{}.json",
        demand_key_prefix(scenario_id),
        request.window.year(),
        &hash[..16]
    )
}
