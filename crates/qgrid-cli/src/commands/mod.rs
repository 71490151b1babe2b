use std::path::Path;

use anyhow::{Context, Result};
use qgrid_scenarios::{
    load_document_from_path, resolve, InfrastructureSelection, PathsSpec, ResolvedScenario,
    ScenarioDocument,
};

pub mod cache;
pub mod inspect;
pub mod scenario;
pub mod simulate;

/// A scenario document with its relative paths resolved against the
/// document's directory.
pub struct LoadedScenario {
    pub document: ScenarioDocument,
    pub scenario: ResolvedScenario,
    pub selection: InfrastructureSelection,
    pub paths: PathsSpec,
}

pub fn load_scenario(config: &Path) -> Result<LoadedScenario> {
    let document = load_document_from_path(config)?;
    let (scenario, selection) =
        resolve(&document).with_context(|| format!("resolving '{}'", config.display()))?;
    let base = config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let paths = document.paths.resolved_against(base);
    Ok(LoadedScenario {
        document,
        scenario,
        selection,
        paths,
    })
}
