use std::io;
use std::path::Path;

use anyhow::Result;
use qgrid_cli::cli::ScenarioCommands;
use qgrid_core::SnapshotSet;
use serde_json::json;

use super::load_scenario;

pub fn handle(command: &ScenarioCommands) -> Result<()> {
    match command {
        ScenarioCommands::Validate { config } => validate(config),
        ScenarioCommands::Show { config } => show(config),
    }
}

fn validate(config: &Path) -> Result<()> {
    let loaded = load_scenario(config)?;
    let snapshots = SnapshotSet::from_window(&loaded.scenario.window);
    println!(
        "Scenario '{}' is valid: {} {:?} snapshot(s) from {} to {}",
        loaded.scenario.name,
        snapshots.len(),
        snapshots.step(),
        loaded.scenario.window.start,
        loaded.scenario.window.end
    );
    for dir in [
        loaded.paths.topology_dir(),
        loaded.paths.infrastructure_dir(),
    ] {
        if !dir.is_dir() {
            println!("warning: data directory {} does not exist", dir.display());
        }
    }
    Ok(())
}

fn show(config: &Path) -> Result<()> {
    let loaded = load_scenario(config)?;
    let value = json!({
        "scenario": loaded.scenario,
        "infrastructure": loaded.selection,
        "paths": loaded.paths,
        "document": loaded.document,
    });
    serde_json::to_writer_pretty(io::stdout(), &value)?;
    println!();
    Ok(())
}
