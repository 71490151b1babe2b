use anyhow::{Context, Result};
use qgrid_cli::cli::CacheCommands;
use qgrid_io::{scenario_key_prefixes, CacheStore, FileCacheStore};
use tracing::info;

pub fn handle(command: &CacheCommands) -> Result<()> {
    match command {
        CacheCommands::Purge {
            cache_dir,
            scenario,
        } => {
            let store = FileCacheStore::new(cache_dir);
            let prefixes: Vec<String> = match scenario {
                Some(id) => scenario_key_prefixes(*id).to_vec(),
                None => vec![String::new()],
            };
            let mut removed = 0;
            for prefix in &prefixes {
                removed += store
                    .purge_prefix(prefix)
                    .with_context(|| format!("purging cache '{}'", cache_dir.display()))?;
            }
            info!(cache = %cache_dir.display(), ?scenario, removed, "cache purged");
            println!("Removed {removed} cache entr{}", if removed == 1 { "y" } else { "ies" });
            Ok(())
        }
    }
}
