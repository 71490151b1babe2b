use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use qgrid_algo::DispatchMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "qgrid",
    author,
    version,
    about = "Merit-order dispatch simulator for the Québec grid",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, repair and dispatch a scenario, then write the results
    Simulate {
        /// Scenario document (YAML or JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Dispatch implementation
        #[arg(long, default_value = "sequential", value_parser = parse_mode)]
        mode: DispatchMode,
        /// Output directory (overrides `paths.output_dir`)
        #[arg(long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
        /// Neither read nor write the network/demand cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Build a scenario's network and report its structure and feasibility
    Inspect {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Scenario document utilities
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Delete cached networks and demand (one scenario) or every entry
    Purge {
        #[arg(long, value_hint = ValueHint::DirPath)]
        cache_dir: PathBuf,
        /// Only remove entries of this scenario id
        #[arg(long)]
        scenario: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommands {
    /// Check that a scenario document parses and resolves
    Validate {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
    /// Print the resolved scenario and infrastructure selection
    Show {
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON object
    Json,
}

fn parse_mode(value: &str) -> Result<DispatchMode, String> {
    value.parse().map_err(|err: qgrid_core::QgridError| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_simulate_flags() {
        let cli = Cli::parse_from([
            "qgrid", "simulate", "--config", "s.yaml", "--mode", "vectorised", "--no-cache",
        ]);
        match cli.command {
            Commands::Simulate { mode, no_cache, out, .. } => {
                assert_eq!(mode, DispatchMode::Vectorized);
                assert!(no_cache);
                assert!(out.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(
            Cli::try_parse_from(["qgrid", "simulate", "--config", "s.yaml", "--mode", "lp"])
                .is_err()
        );
    }
}
