pub mod cli;
pub mod manifest;

pub use cli::{CacheCommands, Cli, Commands, OutputFormat, ScenarioCommands};
