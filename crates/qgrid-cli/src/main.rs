use std::process::ExitCode;

use clap::Parser;
use qgrid_cli::cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("could not install log subscriber: {err}");
    }

    let result = match &cli.command {
        Commands::Simulate {
            config,
            mode,
            out,
            no_cache,
        } => commands::simulate::handle(config, *mode, out.as_deref(), *no_cache),
        Commands::Inspect { config, format } => commands::inspect::handle(config, *format),
        Commands::Cache { command } => commands::cache::handle(command),
        Commands::Scenario { command } => commands::scenario::handle(command),
    };

    match result {
        Ok(()) => {
            info!("done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
