use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use qgrid_algo::workflow::{run_with_paths, write_outputs, SimulationOptions, SimulationOutput};
use qgrid_algo::DispatchMode;
use qgrid_cli::manifest::record_manifest;
use tabwriter::TabWriter;
use tracing::info;

use super::load_scenario;

pub fn handle(config: &Path, mode: DispatchMode, out: Option<&Path>, no_cache: bool) -> Result<()> {
    let start = Instant::now();
    let loaded = load_scenario(config)?;
    let options = SimulationOptions {
        mode,
        use_cache: !no_cache,
    };
    info!(
        scenario = %loaded.scenario.name,
        infrastructure = %loaded.selection.name,
        %mode,
        "simulating"
    );
    let output = run_with_paths(&loaded.scenario, &loaded.selection, &loaded.paths, options)?;

    let out_dir = out.unwrap_or(&loaded.paths.output_dir);
    let written = write_outputs(&output, out_dir)?;
    print_summary(&output)?;

    let outputs: Vec<&Path> = written.iter().map(|p| p.as_path()).collect();
    let config_str = config.display().to_string();
    let mode_str = mode.to_string();
    let seed = loaded.scenario.seed.to_string();
    let elapsed = format!("{:.3}", start.elapsed().as_secs_f64());
    let manifest = record_manifest(
        out_dir,
        "simulate",
        &outputs,
        &[
            ("config", config_str.as_str()),
            ("mode", mode_str.as_str()),
            ("seed", seed.as_str()),
            ("cache", if no_cache { "off" } else { "on" }),
            ("elapsed_s", elapsed.as_str()),
        ],
    )?;
    println!("Results written to {}", out_dir.display());
    println!("Recorded run manifest {}", manifest.display());
    Ok(())
}

fn print_summary(output: &SimulationOutput) -> Result<()> {
    let report = &output.report;
    let summary = &report.production;
    println!(
        "Scenario '{}' with infrastructure '{}': {} snapshot(s), {} dispatch",
        report.scenario.name, report.infrastructure.name, summary.snapshots, report.mode
    );

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CARRIER\tUNITS\tINSTALLED MW\tENERGY MWh\tSHARE %\tCF\tCOST")?;
    for row in &summary.by_carrier {
        writeln!(
            writer,
            "{}\t{}\t{:.1}\t{:.1}\t{:.2}\t{:.3}\t{:.0}{}",
            row.carrier,
            row.generators,
            row.installed_mw,
            row.energy_mwh,
            row.share_pct,
            row.capacity_factor,
            row.cost,
            if row.zero_dispatch { "\t(idle)" } else { "" }
        )?;
    }
    writer.flush()?;

    println!(
        "Demand {:.1} MWh, supplied {:.1} MWh, max balance error {:.3} MW",
        summary.total_demand_mwh, summary.total_energy_mwh, summary.max_balance_error_mw
    );
    if summary.emergency.generators > 0 {
        println!(
            "Emergency: {} unit(s), {:.1} MWh, peak {:.1} MW over {} snapshot(s)",
            summary.emergency.generators,
            summary.emergency.energy_mwh,
            summary.emergency.peak_mw,
            summary.emergency.snapshots_used
        );
    }
    if let Some(plan) = &report.interconnection {
        println!(
            "Interconnection {}: {:.1} MW",
            report.interconnection_element.as_deref().unwrap_or("-"),
            plan.p_max_mw
        );
    }
    println!("Diagnostics: {}", report.diagnostics.summary());
    for issue in report.diagnostics.warnings() {
        println!("  {issue}");
    }
    Ok(())
}
