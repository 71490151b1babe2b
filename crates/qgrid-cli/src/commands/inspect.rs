//! Network construction report: structure, installed capacity and the
//! pre-dispatch feasibility check, without repairing or dispatching.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use qgrid_algo::feasibility::{self, FeasibilityReport};
use qgrid_algo::workflow::build_with_paths;
use qgrid_cli::cli::OutputFormat;
use qgrid_core::{graph_stats, Carrier, Diagnostics, GraphStats, NetworkModel};
use serde::Serialize;
use tabwriter::TabWriter;

use super::load_scenario;

#[derive(Debug, Serialize)]
struct CarrierRow {
    carrier: Carrier,
    generators: usize,
    installed_mw: f64,
    mean_available_mw: f64,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    network: String,
    snapshots: usize,
    loads: usize,
    graph: GraphStats,
    carriers: Vec<CarrierRow>,
    feasibility: FeasibilityReport,
    diagnostics: Diagnostics,
}

pub fn handle(config: &Path, format: OutputFormat) -> Result<()> {
    let loaded = load_scenario(config)?;
    let (network, mut diagnostics) =
        build_with_paths(&loaded.scenario, &loaded.selection, &loaded.paths)?;
    let feasibility = feasibility::assess(&network, &mut diagnostics);
    let report = InspectReport {
        network: network.name.clone(),
        snapshots: network.snapshots().len(),
        loads: network.loads().len(),
        graph: graph_stats(&network),
        carriers: carrier_rows(&network),
        feasibility,
        diagnostics,
    };
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &report)?;
            println!();
            Ok(())
        }
        OutputFormat::Table => print_table(&report),
    }
}

fn carrier_rows(network: &NetworkModel) -> Vec<CarrierRow> {
    let n = network.snapshots().len().max(1) as f64;
    Carrier::ALL
        .iter()
        .filter_map(|&carrier| {
            let members: Vec<_> = network.generators_of(carrier).collect();
            if members.is_empty() {
                return None;
            }
            let available: f64 = (0..network.snapshots().len())
                .map(|t| members.iter().map(|g| g.available_at(t)).sum::<f64>())
                .sum();
            Some(CarrierRow {
                carrier,
                generators: members.len(),
                installed_mw: members.iter().map(|g| g.p_nom).sum(),
                mean_available_mw: available / n,
            })
        })
        .collect()
}

fn print_table(report: &InspectReport) -> Result<()> {
    println!("Network {}", report.network);
    println!("  Snapshots     : {}", report.snapshots);
    println!("  Buses         : {}", report.graph.bus_count);
    println!(
        "  Lines         : {} ({} virtual)",
        report.graph.line_count, report.graph.virtual_line_count
    );
    println!("  Loads         : {}", report.loads);
    println!("  Components    : {}", report.graph.connected_components);
    println!(
        "  Degree [min/avg/max]: {}/{:.2}/{}",
        report.graph.min_degree, report.graph.avg_degree, report.graph.max_degree
    );

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CARRIER\tUNITS\tINSTALLED MW\tMEAN AVAILABLE MW")?;
    for row in &report.carriers {
        writeln!(
            writer,
            "{}\t{}\t{:.1}\t{:.1}",
            row.carrier, row.generators, row.installed_mw, row.mean_available_mw
        )?;
    }
    writer.flush()?;

    let f = &report.feasibility;
    println!(
        "Peak demand {:.1} MW, installed {:.1} MW, minimum margin {:.1} MW",
        f.peak_demand_mw, f.installed_mw, f.min_margin_mw
    );
    if f.deficit_snapshots > 0 {
        println!(
            "Deficit at {} snapshot(s), worst {:.1} MW",
            f.deficit_snapshots, f.max_deficit_mw
        );
    }
    for island in &f.islands_without_generation {
        println!("Island without generation: {}", island.join(", "));
    }
    println!(
        "Feasible before repair: {}",
        if f.is_feasible() { "yes" } else { "no" }
    );
    println!("Diagnostics: {}", report.diagnostics.summary());
    Ok(())
}
