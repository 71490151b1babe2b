//! End-to-end runs over the `demos/quebec-mini` dataset.

use qgrid_algo::workflow::{run_with_paths, write_outputs, SimulationOptions};
use qgrid_algo::DispatchMode;
use qgrid_core::{Carrier, TimeStep};
use qgrid_scenarios::{
    load_document_from_path, resolve, InfrastructureSelection, PathsSpec, ResolvedScenario,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn demo_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/quebec-mini")
}

/// Demo scenario with cache and output redirected under `scratch`.
fn demo(scratch: &Path) -> (ResolvedScenario, InfrastructureSelection, PathsSpec) {
    let doc = load_document_from_path(&demo_dir().join("scenario.yaml")).unwrap();
    let (scenario, selection) = resolve(&doc).unwrap();
    let mut paths = doc.paths.resolved_against(&demo_dir());
    paths.cache_dir = scratch.join("cache");
    paths.output_dir = scratch.join("out");
    (scenario, selection, paths)
}

#[test]
fn demo_run_balances_and_writes_outputs() {
    let scratch = tempdir().unwrap();
    let (scenario, selection, paths) = demo(scratch.path());
    let output =
        run_with_paths(&scenario, &selection, &paths, SimulationOptions::default()).unwrap();

    assert_eq!(output.dispatch.snapshots.len(), 48);
    assert!(output.dispatch.max_balance_error() <= 1.0);

    let report = &output.report;
    assert_eq!(report.repair.reference_bus.as_deref(), Some("Montreal"));
    assert_eq!(report.repair.virtual_lines, vec!["virtual_Chibougamau_Montreal".to_string()]);
    assert_eq!(report.interconnection_element.as_deref(), Some("import_Stanstead"));
    assert!(report.reservoirs_costed >= 2);
    // Parc des Moulins has a production series; Riviere-du-Moulin falls back
    assert!(report
        .diagnostics
        .issues_by_category("provider")
        .any(|issue| issue.entity.as_deref() == Some("Riviere-du-Moulin")));

    let summary = &report.production;
    assert!(summary.energy_of(Carrier::HydroReservoir) > 0.0);
    assert!((summary.total_energy_mwh - summary.total_demand_mwh).abs() < 48.0);

    for generator in output.network.generators_of(Carrier::HydroReservoir) {
        assert!(generator.marginal_cost.iter().all(|c| (5.0..=35.0).contains(c)));
    }

    let written = write_outputs(&output, &paths.output_dir).unwrap();
    assert_eq!(written.len(), 3);
    let csv = fs::read_to_string(paths.output_dir.join("production_by_carrier.csv")).unwrap();
    assert!(csv.starts_with("carrier,"));
    assert!(csv.contains("hydro_reservoir"));
    let report_json = fs::read_to_string(paths.output_dir.join("report.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report_json).unwrap();
    assert_eq!(json["scenario"]["name"], "winter-weekend");
    assert_eq!(json["mode"], "sequential");
    let dispatch = fs::read_to_string(paths.output_dir.join("dispatch.csv")).unwrap();
    assert_eq!(dispatch.lines().count(), 49);
}

#[test]
fn modes_produce_the_same_dispatch() {
    let scratch = tempdir().unwrap();
    let (scenario, selection, paths) = demo(scratch.path());
    let options = |mode| SimulationOptions {
        mode,
        use_cache: false,
    };
    let run = |mode| run_with_paths(&scenario, &selection, &paths, options(mode)).unwrap();
    let sequential = run(DispatchMode::Sequential);
    let vectorized = run(DispatchMode::Vectorized);
    assert_eq!(
        sequential.dispatch.generator_names,
        vectorized.dispatch.generator_names
    );
    let flat = |output: &qgrid_algo::SimulationOutput| -> Vec<f64> {
        output.dispatch.p.iter().flatten().copied().collect()
    };
    for (a, b) in flat(&sequential).iter().zip(flat(&vectorized)) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn cached_network_is_reused() {
    let scratch = tempdir().unwrap();
    let (scenario, selection, paths) = demo(scratch.path());
    let first =
        run_with_paths(&scenario, &selection, &paths, SimulationOptions::default()).unwrap();
    assert!(fs::read_dir(&paths.cache_dir).unwrap().next().is_some());

    let second =
        run_with_paths(&scenario, &selection, &paths, SimulationOptions::default()).unwrap();
    assert_eq!(second.report.diagnostics.issues_by_category("cache").count(), 0);
    assert_eq!(second.network.generators().len(), first.network.generators().len());
    for (a, b) in second.dispatch.demand.iter().zip(&first.dispatch.demand) {
        assert!((a - b).abs() <= 1e-6 * a.abs().max(1.0));
    }

    // a warm cache must not shift the reservoir or repair draws
    let reservoirs = |output: &qgrid_algo::SimulationOutput| -> Vec<f64> {
        output
            .network
            .generators_of(Carrier::HydroReservoir)
            .flat_map(|g| g.marginal_cost.clone())
            .collect()
    };
    let (cold, warm) = (reservoirs(&first), reservoirs(&second));
    assert!(!cold.is_empty());
    assert_eq!(cold.len(), warm.len());
    for (a, b) in cold.iter().zip(&warm) {
        assert!((a - b).abs() < 1e-9, "{a} vs {b}");
    }
    let (c1, c2) = (
        first.report.production.total_cost,
        second.report.production.total_cost,
    );
    assert!((c1 - c2).abs() <= 1e-6 * c1.abs().max(1.0), "{c1} vs {c2}");
}

#[test]
fn daily_resample_preserves_energy() {
    let scratch = tempdir().unwrap();
    let (mut scenario, selection, paths) = demo(scratch.path());
    let options = SimulationOptions {
        mode: DispatchMode::Vectorized,
        use_cache: false,
    };
    let hourly = run_with_paths(&scenario, &selection, &paths, options).unwrap();
    scenario.daily_resample = true;
    let daily = run_with_paths(&scenario, &selection, &paths, options).unwrap();

    assert_eq!(daily.dispatch.snapshots.len(), 2);
    assert_eq!(daily.report.production.step, TimeStep::Daily);
    let (h, d) = (
        hourly.report.production.total_demand_mwh,
        daily.report.production.total_demand_mwh,
    );
    assert!((h - d).abs() <= 1e-9 * h, "{h} vs {d}");
}

#[test]
fn missing_topology_aborts() {
    let scratch = tempdir().unwrap();
    let (scenario, selection, mut paths) = demo(scratch.path());
    paths.data_dir = scratch.path().join("nowhere");
    let err =
        run_with_paths(&scenario, &selection, &paths, SimulationOptions::default()).unwrap_err();
    assert!(format!("{err:#}").contains("topology"));
}
