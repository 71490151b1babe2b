//! Merit-order dispatch properties over hand-built networks.

use chrono::{Duration, NaiveDate};
use qgrid_algo::repair::SolvabilityRepairer;
use qgrid_algo::{DispatchMode, MeritOrderDispatcher, SimRng};
use qgrid_core::{
    Bus, BusRole, Carrier, Diagnostics, DispatchResult, Generator, Line, Load, NetworkModel,
    SeriesUnit, SnapshotSet,
};

const BALANCE_TOLERANCE_MW: f64 = 1.0;

fn hourly(n: i64) -> SnapshotSet {
    let t0 = NaiveDate::from_ymd_opt(2024, 3, 10)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    SnapshotSet::from_timestamps((0..n).map(|h| t0 + Duration::hours(h)).collect()).unwrap()
}

/// Two connected buses with every carrier, varying availability and
/// reservoir costs, and a demand that exceeds capacity in the evening peak.
fn mixed_network(n: usize) -> NetworkModel {
    let mut network = NetworkModel::new("mixed", hourly(n as i64));
    let north = network.add_bus(Bus::new("North", BusRole::Prod));
    let south = network.add_bus(Bus::new("South", BusRole::Conso));
    network
        .add_line(Line::new("north-south", "North", "South").with_s_nom(5000.0))
        .unwrap();

    let wave = |t: usize, period: f64, phase: f64| {
        ((t as f64) / period * std::f64::consts::TAU + phase).sin()
    };
    let wind: Vec<f64> = (0..n).map(|t| 0.5 + 0.4 * wave(t, 17.0, 0.0)).collect();
    let solar: Vec<f64> = (0..n).map(|t| wave(t, 24.0, -1.5).max(0.0)).collect();
    let nuclear = vec![0.85; n];
    let ror: Vec<f64> = (0..n).map(|t| 0.7 + 0.2 * wave(t, 48.0, 0.3)).collect();

    network
        .add_generator(Generator::new("wind", north, Carrier::Wind, 300.0).with_availability(wind))
        .unwrap();
    network
        .add_generator(
            Generator::new("solar", south, Carrier::Solar, 80.0).with_availability(solar),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("nuclear", north, Carrier::Nuclear, 120.0).with_availability(nuclear),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("ror", north, Carrier::HydroRunOfRiver, 150.0).with_availability(ror),
        )
        .unwrap();
    for (name, p_nom, base) in [("res-a", 400.0, 6.0), ("res-b", 250.0, 9.0)] {
        let cost: Vec<f64> = (0..n).map(|t| base + 4.0 * wave(t, 11.0, p_nom / 100.0)).collect();
        network
            .add_generator(
                Generator::new(name, north, Carrier::HydroReservoir, p_nom)
                    .with_availability(vec![0.95; n])
                    .with_cost(cost),
            )
            .unwrap();
    }
    network
        .add_generator(
            Generator::new("thermal", south, Carrier::Thermal, 100.0)
                .with_availability(vec![0.9; n])
                .with_cost(vec![30.0; n]),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("import", south, Carrier::Import, 60.0)
                .with_availability(vec![1.0; n])
                .with_cost(vec![0.5; n]),
        )
        .unwrap();

    let demand: Vec<f64> = (0..n).map(|t| 900.0 + 500.0 * wave(t, 24.0, 0.8)).collect();
    network
        .add_load(Load::new("load_South", south).with_profile(demand, SeriesUnit::Power))
        .unwrap();
    network
        .add_load(Load::new("load_North", north).with_profile(vec![150.0; n], SeriesUnit::Power))
        .unwrap();
    network
}

fn dispatch(network: NetworkModel, mode: DispatchMode) -> (NetworkModel, DispatchResult) {
    MeritOrderDispatcher::new(mode)
        .dispatch(network, &mut Diagnostics::new())
        .unwrap()
}

fn carrier_total(
    network: &NetworkModel,
    result: &DispatchResult,
    carrier: Carrier,
    t: usize,
) -> f64 {
    network
        .generators()
        .iter()
        .enumerate()
        .filter(|(_, g)| g.carrier == carrier)
        .map(|(g, _)| result.p[t][g])
        .sum()
}

#[test]
fn supply_matches_demand_at_every_snapshot() {
    for mode in [DispatchMode::Sequential, DispatchMode::Vectorized] {
        let (_, result) = dispatch(mixed_network(72), mode);
        for t in 0..result.snapshots.len() {
            let gap = (result.snapshot_total(t) - result.demand[t]).abs();
            assert!(gap <= BALANCE_TOLERANCE_MW, "{mode}: snapshot {t} off by {gap} MW");
        }
    }
}

#[test]
fn reservoir_covers_its_minimum_share() {
    let network = mixed_network(72);
    let reservoir_capacity: Vec<f64> = (0..72)
        .map(|t| network.generators_of(Carrier::HydroReservoir).map(|g| g.available_at(t)).sum())
        .collect();
    let (network, result) = dispatch(network, DispatchMode::Sequential);
    for (t, capacity) in reservoir_capacity.iter().enumerate() {
        let required = (0.2 * result.demand[t]).min(*capacity);
        let allocated = carrier_total(&network, &result, Carrier::HydroReservoir, t);
        assert!(allocated + 1e-9 >= required, "snapshot {t}: {allocated} < {required}");
    }
}

#[test]
fn allocations_stay_within_available_capacity() {
    let (network, result) = dispatch(mixed_network(72), DispatchMode::Vectorized);
    for (t, row) in result.p.iter().enumerate() {
        for (g, generator) in network.generators().iter().enumerate() {
            let p = row[g];
            assert!(p >= 0.0, "{} negative at {t}", generator.name);
            assert!(
                p <= generator.available_at(t) + 1e-9,
                "{} exceeds availability at {t}: {p} > {}",
                generator.name,
                generator.available_at(t)
            );
        }
    }
}

#[test]
fn sequential_and_vectorized_agree() {
    let (seq_network, sequential) = dispatch(mixed_network(96), DispatchMode::Sequential);
    let (vec_network, vectorized) = dispatch(mixed_network(96), DispatchMode::Vectorized);
    assert_eq!(sequential.generator_names, vectorized.generator_names);
    assert_eq!(seq_network.generators().len(), vec_network.generators().len());
    for (row_s, row_v) in sequential.p.iter().zip(&vectorized.p) {
        for (a, b) in row_s.iter().zip(row_v) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }
    assert_eq!(sequential.emergency_residual, vectorized.emergency_residual);
}

#[test]
fn evening_peak_draws_on_emergency_units() {
    let (network, result) = dispatch(mixed_network(72), DispatchMode::Sequential);
    assert!(result.total_emergency_residual() > 0.0);
    let emergency: Vec<&Generator> = network.generators_of(Carrier::Emergency).collect();
    assert!(!emergency.is_empty());
    assert!(emergency.iter().all(|g| g.name.starts_with("emergency_2024031")));
}

fn two_bus(n: usize) -> (NetworkModel, qgrid_core::BusId, qgrid_core::BusId) {
    let mut network = NetworkModel::new("two-bus", hourly(n as i64));
    let a = network.add_bus(Bus::new("A", BusRole::Prod));
    let b = network.add_bus(Bus::new("B", BusRole::Conso));
    network.add_line(Line::new("a-b", "A", "B").with_s_nom(500.0)).unwrap();
    network
        .add_load(Load::new("load_B", b).with_profile(vec![50.0; n], SeriesUnit::Power))
        .unwrap();
    (network, a, b)
}

#[test]
fn wind_shortfall_is_met_by_import() {
    let (mut network, a, b) = two_bus(24);
    let wind = network
        .add_generator(
            Generator::new("wind", a, Carrier::Wind, 100.0).with_availability(vec![0.3; 24]),
        )
        .unwrap();
    let import = network
        .add_generator(
            Generator::new("import_B", b, Carrier::Import, 40.0)
                .with_availability(vec![1.0; 24])
                .with_cost(vec![0.5; 24]),
        )
        .unwrap();

    for mode in [DispatchMode::Sequential, DispatchMode::Vectorized] {
        let (network, result) = dispatch(network.clone(), mode);
        assert_eq!(network.generators().len(), 2, "no emergency unit expected");
        for t in 0..24 {
            assert!((result.p[t][wind.value()] - 30.0).abs() < 1e-9);
            assert!((result.p[t][import.value()] - 20.0).abs() < 1e-9);
            assert_eq!(result.emergency_residual[t], 0.0);
            assert_eq!(result.unserved[t], 0.0);
        }
    }
}

#[test]
fn wind_shortfall_without_import_uses_emergency() {
    let (mut network, a, _) = two_bus(24);
    let wind = network
        .add_generator(
            Generator::new("wind", a, Carrier::Wind, 100.0).with_availability(vec![0.3; 24]),
        )
        .unwrap();
    let (network, result) = dispatch(network, DispatchMode::Vectorized);
    let emergency = network.generator_id("emergency_20240310").unwrap();
    for t in 0..24 {
        assert!((result.p[t][wind.value()] - 30.0).abs() < 1e-9);
        assert!((result.p[t][emergency.value()] - 20.0).abs() < 1e-9);
    }
    assert!(result.max_balance_error() < 1e-9);
}

#[test]
fn lone_reservoir_serves_all_demand() {
    let mut network = NetworkModel::new("reservoir", hourly(24));
    let a = network.add_bus(Bus::new("A", BusRole::Prod));
    let reservoir = network
        .add_generator(
            Generator::new("res", a, Carrier::HydroReservoir, 200.0)
                .with_availability(vec![1.0; 24])
                .with_cost(vec![7.0; 24]),
        )
        .unwrap();
    network
        .add_load(Load::new("load_A", a).with_profile(vec![100.0; 24], SeriesUnit::Power))
        .unwrap();

    let (network, result) = dispatch(network, DispatchMode::Sequential);
    assert_eq!(network.generators().len(), 1);
    assert!(result.generator_series(reservoir.value()).iter().all(|p| (*p - 100.0).abs() < 1e-9));
    assert_eq!(result.total_emergency_residual(), 0.0);
}

#[test]
fn isolated_load_is_linked_and_served() {
    let mut network = NetworkModel::new("islands", hourly(12));
    let a = network.add_bus(Bus::new("A", BusRole::Prod));
    let b = network.add_bus(Bus::new("B", BusRole::Conso));
    network
        .add_generator(
            Generator::new("thermal", a, Carrier::Thermal, 100.0)
                .with_availability(vec![1.0; 12])
                .with_cost(vec![30.0; 12]),
        )
        .unwrap();
    network
        .add_load(Load::new("load_B", b).with_profile(vec![40.0; 12], SeriesUnit::Power))
        .unwrap();

    let mut diagnostics = Diagnostics::new();
    let (network, report) = SolvabilityRepairer::default()
        .repair(network, &mut SimRng::seeded(7), &mut diagnostics)
        .unwrap();
    assert_eq!(report.reference_bus.as_deref(), Some("A"));
    assert_eq!(report.virtual_lines, vec!["virtual_B_A".to_string()]);
    assert!(report.emergency_generators.is_empty());
    assert!(qgrid_core::find_islands(&network).is_connected());
    let line = &network.lines()[0];
    assert!(line.is_virtual);
    assert_eq!(diagnostics.issues_by_category("connectivity").count(), 1);

    let (network, result) = MeritOrderDispatcher::default()
        .dispatch(network, &mut diagnostics)
        .unwrap();
    assert_eq!(network.generators().len(), 1);
    assert!(result.max_balance_error() < 1e-9);
    assert_eq!(result.total_emergency_residual(), 0.0);
}

#[test]
fn second_repair_changes_nothing() {
    let mut network = mixed_network(48);
    let stray = network.add_bus(Bus::new("Stray", BusRole::Conso));
    network
        .add_load(
            Load::new("load_Stray", stray).with_profile(vec![f64::NAN; 48], SeriesUnit::Power),
        )
        .unwrap();
    network.generators_mut()[0].p_max_pu.truncate(30);

    let repairer = SolvabilityRepairer::default();
    let mut rng = SimRng::seeded(11);
    let mut diagnostics = Diagnostics::new();
    let (network, first) = repairer.repair(network, &mut rng, &mut diagnostics).unwrap();
    assert!(!first.is_noop());
    let generators = network.generators().len();
    let lines = network.lines().len();

    let (network, second) = repairer.repair(network, &mut rng, &mut diagnostics).unwrap();
    assert!(second.is_noop(), "{second:?}");
    assert_eq!(network.generators().len(), generators);
    assert_eq!(network.lines().len(), lines);
}
