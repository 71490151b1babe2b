//! Hourly to daily resampling.
//!
//! Each calendar day becomes one snapshot stamped at 12:00. Load series are
//! summed into energy per day; availability and cost series are averaged.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use qgrid_core::{NetworkModel, QgridResult, SeriesUnit, SnapshotSet, TimeStep};
use tracing::info;

/// Resample an hourly network to daily snapshots. Daily networks are
/// returned unchanged.
pub fn resample_daily(mut network: NetworkModel) -> QgridResult<NetworkModel> {
    if network.snapshots().step() == TimeStep::Daily {
        return Ok(network);
    }
    let hours = network.snapshots().hours_per_step();
    let (days, groups) = day_groups(network.snapshots());
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    let timestamps: Vec<NaiveDateTime> = days.iter().map(|d| d.and_time(noon)).collect();
    let snapshots = SnapshotSet::with_step(timestamps, TimeStep::Daily)?;

    for generator in network.generators_mut() {
        generator.p_max_pu = reduce(&generator.p_max_pu, &groups, Reduce::Mean);
        generator.marginal_cost = reduce(&generator.marginal_cost, &groups, Reduce::Mean);
    }
    for load in network.loads_mut() {
        let energy: Vec<f64> = load
            .p_set
            .iter()
            .map(|v| load.unit.to_energy(*v, hours))
            .collect();
        load.p_set = reduce(&energy, &groups, Reduce::Sum);
        load.unit = SeriesUnit::EnergyPerPeriod;
    }
    info!(from = network.snapshots().len(), to = snapshots.len(), "resampled to daily snapshots");
    network.set_snapshots(snapshots);
    Ok(network)
}

#[derive(Clone, Copy)]
enum Reduce {
    Sum,
    Mean,
}

/// Calendar days in order and the snapshot indices of each.
fn day_groups(snapshots: &SnapshotSet) -> (Vec<NaiveDate>, Vec<Vec<usize>>) {
    let mut days: Vec<NaiveDate> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (t, ts) in snapshots.iter().enumerate() {
        let day = ts.date();
        match days.last() {
            Some(last) if *last == day => {
                if let Some(group) = groups.last_mut() {
                    group.push(t);
                }
            }
            _ => {
                days.push(day);
                groups.push(vec![t]);
            }
        }
    }
    (days, groups)
}

/// Non-finite values are skipped; a group with no finite value yields `NaN`.
fn reduce(series: &[f64], groups: &[Vec<usize>], how: Reduce) -> Vec<f64> {
    groups
        .iter()
        .map(|group| {
            let values: Vec<f64> = group
                .iter()
                .filter_map(|&t| series.get(t).copied())
                .filter(|v| v.is_finite())
                .collect();
            if values.is_empty() {
                return f64::NAN;
            }
            let sum: f64 = values.iter().sum();
            match how {
                Reduce::Sum => sum,
                Reduce::Mean => sum / values.len() as f64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgrid_core::{Bus, BusRole, Carrier, Generator, Load, TimeWindow};

    #[test]
    fn sums_loads_and_averages_availability() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let snaps =
            SnapshotSet::from_window(&TimeWindow::new(start, end, TimeStep::Hourly).unwrap());
        let mut network = NetworkModel::new("n", snaps);
        let a = network.add_bus(Bus::new("A", BusRole::Prod));
        let pu: Vec<f64> = (0..48).map(|h| if h < 24 { 0.2 } else { 0.6 }).collect();
        network
            .add_generator(Generator::new("w", a, Carrier::Wind, 100.0).with_availability(pu))
            .unwrap();
        network
            .add_load(Load::new("l", a).with_profile(vec![10.0; 48], SeriesUnit::Power))
            .unwrap();

        let daily = resample_daily(network).unwrap();
        assert_eq!(daily.snapshots().len(), 2);
        assert_eq!(daily.snapshots().step(), TimeStep::Daily);
        assert_eq!(daily.snapshots().get(0).unwrap().format("%H:%M").to_string(), "12:00");
        let load = &daily.loads()[0];
        assert_eq!(load.unit, SeriesUnit::EnergyPerPeriod);
        assert_eq!(load.p_set, vec![240.0, 240.0]);
        assert!((daily.generators()[0].p_max_pu[1] - 0.6).abs() < 1e-12);
        // average power is preserved
        assert!((daily.demand_at(0) - 10.0).abs() < 1e-12);
    }
}
