//! Plant geolocation onto the bus grid.

use qgrid_core::{BusId, NetworkModel};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two `(lat, lon)` points in degrees.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Closest bus with declared coordinates. Ties keep the first bus in load order.
pub fn nearest_bus(network: &NetworkModel, latitude: f64, longitude: f64) -> Option<(BusId, f64)> {
    let mut best: Option<(BusId, f64)> = None;
    for bus in network.buses() {
        let Some(coords) = bus.coordinates() else {
            continue;
        };
        let distance = haversine_km((latitude, longitude), coords);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((bus.id, distance)),
        }
    }
    best
}
