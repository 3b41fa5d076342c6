use crate::osm::{Location, WayNode};

/// Earth radius used by osmium's haversine, kept so lengths match the established tooling.
pub const EARTH_RADIUS_M: f64 = 6_372_797.560856;

pub fn distance_m(a: Location, b: Location) -> f64 {
    let lonh = ((a.lon - b.lon).to_radians() * 0.5).sin();
    let lath = ((a.lat - b.lat).to_radians() * 0.5).sin();
    let tmp = a.lat.to_radians().cos() * b.lat.to_radians().cos();
    2.0 * EARTH_RADIUS_M * (lath * lath + tmp * lonh * lonh).sqrt().asin()
}

/// Sum of the great-circle distances between consecutive nodes, in source order.
///
/// Every location must be valid; the caller guarantees that.
pub fn path_length_m(nodes: &[WayNode]) -> f64 {
    if nodes.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..(nodes.len() - 1) {
        total += distance_m(nodes[i].location, nodes[i + 1].location);
    }
    total
}
