//! Small geographic helpers for the globe view.

use crate::analyzers::types::LonLat;

/// Geographic centre of the contiguous United States.
pub const USA_CENTROID: LonLat = [-98.5795, 39.8283];

/// Initial great-circle bearing from `start` to `end`, in degrees `[0, 360)`.
pub fn bearing(start: LonLat, end: LonLat) -> f64 {
    let [lon1, lat1] = start.map(f64::to_radians);
    let [lon2, lat2] = end.map(f64::to_radians);

    let y = (lon2 - lon1).sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * (lon2 - lon1).cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}
