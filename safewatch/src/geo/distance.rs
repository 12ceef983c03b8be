//! Great-circle distance.

use super::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate the great-circle distance between two coordinates.
///
/// Uses the haversine formula. The haversine term is clamped to `[0, 1]`
/// before `atan2` so rounding near antipodal or identical points cannot
/// produce NaN.
///
/// # Returns
///
/// Distance in meters. Exactly `0.0` when `a == b`.
///
/// # Example
///
/// ```
/// use safewatch::geo::{distance_meters, Coordinate};
///
/// let a = Coordinate::new(0.0, 0.0).unwrap();
/// let b = Coordinate::new(1.0, 0.0).unwrap();
/// let d = distance_meters(&a, &b);
/// assert!((d - 111_195.0).abs() < 1.0);
/// ```
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}
