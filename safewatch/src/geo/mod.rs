//! Geographic primitives.
//!
//! Provides the validated [`Coordinate`] type and the Haversine great-circle
//! [`distance_meters`] used by change detection.

mod coordinate;
mod distance;

pub use coordinate::{Coordinate, CoordinateError, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};
pub use distance::{distance_meters, EARTH_RADIUS_M};

#[cfg(test)]
mod tests;
