//! Distance command - Haversine distance between two points.

use safewatch::geo::{distance_meters, Coordinate};
use safewatch::location::DEFAULT_SIGNIFICANT_DISTANCE_M;

use crate::error::CliError;

/// Print the distance between `from` and `to`.
pub fn run(from: Coordinate, to: Coordinate) -> Result<(), CliError> {
    let meters = distance_meters(&from, &to);

    println!("{}", format_distance(meters));
    if meters > DEFAULT_SIGNIFICANT_DISTANCE_M {
        println!("(significant at the default {DEFAULT_SIGNIFICANT_DISTANCE_M} m threshold)");
    }

    Ok(())
}

fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} m ({:.3} km)", meters, meters / 1000.0)
    } else {
        format!("{:.1} m", meters)
    }
}
