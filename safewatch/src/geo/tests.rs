//! Tests for coordinates and distance

use super::*;

fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).expect("valid coordinate")
}

/// Point `meters` due north of the equator/prime meridian origin.
fn north_of_origin(meters: f64) -> Coordinate {
    coord((meters / EARTH_RADIUS_M).to_degrees(), 0.0)
}

#[test]
fn test_rejects_out_of_range_latitude() {
    assert_eq!(
        Coordinate::new(90.5, 0.0),
        Err(CoordinateError::InvalidLatitude(90.5))
    );
    assert!(Coordinate::new(-91.0, 0.0).is_err());
}

#[test]
fn test_rejects_out_of_range_longitude() {
    assert_eq!(
        Coordinate::new(0.0, 180.1),
        Err(CoordinateError::InvalidLongitude(180.1))
    );
}

#[test]
fn test_rejects_non_finite() {
    assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
}

#[test]
fn test_accepts_range_limits() {
    assert!(Coordinate::new(90.0, 180.0).is_ok());
    assert!(Coordinate::new(-90.0, -180.0).is_ok());
}

#[test]
fn test_parse_from_str() {
    let c: Coordinate = "30.0444, 31.2357".parse().unwrap();
    assert_eq!(c.latitude(), 30.0444);
    assert_eq!(c.longitude(), 31.2357);

    assert!("30.0444".parse::<Coordinate>().is_err());
    assert!("abc,1".parse::<Coordinate>().is_err());
    assert!("95,1".parse::<Coordinate>().is_err());
}

#[test]
fn test_deserialize_validates() {
    let ok: Coordinate = serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5}"#).unwrap();
    assert_eq!(ok, coord(1.5, 2.5));

    let bad = serde_json::from_str::<Coordinate>(r#"{"latitude":100.0,"longitude":2.5}"#);
    assert!(bad.is_err());
}

#[test]
fn test_zero_distance_identity() {
    let cairo = coord(30.0444, 31.2357);
    assert_eq!(distance_meters(&cairo, &cairo), 0.0);

    let pole = coord(90.0, 0.0);
    assert_eq!(distance_meters(&pole, &pole), 0.0);
}

#[test]
fn test_distance_symmetry() {
    let pairs = [
        (coord(30.0444, 31.2357), coord(30.0543, 31.2357)),
        (coord(51.5074, -0.1278), coord(40.7128, -74.0060)),
        (coord(-33.8688, 151.2093), coord(35.6762, 139.6503)),
        (coord(0.0, 179.9), coord(0.0, -179.9)),
    ];

    for (a, b) in pairs {
        let ab = distance_meters(&a, &b);
        let ba = distance_meters(&b, &a);
        assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
    }
}

#[test]
fn test_one_degree_latitude() {
    let d = distance_meters(&coord(0.0, 0.0), &coord(1.0, 0.0));
    assert!((d - 111_195.0).abs() < 1.0, "got {}", d);
}

#[test]
fn test_cairo_scenario_distance() {
    let d = distance_meters(&coord(30.0444, 31.2357), &coord(30.0543, 31.2357));
    assert!((d - 1_100.8).abs() < 1.0, "got {}", d);
}

#[test]
fn test_antipodal_is_half_circumference() {
    let d = distance_meters(&coord(0.0, 0.0), &coord(0.0, 180.0));
    let half = std::f64::consts::PI * EARTH_RADIUS_M;
    assert!(d.is_finite());
    assert!((d - half).abs() < 1.0, "got {}", d);

    let poles = distance_meters(&coord(90.0, 0.0), &coord(-90.0, 0.0));
    assert!((poles - half).abs() < 1.0, "got {}", poles);
}

#[test]
fn test_near_identical_points_stay_finite() {
    let a = coord(45.0, 45.0);
    let b = coord(45.000_000_001, 45.0);
    let d = distance_meters(&a, &b);
    assert!(d.is_finite());
    assert!(d > 0.0 && d < 0.001, "got {}", d);
}

#[test]
fn test_short_meridian_distances() {
    let origin = coord(0.0, 0.0);
    let d = distance_meters(&origin, &north_of_origin(100.5));
    assert!((d - 100.5).abs() < 1e-6, "got {}", d);

    let d = distance_meters(&origin, &north_of_origin(99.0));
    assert!((d - 99.0).abs() < 1e-6, "got {}", d);
}
