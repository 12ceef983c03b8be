//! Change Detector - decides whether a reading warrants an update.
//!
//! A reading is significant when any of these hold:
//! 1. There is no previous location (first fix)
//! 2. It moved farther than `significant_distance_m` from the previous location
//! 3. More than `min_update_interval` elapsed since the last significant update
//!
//! Rule 3 is a forced refresh so downstream consumers never go stale while
//! the device sits still.

use std::time::Duration;

use crate::geo::{distance_meters, Coordinate};
use crate::time::duration_to_ms;

/// Default distance threshold (100 m).
pub const DEFAULT_SIGNIFICANT_DISTANCE_M: f64 = 100.0;

/// Default forced-refresh interval (5 minutes).
pub const DEFAULT_MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Thresholds for the change detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDetectorConfig {
    /// Movement (meters) that must be exceeded to count as significant.
    pub significant_distance_m: f64,

    /// Elapsed time that must be exceeded to force a refresh.
    pub min_update_interval: Duration,
}

impl Default for ChangeDetectorConfig {
    fn default() -> Self {
        Self {
            significant_distance_m: DEFAULT_SIGNIFICANT_DISTANCE_M,
            min_update_interval: DEFAULT_MIN_UPDATE_INTERVAL,
        }
    }
}

/// Why a reading was (or was not) significant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Significance {
    /// No previous location.
    FirstFix,
    /// Moved beyond the distance threshold.
    Moved { distance_m: f64 },
    /// Stationary, but the refresh interval elapsed.
    Refresh { elapsed_ms: i64 },
    /// Below both thresholds.
    Insignificant { distance_m: f64, elapsed_ms: i64 },
}

impl Significance {
    #[inline]
    pub fn is_significant(&self) -> bool {
        !matches!(self, Self::Insignificant { .. })
    }
}

/// Stateless significance check over a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    config: ChangeDetectorConfig,
}

impl ChangeDetector {
    pub fn new(config: ChangeDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChangeDetectorConfig {
        &self.config
    }

    /// Returns true when `new` should be persisted and broadcast.
    pub fn is_significant(
        &self,
        new: &Coordinate,
        previous: Option<&Coordinate>,
        last_significant_update_ms: i64,
        now_ms: i64,
    ) -> bool {
        self.classify(new, previous, last_significant_update_ms, now_ms)
            .is_significant()
    }

    /// Like [`is_significant`](Self::is_significant) but reports which rule fired.
    pub fn classify(
        &self,
        new: &Coordinate,
        previous: Option<&Coordinate>,
        last_significant_update_ms: i64,
        now_ms: i64,
    ) -> Significance {
        let Some(previous) = previous else {
            return Significance::FirstFix;
        };

        let distance_m = distance_meters(new, previous);
        if distance_m > self.config.significant_distance_m {
            return Significance::Moved { distance_m };
        }

        let elapsed_ms = now_ms.saturating_sub(last_significant_update_ms);
        if elapsed_ms > duration_to_ms(self.config.min_update_interval) {
            return Significance::Refresh { elapsed_ms };
        }

        Significance::Insignificant {
            distance_m,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_M;

    const NOW: i64 = 1_700_000_000_000;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn north_of_origin(meters: f64) -> Coordinate {
        coord((meters / EARTH_RADIUS_M).to_degrees(), 0.0)
    }

    #[test]
    fn test_first_reading_is_significant() {
        let detector = ChangeDetector::default();

        for (lat, lon) in [(0.0, 0.0), (30.0444, 31.2357), (-89.9, 179.9)] {
            assert!(detector.is_significant(&coord(lat, lon), None, NOW, NOW));
            assert!(detector.is_significant(&coord(lat, lon), None, 0, 0));
        }
        assert_eq!(
            detector.classify(&coord(1.0, 1.0), None, NOW, NOW),
            Significance::FirstFix
        );
    }

    #[test]
    fn test_distance_threshold_boundary() {
        let detector = ChangeDetector::default();
        let origin = coord(0.0, 0.0);
        let last = NOW - 1_000;

        assert!(detector.is_significant(&north_of_origin(100.5), Some(&origin), last, NOW));
        assert!(!detector.is_significant(&north_of_origin(99.0), Some(&origin), last, NOW));
    }

    #[test]
    fn test_stationary_within_interval_is_not_significant() {
        let detector = ChangeDetector::default();
        let origin = coord(0.0, 0.0);

        assert!(!detector.is_significant(&origin, Some(&origin), NOW, NOW));
        assert!(!detector.is_significant(&origin, Some(&origin), NOW - 10_000, NOW));
    }

    #[test]
    fn test_time_forced_refresh() {
        let detector = ChangeDetector::default();
        let here = coord(30.0444, 31.2357);
        let interval_ms = duration_to_ms(DEFAULT_MIN_UPDATE_INTERVAL);

        let last = NOW - interval_ms - 1;
        assert!(detector.is_significant(&here, Some(&here), last, NOW));
        assert_eq!(
            detector.classify(&here, Some(&here), last, NOW),
            Significance::Refresh {
                elapsed_ms: interval_ms + 1
            }
        );

        // Exactly the interval is not enough
        let last = NOW - interval_ms;
        assert!(!detector.is_significant(&here, Some(&here), last, NOW));
    }

    #[test]
    fn test_insignificant_reports_measurements() {
        let detector = ChangeDetector::default();
        let origin = coord(0.0, 0.0);
        let result = detector.classify(&north_of_origin(10.0), Some(&origin), NOW - 500, NOW);

        match result {
            Significance::Insignificant {
                distance_m,
                elapsed_ms,
            } => {
                assert!((distance_m - 10.0).abs() < 1e-6);
                assert_eq!(elapsed_ms, 500);
            }
            other => panic!("expected insignificant, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let detector = ChangeDetector::new(ChangeDetectorConfig {
            significant_distance_m: 10.0,
            min_update_interval: Duration::from_secs(1),
        });
        let origin = coord(0.0, 0.0);

        assert!(detector.is_significant(&north_of_origin(11.0), Some(&origin), NOW, NOW));
        assert!(detector.is_significant(&origin, Some(&origin), NOW - 1_001, NOW));
        assert!(!detector.is_significant(&origin, Some(&origin), NOW - 999, NOW));
    }

    #[test]
    fn test_clock_going_backwards_is_not_a_refresh() {
        let detector = ChangeDetector::default();
        let here = coord(10.0, 10.0);

        assert!(!detector.is_significant(&here, Some(&here), NOW, NOW - 60_000));
    }
}
