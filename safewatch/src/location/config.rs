//! Configuration for the location monitor.

use std::time::Duration;

use super::detector::ChangeDetectorConfig;
use super::outbox::DEFAULT_OUTBOX_CAPACITY;
use super::source::PositionOptions;

/// Default fallback poll period (2 minutes).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Default capacity of the update queue shared by watch and poll.
pub const DEFAULT_UPDATE_QUEUE_CAPACITY: usize = 64;

/// Configuration for [`LocationMonitor`](super::LocationMonitor).
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Significance thresholds.
    pub detector: ChangeDetectorConfig,

    /// Options for single-shot requests (initialize, poll, forced update).
    pub acquisition: PositionOptions,

    /// Options for the continuous watch.
    pub watch: PositionOptions,

    /// Period of the fallback poll.
    pub poll_interval: Duration,

    /// Capacity of the serialized update queue.
    pub update_queue_capacity: usize,

    /// Capacity of the persistence outbox.
    pub outbox_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detector: ChangeDetectorConfig::default(),
            acquisition: PositionOptions::default(),
            watch: PositionOptions::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            update_queue_capacity: DEFAULT_UPDATE_QUEUE_CAPACITY,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.detector.significant_distance_m, 100.0);
        assert_eq!(config.detector.min_update_interval, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_secs(120));
        assert_eq!(config.acquisition.timeout, Duration::from_secs(30));
        assert!(config.acquisition.high_accuracy);
        assert_eq!(config.outbox_capacity, 8);
    }
}
