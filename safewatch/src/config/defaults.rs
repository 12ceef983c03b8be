//! Default values for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::location::{
    DEFAULT_ACQUISITION_TIMEOUT, DEFAULT_MIN_UPDATE_INTERVAL, DEFAULT_OUTBOX_CAPACITY,
    DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RPC_FUNCTION,
    DEFAULT_SIGNIFICANT_DISTANCE_M,
};
use crate::logging::{default_log_dir, default_log_file};

/// Default config directory name under the home directory.
pub const CONFIG_DIR_NAME: &str = ".safewatch";

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Default significant distance in meters.
pub const DEFAULT_SIGNIFICANT_DISTANCE: f64 = DEFAULT_SIGNIFICANT_DISTANCE_M;

/// Default forced refresh interval in seconds (5 minutes).
pub const DEFAULT_MIN_UPDATE_INTERVAL_SECS: u64 = DEFAULT_MIN_UPDATE_INTERVAL.as_secs();

/// Default poll interval in seconds (2 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = DEFAULT_POLL_INTERVAL.as_secs();

/// Default single-shot acquisition timeout in seconds.
pub const DEFAULT_ACQUISITION_TIMEOUT_SECS: u64 = DEFAULT_ACQUISITION_TIMEOUT.as_secs();

/// Default persistence HTTP timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = DEFAULT_REQUEST_TIMEOUT.as_secs();

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            monitor: MonitorSettings {
                significant_distance_m: DEFAULT_SIGNIFICANT_DISTANCE,
                min_update_interval_secs: DEFAULT_MIN_UPDATE_INTERVAL_SECS,
                poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            },
            acquisition: AcquisitionSettings {
                timeout_secs: DEFAULT_ACQUISITION_TIMEOUT_SECS,
                high_accuracy: true,
                max_cached_age_ms: 0,
            },
            persistence: PersistenceSettings {
                enabled: false,
                url: None,
                api_key: None,
                rpc_function: DEFAULT_RPC_FUNCTION.to_string(),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                queue_capacity: DEFAULT_OUTBOX_CAPACITY,
            },
            logging: LoggingSettings {
                directory: PathBuf::from(default_log_dir()),
                file: default_log_file().to_string(),
            },
        }
    }
}
