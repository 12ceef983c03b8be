//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Significance thresholds and poll period
    pub monitor: MonitorSettings,
    /// Single-shot and watch request options
    pub acquisition: AcquisitionSettings,
    /// Remote persistence of accepted updates
    pub persistence: PersistenceSettings,
    /// Log file location
    pub logging: LoggingSettings,
}

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// Movement in meters that must be exceeded to notify subscribers.
    pub significant_distance_m: f64,
    /// Seconds after which a stationary device still gets a refresh.
    pub min_update_interval_secs: u64,
    /// Seconds between fallback single-shot requests.
    pub poll_interval_secs: u64,
}

/// Acquisition configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionSettings {
    /// Budget for one single-shot request, in seconds.
    pub timeout_secs: u64,
    pub high_accuracy: bool,
    /// Oldest cached fix accepted, in milliseconds (0 = any current fix).
    pub max_cached_age_ms: u64,
}

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceSettings {
    /// Send accepted updates to Supabase.
    pub enabled: bool,
    /// Supabase project URL
    pub url: Option<String>,
    /// Supabase anon API key
    pub api_key: Option<String>,
    /// RPC function that stores a location
    pub rpc_function: String,
    /// HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Records held while the backend is slow; oldest dropped first.
    pub queue_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Directory for log files
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}
