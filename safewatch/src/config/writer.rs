//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let url = config.persistence.url.as_deref().unwrap_or("");
    let api_key = config.persistence.api_key.as_deref().unwrap_or("");

    format!(
        r#"[monitor]
; Movement in meters that counts as a significant change (default: 100)
significant_distance_m = {}
; Seconds after which a stationary device is refreshed anyway (default: 300)
min_update_interval_secs = {}
; Seconds between fallback position requests (default: 120)
poll_interval_secs = {}

[acquisition]
; Budget for a single position request in seconds (default: 30)
timeout_secs = {}
; Request the most precise fix the platform can give (default: true)
high_accuracy = {}
; Oldest cached fix accepted in milliseconds, 0 = any current fix (default: 0)
max_cached_age_ms = {}

[persistence]
; Store significant updates in Supabase (default: false)
enabled = {}
; Supabase project URL, e.g. https://abc.supabase.co
url = {}
; Supabase anon API key
api_key = {}
; RPC function that stores a location (default: record_user_location)
rpc_function = {}
; HTTP timeout in seconds (default: 10)
request_timeout_secs = {}
; Records held while the backend is slow, oldest dropped first (default: 8)
queue_capacity = {}

[logging]
; Directory for log files (default: logs)
directory = {}
; Log file name (default: safewatch.log)
file = {}
"#,
        config.monitor.significant_distance_m,
        config.monitor.min_update_interval_secs,
        config.monitor.poll_interval_secs,
        config.acquisition.timeout_secs,
        config.acquisition.high_accuracy,
        config.acquisition.max_cached_age_ms,
        config.persistence.enabled,
        url,
        api_key,
        config.persistence.rpc_function,
        config.persistence.request_timeout_secs,
        config.persistence.queue_capacity,
        config.logging.directory.to_string_lossy(),
        config.logging.file,
    )
}
