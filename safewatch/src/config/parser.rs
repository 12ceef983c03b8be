//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [monitor] section
    if let Some(section) = ini.section(Some("monitor")) {
        if let Some(v) = section.get("significant_distance_m") {
            let distance: f64 = parse_value(
                "monitor",
                "significant_distance_m",
                v,
                "must be a positive number (meters)",
            )?;
            if !(distance.is_finite() && distance > 0.0) {
                return Err(invalid(
                    "monitor",
                    "significant_distance_m",
                    v,
                    "must be a positive number (meters)",
                ));
            }
            config.monitor.significant_distance_m = distance;
        }
        if let Some(v) = section.get("min_update_interval_secs") {
            config.monitor.min_update_interval_secs =
                parse_positive("monitor", "min_update_interval_secs", v)?;
        }
        if let Some(v) = section.get("poll_interval_secs") {
            config.monitor.poll_interval_secs = parse_positive("monitor", "poll_interval_secs", v)?;
        }
    }

    // [acquisition] section
    if let Some(section) = ini.section(Some("acquisition")) {
        if let Some(v) = section.get("timeout_secs") {
            config.acquisition.timeout_secs = parse_positive("acquisition", "timeout_secs", v)?;
        }
        if let Some(v) = section.get("high_accuracy") {
            config.acquisition.high_accuracy = parse_bool(v);
        }
        if let Some(v) = section.get("max_cached_age_ms") {
            config.acquisition.max_cached_age_ms = parse_value(
                "acquisition",
                "max_cached_age_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
    }

    // [persistence] section
    if let Some(section) = ini.section(Some("persistence")) {
        if let Some(v) = section.get("enabled") {
            config.persistence.enabled = parse_bool(v);
        }
        if let Some(v) = section.get("url") {
            config.persistence.url = non_empty(v);
        }
        if let Some(v) = section.get("api_key") {
            config.persistence.api_key = non_empty(v);
        }
        if let Some(v) = section.get("rpc_function") {
            if let Some(name) = non_empty(v) {
                config.persistence.rpc_function = name;
            }
        }
        if let Some(v) = section.get("request_timeout_secs") {
            config.persistence.request_timeout_secs =
                parse_positive("persistence", "request_timeout_secs", v)?;
        }
        if let Some(v) = section.get("queue_capacity") {
            let capacity = parse_positive("persistence", "queue_capacity", v)?;
            config.persistence.queue_capacity = usize::try_from(capacity)
                .map_err(|_| invalid("persistence", "queue_capacity", v, "value too large"))?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            if let Some(dir) = non_empty(v) {
                config.logging.directory = expand_tilde(&dir);
            }
        }
        if let Some(v) = section.get("file") {
            if let Some(file) = non_empty(v) {
                config.logging.file = file;
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

/// Parse an integer that must be greater than zero.
fn parse_positive(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    const REASON: &str = "must be a positive integer";
    match parse_value(section, key, value, REASON)? {
        0 => Err(invalid(section, key, value, REASON)),
        n => Ok(n),
    }
}

fn non_empty(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
