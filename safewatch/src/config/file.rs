//! Configuration file loading and saving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use super::settings::ConfigFile;
use crate::location::{
    ChangeDetectorConfig, MonitorConfig, PositionOptions, SupabaseConfig,
    DEFAULT_UPDATE_QUEUE_CAPACITY,
};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.safewatch/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.safewatch/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Render the file as it would be written by `save_to`.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Runtime configuration for the location monitor.
    pub fn monitor_config(&self) -> MonitorConfig {
        let acquisition = PositionOptions {
            high_accuracy: self.acquisition.high_accuracy,
            timeout: Duration::from_secs(self.acquisition.timeout_secs),
            max_cached_age: Duration::from_millis(self.acquisition.max_cached_age_ms),
        };

        MonitorConfig {
            detector: ChangeDetectorConfig {
                significant_distance_m: self.monitor.significant_distance_m,
                min_update_interval: Duration::from_secs(self.monitor.min_update_interval_secs),
            },
            watch: acquisition.clone(),
            acquisition,
            poll_interval: Duration::from_secs(self.monitor.poll_interval_secs),
            update_queue_capacity: DEFAULT_UPDATE_QUEUE_CAPACITY,
            outbox_capacity: self.persistence.queue_capacity,
        }
    }

    /// Supabase settings, if persistence is enabled and fully configured.
    pub fn supabase_config(&self) -> Option<SupabaseConfig> {
        if !self.persistence.enabled {
            return None;
        }
        let (url, api_key) = match (&self.persistence.url, &self.persistence.api_key) {
            (Some(url), Some(api_key)) => (url, api_key),
            _ => {
                tracing::warn!("Persistence enabled but url or api_key missing, not persisting");
                return None;
            }
        };

        Some(SupabaseConfig {
            rpc_function: self.persistence.rpc_function.clone(),
            request_timeout: Duration::from_secs(self.persistence.request_timeout_secs),
            ..SupabaseConfig::new(url.as_str(), api_key.as_str())
        })
    }
}

/// Get the path to the config directory (~/.safewatch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.safewatch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}
