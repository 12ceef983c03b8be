//! Configuration file handling for `~/.safewatch/config.ini`.
//!
//! - [`settings`] - one struct per `[section]`
//! - [`defaults`] - `DEFAULT_*` constants and `ConfigFile::default()`
//! - [`parser`] - `Ini` → `ConfigFile`
//! - [`writer`] - `ConfigFile` → commented INI
//! - [`file`] - load/save and conversion into runtime configs
//!
//! # Example
//!
//! ```ignore
//! use safewatch::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let monitor_config = config.monitor_config();
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    AcquisitionSettings, ConfigFile, LoggingSettings, MonitorSettings, PersistenceSettings,
};
