//! SafeWatch - background location monitoring
//!
//! Tracks the device position in the background and tells the rest of the
//! process when it changes in a way that matters: the device moved farther
//! than a distance threshold, or enough time passed that a refresh is due.
//!
//! # High-Level API
//!
//! ```ignore
//! use safewatch::config::ConfigFile;
//! use safewatch::location::{ChannelPositionSource, LocationMonitor, LoggingSink};
//!
//! let config = ConfigFile::load()?;
//! let source = Arc::new(ChannelPositionSource::new());
//! let monitor = LocationMonitor::new(source.clone(), LoggingSink, config.monitor_config());
//!
//! monitor.on_location_change(|event| println!("now at {}", event.new));
//! monitor.initialize().await?;
//! ```
//!
//! # Modules
//!
//! - [`geo`] - validated coordinates and great-circle distance
//! - [`location`] - the monitor, its sources, sinks and subscribers
//! - [`config`] - `~/.safewatch/config.ini`
//! - [`logging`] - tracing subscriber setup
//! - [`time`] - injectable clock

pub mod config;
pub mod geo;
pub mod location;
pub mod logging;
pub mod time;

/// Version of the SafeWatch library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
