//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`distance`] - Distance between two coordinates
//! - [`replay`] - Replay a JSON-lines track through a monitor

pub mod config;
pub mod distance;
pub mod replay;
