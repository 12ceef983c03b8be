//! Core state types for location monitoring.
//!
//! - [`PositionReading`] - One sample from the position source
//! - [`LocationChangeEvent`] - Delivered to subscribers on a significant change
//! - [`MonitorPhase`] - Lifecycle phase of a [`LocationMonitor`](super::LocationMonitor)
//! - [`MonitorStatus`] - Snapshot for consumers and diagnostics

use std::fmt;

use serde::{Deserialize, Serialize};

use super::outbox::OutboxStats;
use crate::geo::Coordinate;

/// A single reading from the position source.
///
/// Readings are ephemeral: the monitor keeps only the coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionReading {
    /// Where the device was.
    pub coordinate: Coordinate,

    /// Horizontal accuracy radius reported by the sensor, in meters.
    pub accuracy_meters: f64,

    /// When the sensor captured the fix (Unix epoch milliseconds).
    pub captured_at_ms: i64,
}

impl PositionReading {
    pub fn new(coordinate: Coordinate, accuracy_meters: f64, captured_at_ms: i64) -> Self {
        Self {
            coordinate,
            accuracy_meters,
            captured_at_ms,
        }
    }
}

/// A significant location change.
///
/// `previous` is `None` only when no location had been recorded before.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationChangeEvent {
    pub new: Coordinate,
    pub previous: Option<Coordinate>,
}

/// Lifecycle phase of a location monitor.
///
/// ```text
/// Uninitialized --initialize()--> Initializing --ok--> Active --stop()--> Stopped
///                                      |                                     |
///                                      +--error--> (previous idle phase)     |
///        Stopped --initialize()--> Initializing  <---------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorPhase {
    /// Never initialized.
    #[default]
    Uninitialized,
    /// Waiting for the first authoritative reading.
    Initializing,
    /// Watch and poll are running.
    Active,
    /// Stopped explicitly; needs a fresh `initialize()`.
    Stopped,
}

impl MonitorPhase {
    /// True for phases in which no monitoring runs.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Stopped)
    }
}

impl fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Active => write!(f, "Active"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Point-in-time view of a monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub phase: MonitorPhase,

    /// Latest raw coordinate, significant or not.
    pub current: Option<Coordinate>,

    /// When the last significant update was accepted (Unix epoch ms, 0 if never).
    pub last_significant_update_ms: i64,

    /// Readings run through the update handler since the last `initialize()`.
    pub readings_processed: u64,

    /// Readings that were significant (forced updates included).
    pub significant_updates: u64,

    /// Live subscriber count.
    pub subscribers: usize,

    /// Persistence outbox counters.
    pub outbox: OutboxStats,
}
