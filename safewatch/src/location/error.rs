//! Error types for the location monitor.

use thiserror::Error;

use super::source::AcquisitionError;

/// Errors returned by [`LocationMonitor`](super::LocationMonitor) lifecycle calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The initial reading could not be acquired. The caller decides whether to retry.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] AcquisitionError),

    /// Another `initialize()` call is still waiting for its reading.
    #[error("Initialization already in progress")]
    AlreadyInitializing,

    /// `stop()` was called while initialization was in progress.
    #[error("Initialization cancelled by stop")]
    Cancelled,
}
