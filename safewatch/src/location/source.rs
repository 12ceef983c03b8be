//! Position Source - the platform location API seen by the monitor.
//!
//! Mirrors the two shapes every platform exposes:
//!
//! - [`PositionSource::get_current_position`] - single-shot request (pull)
//! - [`PositionSource::watch_position`] - continuous stream of readings (push),
//!   cancelled with [`PositionSource::clear_watch`]

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use super::state::PositionReading;

/// Default single-shot acquisition budget (30 seconds).
pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors reported by a position source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// No reading arrived within the timeout budget.
    #[error("Timed out after {timeout_ms}ms waiting for a position")]
    Timeout { timeout_ms: u64 },

    /// The user or platform denied location access.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The sensor or platform service failed.
    #[error("Location sensor unavailable: {0}")]
    Unavailable(String),
}

impl AcquisitionError {
    pub(crate) fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Options for position requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for the most precise fix the platform can give.
    pub high_accuracy: bool,

    /// How long a single-shot request may take.
    pub timeout: Duration,

    /// Oldest cached fix the platform may answer with (zero = any cached fix
    /// the source considers current).
    pub max_cached_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_ACQUISITION_TIMEOUT,
            max_cached_age: Duration::ZERO,
        }
    }
}

/// Identifier of an active watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// Item delivered by a watch: a reading or a per-tick error.
pub type WatchItem = Result<PositionReading, AcquisitionError>;

/// An active watch subscription.
///
/// The stream ends when the source clears the watch or shuts down.
#[derive(Debug)]
pub struct Watch {
    pub id: WatchId,
    pub readings: mpsc::Receiver<WatchItem>,
}

/// Platform location API consumed by the monitor.
pub trait PositionSource: Send + Sync {
    /// Request a single fresh reading.
    fn get_current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionReading, AcquisitionError>> + Send;

    /// Start a continuous watch.
    fn watch_position(&self, options: &PositionOptions) -> Result<Watch, AcquisitionError>;

    /// Cancel a watch. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}

// Allow a shared source to be handed to the monitor while the host keeps a handle
impl<S: PositionSource> PositionSource for Arc<S> {
    fn get_current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<PositionReading, AcquisitionError>> + Send {
        (**self).get_current_position(options)
    }

    fn watch_position(&self, options: &PositionOptions) -> Result<Watch, AcquisitionError> {
        (**self).watch_position(options)
    }

    fn clear_watch(&self, id: WatchId) {
        (**self).clear_watch(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PositionOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_cached_age, Duration::ZERO);
    }

    #[test]
    fn test_timeout_error_message() {
        let err = AcquisitionError::timeout(Duration::from_millis(1500));
        assert_eq!(err, AcquisitionError::Timeout { timeout_ms: 1500 });
        assert_eq!(
            err.to_string(),
            "Timed out after 1500ms waiting for a position"
        );
    }

    #[test]
    fn test_watch_id_display() {
        assert_eq!(WatchId(7).to_string(), "watch-7");
    }
}
