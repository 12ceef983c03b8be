//! Persistence Sink - remote storage for accepted location updates.
//!
//! The monitor never calls a sink directly; records go through the
//! [`PersistenceOutbox`](super::PersistenceOutbox) so a slow or failing
//! backend never delays the next reading.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::geo::Coordinate;

/// Source tag stored with every record.
pub const GPS_SOURCE: &str = "gps";

/// An accepted location update, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRecord {
    pub coordinate: Coordinate,
    pub accuracy_meters: f64,
    /// When the update was accepted (Unix epoch ms).
    pub recorded_at_ms: i64,
    pub source: &'static str,
}

impl LocationRecord {
    pub fn gps(coordinate: Coordinate, accuracy_meters: f64, recorded_at_ms: i64) -> Self {
        Self {
            coordinate,
            accuracy_meters,
            recorded_at_ms,
            source: GPS_SOURCE,
        }
    }
}

/// Errors from a persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// No signed-in user; the record is skipped, not retried.
    #[error("No authenticated session")]
    AuthRequired,

    /// The remote call failed.
    #[error("Remote persistence failed: {0}")]
    Remote(String),
}

/// Remote store for accepted location updates.
pub trait PersistenceSink: Send + Sync {
    /// Store one record for the current user.
    fn record_location(
        &self,
        record: LocationRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

impl<K: PersistenceSink> PersistenceSink for Arc<K> {
    fn record_location(
        &self,
        record: LocationRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        (**self).record_location(record)
    }
}

/// Sink that accepts and discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl PersistenceSink for NoopSink {
    async fn record_location(&self, _record: LocationRecord) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Sink that writes each record to the log at INFO level.
///
/// Used when remote persistence is disabled but the operator still wants to
/// see what would have been stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl PersistenceSink for LoggingSink {
    async fn record_location(&self, record: LocationRecord) -> Result<(), PersistenceError> {
        tracing::info!(
            latitude = record.coordinate.latitude(),
            longitude = record.coordinate.longitude(),
            accuracy_m = record.accuracy_meters,
            recorded_at_ms = record.recorded_at_ms,
            source = record.source,
            "Location recorded"
        );
        Ok(())
    }
}
