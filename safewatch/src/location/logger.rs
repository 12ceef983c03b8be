//! Periodic location status logging.
//!
//! Spawns a background task that logs the monitor status at regular
//! intervals, useful when tuning thresholds against a real track.
//!
//! # Usage
//!
//! ```ignore
//! use safewatch::location::spawn_location_logger;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancellation = CancellationToken::new();
//! let handle = spawn_location_logger(
//!     monitor.clone(),
//!     cancellation.clone(),
//!     std::time::Duration::from_secs(30),
//! );
//! ```
//!
//! # Output Format
//!
//! Logs are emitted at DEBUG level with structured fields:
//! - `phase` - Monitor lifecycle phase
//! - `lat`, `lon` - Current coordinate in decimal degrees
//! - `since_update` - Time since the last significant update (e.g. "4m12s")
//! - `processed`, `significant` - Reading counters
//! - `outbox_pending`, `outbox_dropped` - Persistence backlog

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::monitor::LocationMonitor;
use super::sink::PersistenceSink;
use super::source::PositionSource;
use crate::time::now_epoch_ms;

/// Default logging interval (30 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns a background task that periodically logs monitor status.
///
/// The logger runs at DEBUG level only and stops when the cancellation token
/// is triggered. Callers should check `tracing::enabled!(tracing::Level::DEBUG)`
/// before spawning.
pub fn spawn_location_logger<S, K>(
    monitor: LocationMonitor<S, K>,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()>
where
    S: PositionSource + 'static,
    K: PersistenceSink + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_status(&monitor);
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("Location logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_status<S, K>(monitor: &LocationMonitor<S, K>)
where
    S: PositionSource + 'static,
    K: PersistenceSink + 'static,
{
    let status = monitor.status();
    let since_update = format_age(now_epoch_ms(), status.last_significant_update_ms);

    if let Some(current) = status.current {
        tracing::debug!(
            phase = %status.phase,
            lat = format!("{:.5}", current.latitude()),
            lon = format!("{:.5}", current.longitude()),
            since_update = %since_update,
            processed = status.readings_processed,
            significant = status.significant_updates,
            outbox_pending = status.outbox.pending,
            outbox_dropped = status.outbox.dropped,
            "Location status"
        );
    } else {
        tracing::debug!(phase = %status.phase, "Location status (no fix)");
    }
}

/// Formats the time since `last_ms` as "1h02m", "4m12s" or "9s".
fn format_age(now_ms: i64, last_ms: i64) -> String {
    if last_ms <= 0 {
        return "never".to_string();
    }

    let secs = now_ms.saturating_sub(last_ms).max(0) / 1000;
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{}h{:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{ChannelPositionSource, MonitorConfig, NoopSink};

    #[test]
    fn test_format_age_never() {
        assert_eq!(format_age(1_000, 0), "never");
    }

    #[test]
    fn test_format_age_units() {
        assert_eq!(format_age(9_500, 500), "9s");
        assert_eq!(format_age(252_000, 1), "4m11s");
        assert_eq!(format_age(3_720_001, 1), "1h02m");
    }

    #[test]
    fn test_format_age_clock_skew() {
        // Last update in the future reads as zero
        assert_eq!(format_age(1_000, 5_000), "0s");
    }

    #[tokio::test]
    async fn test_logger_stops_on_cancel() {
        let monitor = LocationMonitor::new(
            ChannelPositionSource::new(),
            NoopSink,
            MonitorConfig::default(),
        );
        let cancellation = CancellationToken::new();
        let handle =
            spawn_location_logger(monitor, cancellation.clone(), Duration::from_millis(5));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancellation.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("logger did not stop")
            .unwrap();
    }
}
