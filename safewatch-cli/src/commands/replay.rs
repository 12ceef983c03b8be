//! Replay command - feed a recorded track through a real location monitor.
//!
//! The track is a JSON-lines file, one reading per line:
//!
//! ```text
//! {"latitude": 30.0444, "longitude": 31.2357, "accuracy_meters": 8.0}
//! {"latitude": 30.0543, "longitude": 31.2357, "accuracy_meters": 12.5}
//! ```
//!
//! Readings are pushed into a [`ChannelPositionSource`] one at a time on a
//! simulated clock spaced `--interval-ms` apart, so time-based refreshes
//! show up exactly as they would on a device.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use safewatch::config::ConfigFile;
use safewatch::geo::Coordinate;
use safewatch::location::{
    spawn_location_logger, ChannelPositionSource, LocationMonitor, LoggingSink, MonitorConfig,
    MonitorStatus, PersistenceSink, PositionReading, PositionSource, SupabaseSession,
    SupabaseSink, DEFAULT_LOG_INTERVAL,
};
use safewatch::logging::init_logging;
use safewatch::time::{now_epoch_ms, Clock, ManualClock};

use crate::error::CliError;

/// How long one reading may take to pass through the update task.
const READING_DEADLINE: Duration = Duration::from_secs(5);

/// Extra time allowed for the outbox to drain after the last reading.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Arguments for the replay command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON-lines track file
    #[arg(long)]
    pub track: PathBuf,

    /// Simulated time between consecutive readings, in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Force an update after every Nth reading
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub force_every: Option<u64>,

    /// Config file to use instead of ~/.safewatch/config.ini
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Supabase user id for persisted records
    #[arg(long, requires = "access_token")]
    pub user_id: Option<String>,

    /// Supabase access token for that user
    #[arg(long, requires = "user_id")]
    pub access_token: Option<String>,

    /// Also log to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

/// One line of a track file.
#[derive(Debug, Clone, Copy, Deserialize)]
struct TrackPoint {
    #[serde(flatten)]
    coordinate: Coordinate,
    #[serde(default)]
    accuracy_meters: f64,
}

/// Replay pacing.
#[derive(Debug, Clone, Copy)]
struct Pacing {
    interval: Duration,
    force_every: Option<u64>,
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let content = std::fs::read_to_string(&args.track).map_err(|error| CliError::TrackRead {
        path: args.track.clone(),
        error,
    })?;
    let points = parse_track(&content)?;
    if points.is_empty() {
        return Err(CliError::Replay("track contains no readings".to_string()));
    }

    let _logging_guard = init_logging(
        &config.logging.directory,
        &config.logging.file,
        args.verbose,
    )
    .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Replay(format!("failed to start runtime: {}", e)))?;

    let pacing = Pacing {
        interval: Duration::from_millis(args.interval_ms),
        force_every: args.force_every,
    };
    let monitor_config = config.monitor_config();

    let status = runtime.block_on(async {
        match config.supabase_config() {
            Some(supabase) => {
                let sink = SupabaseSink::new(supabase).map_err(CliError::Persistence)?;
                match (args.user_id.clone(), args.access_token.clone()) {
                    (Some(user_id), Some(access_token)) => sink.set_session(Some(SupabaseSession {
                        user_id,
                        access_token,
                    })),
                    _ => tracing::warn!("No Supabase session given, records will be skipped"),
                }
                replay(&points, sink, monitor_config, pacing).await
            }
            None => replay(&points, LoggingSink, monitor_config, pacing).await,
        }
    })?;

    print_summary(&args.track, points.len(), &status);
    Ok(())
}

/// Parse a JSON-lines track. Blank lines are skipped.
fn parse_track(content: &str) -> Result<Vec<TrackPoint>, CliError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| CliError::TrackLine {
                line: index + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Drive `points` through a fresh monitor and return its final status.
async fn replay<K>(
    points: &[TrackPoint],
    sink: K,
    config: MonitorConfig,
    pacing: Pacing,
) -> Result<MonitorStatus, CliError>
where
    K: PersistenceSink + 'static,
{
    let Some((first, rest)) = points.split_first() else {
        return Err(CliError::Replay("track contains no readings".to_string()));
    };

    let clock = Arc::new(ManualClock::new(now_epoch_ms()));
    let source = Arc::new(ChannelPositionSource::new().with_clock(clock.clone()));
    let monitor = LocationMonitor::with_clock(source.clone(), sink, config, clock.clone());

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    monitor.on_location_change(move |event| {
        let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
        match event.previous {
            Some(previous) => println!(
                "#{:<4} {}  ({:.1} m from {})",
                n,
                event.new,
                previous.distance_to(&event.new),
                previous
            ),
            None => println!("#{:<4} {}  (first fix)", n, event.new),
        }
    });

    let cancellation = CancellationToken::new();
    if tracing::enabled!(tracing::Level::DEBUG) {
        spawn_location_logger(monitor.clone(), cancellation.clone(), DEFAULT_LOG_INTERVAL);
    }

    source.push(to_reading(first, clock.as_ref()));
    let start = monitor.initialize().await?;
    println!("Start {}", start);

    let mut expected = 0u64;
    for (index, point) in rest.iter().enumerate() {
        let reading_number = index as u64 + 2;

        clock.advance(pacing.interval);
        source.push(to_reading(point, clock.as_ref()));
        expected += 1;
        wait_for_processed(&monitor, expected, reading_number).await?;

        if pacing.force_every.is_some_and(|n| reading_number % n == 0) {
            if monitor.force_location_update().await.is_some() {
                expected += 1;
            } else {
                tracing::warn!(reading = reading_number, "Forced update produced no location");
            }
        }
    }

    drain_outbox(&monitor).await;

    let status = monitor.status();
    cancellation.cancel();
    monitor.stop();
    Ok(status)
}

fn to_reading(point: &TrackPoint, clock: &ManualClock) -> PositionReading {
    PositionReading::new(point.coordinate, point.accuracy_meters, clock.now_ms())
}

async fn wait_for_processed<S, K>(
    monitor: &LocationMonitor<S, K>,
    expected: u64,
    reading_number: u64,
) -> Result<(), CliError>
where
    S: PositionSource + 'static,
    K: PersistenceSink + 'static,
{
    let wait = async {
        while monitor.status().readings_processed < expected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    tokio::time::timeout(READING_DEADLINE, wait)
        .await
        .map_err(|_| CliError::Replay(format!("reading {} was not processed", reading_number)))
}

/// Give the persistence worker a chance to finish queued records.
async fn drain_outbox<S, K>(monitor: &LocationMonitor<S, K>)
where
    S: PositionSource + 'static,
    K: PersistenceSink + 'static,
{
    let wait = async {
        while monitor.outbox_stats().pending > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    if tokio::time::timeout(DRAIN_GRACE, wait).await.is_err() {
        tracing::warn!(
            pending = monitor.outbox_stats().pending,
            "Persistence outbox still busy at end of replay"
        );
    }
}

fn print_summary(track: &std::path::Path, readings: usize, status: &MonitorStatus) {
    let outbox = &status.outbox;

    println!();
    println!("Replayed {} readings from {}", readings, track.display());
    println!("  Readings processed:  {}", status.readings_processed);
    println!("  Significant updates: {}", status.significant_updates);
    println!(
        "  Outbox: {} enqueued, {} persisted, {} skipped (no session), {} failed, {} dropped",
        outbox.enqueued,
        outbox.persisted,
        outbox.skipped_unauthenticated,
        outbox.failed,
        outbox.dropped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use safewatch::location::{MonitorPhase, NoopSink, PositionOptions};

    fn fast_config() -> MonitorConfig {
        let options = PositionOptions {
            timeout: Duration::from_millis(500),
            ..Default::default()
        };
        MonitorConfig {
            acquisition: options.clone(),
            watch: options,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_track() {
        let content = r#"
{"latitude": 30.0444, "longitude": 31.2357, "accuracy_meters": 8.0}

{"latitude": 30.0543, "longitude": 31.2357}
"#;

        let points = parse_track(content).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].coordinate.latitude(), 30.0444);
        assert_eq!(points[0].accuracy_meters, 8.0);
        assert_eq!(points[1].accuracy_meters, 0.0);
    }

    #[test]
    fn test_parse_track_reports_invalid_coordinate_line() {
        let content = "{\"latitude\": 1.0, \"longitude\": 2.0}\n{\"latitude\": 91.0, \"longitude\": 0.0}\n";

        match parse_track(content) {
            Err(CliError::TrackLine { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("latitude"), "message: {message}");
            }
            other => panic!("expected TrackLine error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_track_reports_malformed_json() {
        let result = parse_track("not json\n");
        assert!(matches!(result, Err(CliError::TrackLine { line: 1, .. })));
    }

    #[tokio::test]
    async fn test_replay_counts_significant_changes() {
        let points = parse_track(
            r#"{"latitude": 30.0444, "longitude": 31.2357}
{"latitude": 30.0444, "longitude": 31.2357}
{"latitude": 30.0543, "longitude": 31.2357}
{"latitude": 30.0544, "longitude": 31.2357}"#,
        )
        .unwrap();
        let pacing = Pacing {
            interval: Duration::from_secs(10),
            force_every: None,
        };

        let status = replay(&points, NoopSink, fast_config(), pacing).await.unwrap();

        assert_eq!(status.phase, MonitorPhase::Active);
        assert_eq!(status.readings_processed, 3);
        assert_eq!(status.significant_updates, 1);
        assert_eq!(status.outbox.enqueued, 1);
    }

    #[tokio::test]
    async fn test_replay_forced_updates() {
        let points = parse_track(
            r#"{"latitude": 1.0, "longitude": 1.0}
{"latitude": 1.0, "longitude": 1.0}
{"latitude": 1.0, "longitude": 1.0}
{"latitude": 1.0, "longitude": 1.0}"#,
        )
        .unwrap();
        let pacing = Pacing {
            interval: Duration::from_secs(1),
            force_every: Some(2),
        };

        let status = replay(&points, NoopSink, fast_config(), pacing).await.unwrap();

        // Readings 2 and 4 are each followed by a forced update
        assert_eq!(status.readings_processed, 5);
        assert_eq!(status.significant_updates, 2);
    }
}
