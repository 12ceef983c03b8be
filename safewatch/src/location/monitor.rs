//! Location Monitor - owns the current location and drives acquisition.
//!
//! # Update Path
//!
//! Two producers feed one consumer:
//!
//! ```text
//! watch_position() stream ──┐
//!                           ├──> mpsc (bounded) ──> update task ──> ChangeDetector
//! poll timer (every 2 min) ─┤                                           │
//! force_location_update() ──┘                          significant? ────┤
//!                                                       ├─ PersistenceOutbox (no wait)
//!                                                       └─ SubscriberRegistry::notify
//! ```
//!
//! Only the update task mutates location state, so readings are processed
//! strictly in arrival order. A forced update queues behind any reading
//! already in the channel.
//!
//! # Sessions
//!
//! Each successful `initialize()` starts a new session with its own
//! cancellation token. `stop()` cancels the token; every state mutation
//! first checks that its session is still the active one, so results from a
//! stopped session are discarded.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::config::MonitorConfig;
use super::detector::{ChangeDetector, Significance};
use super::error::MonitorError;
use super::outbox::{OutboxStats, PersistenceOutbox};
use super::registry::{SubscriberRegistry, Subscription};
use super::sink::{LocationRecord, PersistenceSink};
use super::source::{AcquisitionError, PositionOptions, PositionSource, Watch, WatchId};
use super::state::{LocationChangeEvent, MonitorPhase, MonitorStatus, PositionReading};
use crate::geo::Coordinate;
use crate::time::{Clock, SystemClock};

/// Shortest period between poll requests; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);

/// Which producer delivered a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadingOrigin {
    Watch,
    Poll,
}

impl fmt::Display for ReadingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watch => write!(f, "watch"),
            Self::Poll => write!(f, "poll"),
        }
    }
}

/// Work item for the update task.
enum UpdateCommand {
    Reading {
        reading: PositionReading,
        origin: ReadingOrigin,
    },
    Forced {
        reading: PositionReading,
        reply: oneshot::Sender<Option<Coordinate>>,
    },
}

/// Handles of a running monitoring session.
struct ActiveSession {
    id: u64,
    cancellation: CancellationToken,
    updates: mpsc::Sender<UpdateCommand>,
    watch_id: Option<WatchId>,
}

/// Mutable monitor state, guarded by one mutex.
#[derive(Default)]
struct MonitorState {
    phase: MonitorPhase,
    current: Option<Coordinate>,
    last_significant_update_ms: i64,
    session: Option<ActiveSession>,
    init_attempt: u64,
    readings_processed: u64,
    significant_updates: u64,
}

impl MonitorState {
    fn is_session_active(&self, session_id: u64) -> bool {
        self.phase == MonitorPhase::Active
            && self.session.as_ref().is_some_and(|s| s.id == session_id)
    }
}

struct MonitorInner<S, K> {
    source: Arc<S>,
    sink: Arc<K>,
    config: MonitorConfig,
    detector: ChangeDetector,
    clock: Arc<dyn Clock>,
    registry: SubscriberRegistry,
    outbox: PersistenceOutbox,
    state: Mutex<MonitorState>,
    next_session: AtomicU64,
}

impl<S, K> Drop for MonitorInner<S, K> {
    fn drop(&mut self) {
        if let Some(session) = self.state.get_mut().session.take() {
            session.cancellation.cancel();
        }
    }
}

/// Background location monitor.
///
/// Construct one per process and share it by cloning (clones share state).
/// The lifecycle is explicit: [`initialize`](Self::initialize) starts
/// monitoring, [`stop`](Self::stop) ends it.
///
/// # Example
///
/// ```ignore
/// let monitor = LocationMonitor::new(source, sink, MonitorConfig::default());
/// let subscription = monitor.on_location_change(|event| {
///     println!("moved to {} (from {:?})", event.new, event.previous);
/// });
///
/// monitor.initialize().await?;
/// // ...
/// monitor.stop();
/// ```
pub struct LocationMonitor<S, K> {
    inner: Arc<MonitorInner<S, K>>,
}

impl<S, K> Clone for LocationMonitor<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, K> LocationMonitor<S, K>
where
    S: PositionSource + 'static,
    K: PersistenceSink + 'static,
{
    /// Create a monitor using the system clock.
    pub fn new(source: S, sink: K, config: MonitorConfig) -> Self {
        Self::with_clock(source, sink, config, Arc::new(SystemClock))
    }

    /// Create a monitor reading "now" from `clock`.
    pub fn with_clock(source: S, sink: K, config: MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        let detector = ChangeDetector::new(config.detector.clone());
        let outbox = PersistenceOutbox::new(config.outbox_capacity);

        Self {
            inner: Arc::new(MonitorInner {
                source: Arc::new(source),
                sink: Arc::new(sink),
                config,
                detector,
                clock,
                registry: SubscriberRegistry::new(),
                outbox,
                state: Mutex::new(MonitorState::default()),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Acquire the first reading and start continuous monitoring.
    ///
    /// Returns the initial coordinate. Calling this while already active is
    /// a no-op that returns the current coordinate. On failure the monitor
    /// stays idle and the caller decides whether to retry.
    pub async fn initialize(&self) -> Result<Coordinate, MonitorError> {
        let (attempt, idle_phase) = {
            let mut state = self.inner.state.lock();
            match state.phase {
                MonitorPhase::Active => {
                    if let Some(current) = state.current {
                        tracing::debug!("Location monitor already active");
                        return Ok(current);
                    }
                }
                MonitorPhase::Initializing => return Err(MonitorError::AlreadyInitializing),
                MonitorPhase::Uninitialized | MonitorPhase::Stopped => {}
            }
            let idle_phase = state.phase;
            state.phase = MonitorPhase::Initializing;
            state.init_attempt += 1;
            (state.init_attempt, idle_phase)
        };

        tracing::debug!("Acquiring initial location");
        let result = acquire(self.inner.source.as_ref(), &self.inner.config.acquisition).await;

        let mut state = self.inner.state.lock();
        if state.phase != MonitorPhase::Initializing || state.init_attempt != attempt {
            tracing::debug!("Initialization superseded by stop, discarding reading");
            return Err(MonitorError::Cancelled);
        }

        match result {
            Ok(reading) => {
                let now = self.inner.clock.now_ms();
                state.current = Some(reading.coordinate);
                state.last_significant_update_ms = now;
                state.readings_processed = 0;
                state.significant_updates = 0;
                state.session = Some(self.start_monitoring());
                state.phase = MonitorPhase::Active;

                tracing::info!(
                    latitude = reading.coordinate.latitude(),
                    longitude = reading.coordinate.longitude(),
                    accuracy_m = reading.accuracy_meters,
                    "Location monitoring started"
                );
                Ok(reading.coordinate)
            }
            Err(e) => {
                state.phase = idle_phase;
                tracing::warn!(error = %e, "Failed to acquire initial location");
                Err(MonitorError::LocationUnavailable(e))
            }
        }
    }

    /// Acquire a fresh reading and broadcast it regardless of movement.
    ///
    /// Returns `None` if the monitor is not active, acquisition fails, or the
    /// monitor is stopped before the reading is applied.
    pub async fn force_location_update(&self) -> Option<Coordinate> {
        let updates = {
            let state = self.inner.state.lock();
            match &state.session {
                Some(session) if state.phase == MonitorPhase::Active => session.updates.clone(),
                _ => {
                    tracing::debug!(phase = %state.phase, "Forced update ignored, monitor not active");
                    return None;
                }
            }
        };

        let reading = match acquire(self.inner.source.as_ref(), &self.inner.config.acquisition).await
        {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(error = %e, "Forced location update failed");
                return None;
            }
        };

        let (reply, response) = oneshot::channel();
        if updates
            .send(UpdateCommand::Forced { reading, reply })
            .await
            .is_err()
        {
            return None;
        }
        response.await.ok().flatten()
    }

    /// Latest known coordinate. Never blocks on the source.
    pub fn current_location(&self) -> Option<Coordinate> {
        self.inner.state.lock().current
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().phase == MonitorPhase::Active
    }

    pub fn phase(&self) -> MonitorPhase {
        self.inner.state.lock().phase
    }

    /// Stop monitoring, drop all subscribers and reset location state.
    ///
    /// Idempotent: stopping an idle monitor does nothing.
    pub fn stop(&self) {
        let session = {
            let mut state = self.inner.state.lock();
            match state.phase {
                MonitorPhase::Uninitialized | MonitorPhase::Stopped => {
                    tracing::trace!(phase = %state.phase, "Location monitor already stopped");
                    return;
                }
                MonitorPhase::Initializing | MonitorPhase::Active => {}
            }
            state.phase = MonitorPhase::Stopped;
            state.current = None;
            state.last_significant_update_ms = 0;
            state.session.take()
        };

        if let Some(session) = session {
            session.cancellation.cancel();
            if let Some(watch_id) = session.watch_id {
                self.inner.source.clear_watch(watch_id);
            }
        }
        self.inner.registry.clear();

        tracing::info!("Location monitoring stopped");
    }

    /// Register a callback for significant location changes.
    pub fn on_location_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LocationChangeEvent) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(callback)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn outbox_stats(&self) -> OutboxStats {
        self.inner.outbox.stats()
    }

    /// Snapshot of the monitor.
    pub fn status(&self) -> MonitorStatus {
        let subscribers = self.inner.registry.len();
        let outbox = self.inner.outbox.stats();
        let state = self.inner.state.lock();

        MonitorStatus {
            phase: state.phase,
            current: state.current,
            last_significant_update_ms: state.last_significant_update_ms,
            readings_processed: state.readings_processed,
            significant_updates: state.significant_updates,
            subscribers,
            outbox,
        }
    }

    /// Spawn watch, poll, persistence and update tasks for a new session.
    fn start_monitoring(&self) -> ActiveSession {
        let inner = &self.inner;
        let id = inner.next_session.fetch_add(1, Ordering::Relaxed);
        let cancellation = CancellationToken::new();
        let (updates, commands) = mpsc::channel(inner.config.update_queue_capacity.max(1));

        let watch_id = match inner.source.watch_position(&inner.config.watch) {
            Ok(watch) => {
                let watch_id = watch.id;
                spawn_watch_pump(watch, updates.clone(), cancellation.clone());
                Some(watch_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Location watch unavailable, relying on poll");
                None
            }
        };

        spawn_poll(
            Arc::clone(&inner.source),
            inner.config.acquisition.clone(),
            inner.config.poll_interval,
            updates.clone(),
            cancellation.clone(),
        );

        inner
            .outbox
            .spawn_worker(Arc::clone(&inner.sink), cancellation.clone());

        let weak = Arc::downgrade(inner);
        let token = cancellation.clone();
        tokio::spawn(run_updates(weak, id, commands, token));

        tracing::debug!(
            session = id,
            watch = ?watch_id,
            poll_interval_secs = inner.config.poll_interval.as_secs(),
            "Monitoring session started"
        );

        ActiveSession {
            id,
            cancellation,
            updates,
            watch_id,
        }
    }
}

impl<S, K> MonitorInner<S, K> {
    fn apply(&self, session_id: u64, command: UpdateCommand) {
        match command {
            UpdateCommand::Reading { reading, origin } => {
                self.handle_reading(session_id, reading, origin)
            }
            UpdateCommand::Forced { reading, reply } => {
                let result = self.accept_forced(session_id, reading);
                let _ = reply.send(result);
            }
        }
    }

    /// The update handler: classify, record, and publish if significant.
    fn handle_reading(&self, session_id: u64, reading: PositionReading, origin: ReadingOrigin) {
        let now = self.clock.now_ms();
        let new = reading.coordinate;

        let event = {
            let mut state = self.state.lock();
            if !state.is_session_active(session_id) {
                tracing::trace!(%origin, "Discarding reading from inactive session");
                return;
            }

            state.readings_processed += 1;
            let previous = state.current;
            let verdict = self.detector.classify(
                &new,
                previous.as_ref(),
                state.last_significant_update_ms,
                now,
            );
            state.current = Some(new);

            if let Significance::Insignificant {
                distance_m,
                elapsed_ms,
            } = verdict
            {
                tracing::trace!(
                    %origin,
                    distance_m,
                    elapsed_ms,
                    "Location change below thresholds"
                );
                return;
            }

            state.last_significant_update_ms = now;
            state.significant_updates += 1;
            tracing::debug!(
                %origin,
                latitude = new.latitude(),
                longitude = new.longitude(),
                reason = ?verdict,
                "Significant location change"
            );

            LocationChangeEvent { new, previous }
        };

        self.publish(&event, reading.accuracy_meters, now);
    }

    /// Apply a forced reading, bypassing the change detector.
    fn accept_forced(&self, session_id: u64, reading: PositionReading) -> Option<Coordinate> {
        let now = self.clock.now_ms();
        let new = reading.coordinate;

        let event = {
            let mut state = self.state.lock();
            if !state.is_session_active(session_id) {
                tracing::debug!("Discarding forced update from inactive session");
                return None;
            }

            state.readings_processed += 1;
            state.significant_updates += 1;
            let previous = state.current.replace(new);
            state.last_significant_update_ms = now;
            LocationChangeEvent { new, previous }
        };

        tracing::info!(
            latitude = new.latitude(),
            longitude = new.longitude(),
            "Forced location update"
        );
        self.publish(&event, reading.accuracy_meters, now);
        Some(new)
    }

    /// Hand the record to the outbox, then notify subscribers.
    ///
    /// Runs without the state lock so callbacks may call back into the monitor.
    fn publish(&self, event: &LocationChangeEvent, accuracy_meters: f64, now_ms: i64) {
        self.outbox
            .enqueue(LocationRecord::gps(event.new, accuracy_meters, now_ms));
        self.registry.notify(event);
    }
}

/// Single consumer of the update queue.
async fn run_updates<S, K>(
    inner: Weak<MonitorInner<S, K>>,
    session_id: u64,
    mut commands: mpsc::Receiver<UpdateCommand>,
    cancellation: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.apply(session_id, command);
    }

    tracing::debug!(session = session_id, "Location update task stopped");
}

/// Forward watch readings into the update queue until cancelled.
fn spawn_watch_pump(
    mut watch: Watch,
    updates: mpsc::Sender<UpdateCommand>,
    cancellation: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                _ = cancellation.cancelled() => break,
                item = watch.readings.recv() => item,
            };

            match item {
                Some(Ok(reading)) => {
                    let command = UpdateCommand::Reading {
                        reading,
                        origin: ReadingOrigin::Watch,
                    };
                    if updates.send(command).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(watch = %watch.id, error = %e, "Location watch error");
                }
                None => {
                    tracing::debug!(watch = %watch.id, "Location watch ended, poll continues");
                    break;
                }
            }
        }
    });
}

/// Request a fresh reading every `interval` until cancelled.
fn spawn_poll<S>(
    source: Arc<S>,
    options: PositionOptions,
    interval: std::time::Duration,
    updates: mpsc::Sender<UpdateCommand>,
    cancellation: CancellationToken,
) where
    S: PositionSource + 'static,
{
    if interval < MIN_POLL_INTERVAL {
        tracing::warn!(
            ?interval,
            minimum = ?MIN_POLL_INTERVAL,
            "Poll interval too short, clamping"
        );
    }
    let interval = interval.max(MIN_POLL_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Don't fire immediately; initialize() just acquired a reading
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = cancellation.cancelled() => break,
                result = acquire(source.as_ref(), &options) => result,
            };

            match result {
                Ok(reading) => {
                    let command = UpdateCommand::Reading {
                        reading,
                        origin: ReadingOrigin::Poll,
                    };
                    if updates.send(command).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Location poll failed"),
            }
        }

        tracing::trace!("Location poll stopped");
    });
}

/// Single-shot acquisition bounded by `options.timeout`.
async fn acquire<S: PositionSource>(
    source: &S,
    options: &PositionOptions,
) -> Result<PositionReading, AcquisitionError> {
    match tokio::time::timeout(options.timeout, source.get_current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(AcquisitionError::timeout(options.timeout)),
    }
}
