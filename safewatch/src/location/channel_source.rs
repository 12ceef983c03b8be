//! Channel Position Source - a position source fed from inside the process.
//!
//! The host pushes readings as they arrive from whatever produces them
//! (a platform bridge, a track replay, a test). Watchers receive every
//! pushed reading; single-shot requests answer with the latest reading or
//! wait for the next push.
//!
//! # Example
//!
//! ```ignore
//! let source = Arc::new(ChannelPositionSource::new());
//! let monitor = LocationMonitor::new(source.clone(), NoopSink, MonitorConfig::default());
//!
//! source.push(PositionReading::new(coordinate, 5.0, now_ms));
//! monitor.initialize().await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use super::source::{
    AcquisitionError, PositionOptions, PositionSource, Watch, WatchId, WatchItem,
};
use super::state::PositionReading;
use crate::time::{duration_to_ms, Clock, SystemClock};

/// Default per-watch buffer (readings beyond this are dropped for that watcher).
pub const DEFAULT_WATCH_CAPACITY: usize = 32;

/// In-process position source driven by [`push`](Self::push).
pub struct ChannelPositionSource {
    /// Most recent reading.
    latest: watch::Sender<Option<PositionReading>>,

    /// Active watch subscriptions.
    watchers: Mutex<HashMap<WatchId, mpsc::Sender<WatchItem>>>,

    /// When set, single-shot requests and new watches fail with this error.
    fault: Mutex<Option<AcquisitionError>>,

    next_watch_id: AtomicU64,

    watch_capacity: usize,

    /// Judges reading age against `max_cached_age`.
    clock: Arc<dyn Clock>,
}

impl ChannelPositionSource {
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    pub fn with_watch_capacity(watch_capacity: usize) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            latest,
            watchers: Mutex::new(HashMap::new()),
            fault: Mutex::new(None),
            next_watch_id: AtomicU64::new(1),
            watch_capacity: watch_capacity.max(1),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` instead of the system time when checking reading age.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish a reading to single-shot waiters and all watchers.
    pub fn push(&self, reading: PositionReading) {
        self.latest.send_replace(Some(reading));
        self.fan_out(Ok(reading));
    }

    /// Report a sensor error to all watchers.
    pub fn push_error(&self, error: AcquisitionError) {
        self.fan_out(Err(error));
    }

    /// Make single-shot requests and new watches fail (or succeed again with `None`).
    pub fn set_fault(&self, fault: Option<AcquisitionError>) {
        *self.fault.lock() = fault;
    }

    /// Latest pushed reading, if any.
    pub fn latest(&self) -> Option<PositionReading> {
        *self.latest.borrow()
    }

    /// Number of active watch subscriptions.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }

    fn fan_out(&self, item: WatchItem) {
        let mut watchers = self.watchers.lock();
        watchers.retain(|id, tx| match tx.try_send(item.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!(watch = %id, "Watcher buffer full, dropping reading");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    fn is_fresh(&self, reading: &PositionReading, options: &PositionOptions) -> bool {
        if options.max_cached_age.is_zero() {
            return true;
        }
        self.clock
            .now_ms()
            .saturating_sub(reading.captured_at_ms)
            <= duration_to_ms(options.max_cached_age)
    }
}

impl Default for ChannelPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for ChannelPositionSource {
    async fn get_current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionReading, AcquisitionError> {
        if let Some(fault) = self.fault.lock().clone() {
            return Err(fault);
        }

        let mut rx = self.latest.subscribe();
        let wait = async {
            let reading = rx
                .wait_for(|r| matches!(r, Some(r) if self.is_fresh(r, options)))
                .await
                .map_err(|_| AcquisitionError::Unavailable("source closed".to_string()))?;
            (*reading).ok_or_else(|| AcquisitionError::Unavailable("no reading".to_string()))
        };

        match tokio::time::timeout(options.timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(AcquisitionError::timeout(options.timeout)),
        }
    }

    fn watch_position(&self, _options: &PositionOptions) -> Result<Watch, AcquisitionError> {
        if let Some(fault) = self.fault.lock().clone() {
            return Err(fault);
        }

        let id = WatchId(self.next_watch_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.watch_capacity);
        self.watchers.lock().insert(id, tx);

        tracing::trace!(watch = %id, "Watch started");
        Ok(Watch { id, readings: rx })
    }

    fn clear_watch(&self, id: WatchId) {
        if self.watchers.lock().remove(&id).is_some() {
            tracing::trace!(watch = %id, "Watch cleared");
        }
    }
}
