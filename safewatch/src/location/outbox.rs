//! Persistence Outbox - bounded hand-off between the monitor and the sink.
//!
//! The monitor enqueues a [`LocationRecord`] and returns immediately. A single
//! worker task drains the queue into the [`PersistenceSink`].
//!
//! # Backpressure
//!
//! The queue holds at most `capacity` records. When full, the **oldest**
//! record is dropped: a newer position is always more useful than a stale
//! one. Every outcome is counted in [`OutboxStats`].
//!
//! # Workers
//!
//! Exactly one worker consumes the queue at a time. A worker spawned while
//! an older one is still finishing waits for it. A cancelled worker delivers
//! the records already queued before it exits.
//!
//! # Failure Policy
//!
//! - `AuthRequired` - skipped silently (no session), counted
//! - `Remote` - logged at WARN, counted, not retried

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::sink::{LocationRecord, PersistenceError, PersistenceSink};

/// Default outbox capacity.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 8;

/// Outbox counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxStats {
    /// Records accepted into the queue.
    pub enqueued: u64,
    /// Records evicted because the queue was full.
    pub dropped: u64,
    /// Records the sink stored.
    pub persisted: u64,
    /// Records skipped because no user was signed in.
    pub skipped_unauthenticated: u64,
    /// Records the sink failed to store.
    pub failed: u64,
    /// Records waiting in the queue.
    pub pending: usize,
}

/// Result of [`PersistenceOutbox::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    /// Queued after evicting the oldest pending record.
    DroppedOldest,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    persisted: AtomicU64,
    skipped_unauthenticated: AtomicU64,
    failed: AtomicU64,
}

struct OutboxShared {
    queue: Mutex<VecDeque<LocationRecord>>,
    capacity: usize,
    wakeup: Notify,
    counters: Counters,
    /// Serializes workers across sessions.
    consumer: tokio::sync::Mutex<()>,
}

/// Bounded, drop-oldest queue of records awaiting persistence.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct PersistenceOutbox {
    shared: Arc<OutboxShared>,
}

impl PersistenceOutbox {
    /// Create an outbox holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(OutboxShared {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity,
                wakeup: Notify::new(),
                counters: Counters::default(),
                consumer: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Queue a record without waiting. Never blocks on the sink.
    pub fn enqueue(&self, record: LocationRecord) -> EnqueueOutcome {
        let outcome = {
            let mut queue = self.shared.queue.lock();
            let outcome = if queue.len() >= self.shared.capacity {
                queue.pop_front();
                EnqueueOutcome::DroppedOldest
            } else {
                EnqueueOutcome::Queued
            };
            queue.push_back(record);
            outcome
        };

        let counters = &self.shared.counters;
        counters.enqueued.fetch_add(1, Ordering::Relaxed);
        if outcome == EnqueueOutcome::DroppedOldest {
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                capacity = self.shared.capacity,
                "Persistence outbox full, dropped oldest record"
            );
        }

        self.shared.wakeup.notify_one();
        outcome
    }

    pub fn stats(&self) -> OutboxStats {
        let c = &self.shared.counters;
        OutboxStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            persisted: c.persisted.load(Ordering::Relaxed),
            skipped_unauthenticated: c.skipped_unauthenticated.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            pending: self.shared.queue.lock().len(),
        }
    }

    /// Spawn the worker that drains the queue into `sink`.
    ///
    /// Only one worker consumes the queue at a time: a new worker waits for
    /// the previous one to finish before it starts. On cancellation the
    /// worker delivers whatever is still queued, then exits.
    pub fn spawn_worker<K>(&self, sink: Arc<K>, cancellation: CancellationToken) -> JoinHandle<()>
    where
        K: PersistenceSink + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            // Held for the worker's lifetime; a newer worker waits here
            let _consumer = shared.consumer.lock().await;
            tracing::debug!("Persistence worker started");

            loop {
                let next = shared.queue.lock().pop_front();
                match next {
                    Some(record) => shared.deliver(sink.as_ref(), record).await,
                    None if cancellation.is_cancelled() => break,
                    None => {
                        tokio::select! {
                            _ = shared.wakeup.notified() => {}
                            _ = cancellation.cancelled() => {}
                        }
                    }
                }
            }

            tracing::debug!("Persistence worker stopped");
        })
    }
}

impl OutboxShared {
    /// Hand one record to the sink and count the outcome.
    async fn deliver<K: PersistenceSink>(&self, sink: &K, record: LocationRecord) {
        match sink.record_location(record).await {
            Ok(()) => {
                self.counters.persisted.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    latitude = record.coordinate.latitude(),
                    longitude = record.coordinate.longitude(),
                    "Location persisted"
                );
            }
            Err(PersistenceError::AuthRequired) => {
                self.counters
                    .skipped_unauthenticated
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!("No authenticated session, skipping location persistence");
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Failed to persist location");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::geo::Coordinate;

    /// Sink that records calls and answers with a scripted result.
    struct ScriptedSink {
        calls: Mutex<Vec<LocationRecord>>,
        result: Result<(), PersistenceError>,
    }

    impl ScriptedSink {
        fn new(result: Result<(), PersistenceError>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                result,
            })
        }
    }

    impl PersistenceSink for ScriptedSink {
        async fn record_location(&self, record: LocationRecord) -> Result<(), PersistenceError> {
            self.calls.lock().push(record);
            self.result.clone()
        }
    }

    fn record(lat: f64) -> LocationRecord {
        LocationRecord::gps(Coordinate::new(lat, 0.0).unwrap(), 5.0, 0)
    }

    async fn wait_for_stats(outbox: &PersistenceOutbox, done: impl Fn(&OutboxStats) -> bool) {
        let wait = async {
            while !done(&outbox.stats()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .expect("outbox did not reach expected state");
    }

    #[test]
    fn test_drop_oldest_when_full() {
        let outbox = PersistenceOutbox::new(2);

        assert_eq!(outbox.enqueue(record(1.0)), EnqueueOutcome::Queued);
        assert_eq!(outbox.enqueue(record(2.0)), EnqueueOutcome::Queued);
        assert_eq!(outbox.enqueue(record(3.0)), EnqueueOutcome::DroppedOldest);

        let stats = outbox.stats();
        assert_eq!(stats.enqueued, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.pending, 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let outbox = PersistenceOutbox::new(0);
        assert_eq!(outbox.capacity(), 1);
    }

    #[tokio::test]
    async fn test_worker_delivers_newest_records() {
        let outbox = PersistenceOutbox::new(2);
        for lat in [1.0, 2.0, 3.0, 4.0] {
            outbox.enqueue(record(lat));
        }

        let sink = ScriptedSink::new(Ok(()));
        let cancel = CancellationToken::new();
        let handle = outbox.spawn_worker(sink.clone(), cancel.clone());

        wait_for_stats(&outbox, |s| s.persisted == 2).await;

        let lats: Vec<f64> = sink
            .calls
            .lock()
            .iter()
            .map(|r| r.coordinate.latitude())
            .collect();
        assert_eq!(lats, vec![3.0, 4.0]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_wakes_for_new_records() {
        let outbox = PersistenceOutbox::new(4);
        let sink = ScriptedSink::new(Ok(()));
        let cancel = CancellationToken::new();
        let _handle = outbox.spawn_worker(sink.clone(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        outbox.enqueue(record(1.0));

        wait_for_stats(&outbox, |s| s.persisted == 1).await;
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_auth_required_is_skipped() {
        let outbox = PersistenceOutbox::new(4);
        let sink = ScriptedSink::new(Err(PersistenceError::AuthRequired));
        let cancel = CancellationToken::new();
        let _handle = outbox.spawn_worker(sink, cancel.clone());

        outbox.enqueue(record(1.0));

        wait_for_stats(&outbox, |s| s.skipped_unauthenticated == 1).await;
        assert_eq!(outbox.stats().failed, 0);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_remote_failure_is_counted_not_retried() {
        let outbox = PersistenceOutbox::new(4);
        let sink = ScriptedSink::new(Err(PersistenceError::Remote("500".into())));
        let cancel = CancellationToken::new();
        let _handle = outbox.spawn_worker(sink.clone(), cancel.clone());

        outbox.enqueue(record(1.0));
        wait_for_stats(&outbox, |s| s.failed == 1).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.calls.lock().len(), 1);
        assert_eq!(outbox.stats().pending, 0);
        cancel.cancel();
    }

    /// Sink that takes a while per call and records peak concurrency.
    #[derive(Default)]
    struct SlowSink {
        in_flight: AtomicU64,
        peak: AtomicU64,
        calls: AtomicU64,
    }

    impl PersistenceSink for SlowSink {
        async fn record_location(&self, _record: LocationRecord) -> Result<(), PersistenceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(15)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cancelled_worker_drains_queued_records() {
        let outbox = PersistenceOutbox::new(4);
        outbox.enqueue(record(1.0));
        outbox.enqueue(record(2.0));

        let sink = ScriptedSink::new(Ok(()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = outbox.spawn_worker(sink.clone(), cancel);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
        assert_eq!(sink.calls.lock().len(), 2);
        assert_eq!(outbox.stats().persisted, 2);
        assert_eq!(outbox.stats().pending, 0);
    }

    #[tokio::test]
    async fn test_replacement_worker_waits_for_previous() {
        let outbox = PersistenceOutbox::new(8);
        let sink = Arc::new(SlowSink::default());

        let first = CancellationToken::new();
        let first_handle = outbox.spawn_worker(sink.clone(), first.clone());
        for lat in [1.0, 2.0, 3.0] {
            outbox.enqueue(record(lat));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Stop and immediately replace the worker while a call is in flight
        first.cancel();
        let second = CancellationToken::new();
        let _second_handle = outbox.spawn_worker(sink.clone(), second.clone());
        outbox.enqueue(record(4.0));
        outbox.enqueue(record(5.0));

        wait_for_stats(&outbox, |s| s.persisted == 5).await;
        tokio::time::timeout(Duration::from_secs(2), first_handle)
            .await
            .expect("first worker did not stop")
            .unwrap();
        assert_eq!(sink.peak.load(Ordering::SeqCst), 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 5);
        second.cancel();
    }

    #[tokio::test]
    async fn test_cancelled_worker_leaves_queue_for_next_worker() {
        let outbox = PersistenceOutbox::new(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = outbox.spawn_worker(ScriptedSink::new(Ok(())), cancel);
        handle.await.unwrap();

        outbox.enqueue(record(1.0));
        assert_eq!(outbox.stats().pending, 1);

        let cancel = CancellationToken::new();
        let _handle = outbox.spawn_worker(ScriptedSink::new(Ok(())), cancel.clone());
        wait_for_stats(&outbox, |s| s.persisted == 1).await;
        cancel.cancel();
    }
}
