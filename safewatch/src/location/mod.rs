//! Location Monitoring Module
//!
//! Keeps a process-wide view of where the device is and tells interested
//! components when that position changes in a way that matters.
//!
//! # Architecture
//!
//! Readings arrive from a [`PositionSource`] on two paths:
//!
//! - **Watch** - continuous push stream, primary path
//! - **Poll** - single-shot request every 2 minutes, covers watch gaps
//!
//! Both feed one serialized update task. Each reading runs through the
//! [`ChangeDetector`]; significant ones are handed to the
//! [`PersistenceOutbox`] and broadcast to subscribers.
//!
//! # Usage
//!
//! ```ignore
//! use safewatch::location::{ChannelPositionSource, LocationMonitor, MonitorConfig, NoopSink};
//!
//! let source = Arc::new(ChannelPositionSource::new());
//! let monitor = LocationMonitor::new(source.clone(), NoopSink, MonitorConfig::default());
//!
//! let subscription = monitor.on_location_change(|event| {
//!     tracing::info!(new = %event.new, "Moved");
//! });
//!
//! monitor.initialize().await?;
//! // ... later
//! subscription.unsubscribe();
//! monitor.stop();
//! ```
//!
//! # Components
//!
//! - [`state`] - `PositionReading`, `LocationChangeEvent`, `MonitorPhase`, `MonitorStatus`
//! - [`detector`] - `ChangeDetector` significance rules
//! - [`source`] - `PositionSource` trait and acquisition options
//! - [`channel_source`] - `ChannelPositionSource` fed by the host process
//! - [`registry`] - `SubscriberRegistry` with panic-isolated callbacks
//! - [`sink`] - `PersistenceSink` trait, `NoopSink`, `LoggingSink`
//! - [`outbox`] - `PersistenceOutbox` bounded drop-oldest queue
//! - [`supabase`] - `SupabaseSink` RPC persistence
//! - [`monitor`] - `LocationMonitor` lifecycle and update handler

pub mod channel_source;
mod config;
pub mod detector;
mod error;
mod logger;
pub mod monitor;
pub mod outbox;
pub mod registry;
pub mod sink;
pub mod source;
pub mod state;
pub mod supabase;

pub use channel_source::{ChannelPositionSource, DEFAULT_WATCH_CAPACITY};
pub use config::{MonitorConfig, DEFAULT_POLL_INTERVAL, DEFAULT_UPDATE_QUEUE_CAPACITY};
pub use detector::{
    ChangeDetector, ChangeDetectorConfig, Significance, DEFAULT_MIN_UPDATE_INTERVAL,
    DEFAULT_SIGNIFICANT_DISTANCE_M,
};
pub use error::MonitorError;
pub use logger::{spawn_location_logger, DEFAULT_LOG_INTERVAL};
pub use monitor::LocationMonitor;
pub use outbox::{EnqueueOutcome, OutboxStats, PersistenceOutbox, DEFAULT_OUTBOX_CAPACITY};
pub use registry::{
    LocationCallback, NotifyReport, SubscriberCallbackError, SubscriberId, SubscriberRegistry,
    Subscription,
};
pub use sink::{
    LocationRecord, LoggingSink, NoopSink, PersistenceError, PersistenceSink, GPS_SOURCE,
};
pub use source::{
    AcquisitionError, PositionOptions, PositionSource, Watch, WatchId, WatchItem,
    DEFAULT_ACQUISITION_TIMEOUT,
};
pub use state::{LocationChangeEvent, MonitorPhase, MonitorStatus, PositionReading};
pub use supabase::{
    SupabaseConfig, SupabaseSession, SupabaseSink, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RPC_FUNCTION,
};
