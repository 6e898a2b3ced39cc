//! Worker configuration and protocol constants.

use std::time::Duration;

use crate::connection::TlsConfig;

/// The client id stamped into every request header.
pub const CLIENT_ID: &str = "kafka_ex";

/// How often a metadata request is retried when the cluster reports
/// `LeaderNotAvailable`.
pub const RETRY_COUNT: usize = 3;

/// Pause between those retries.
pub const RETRY_DELAY: Duration = Duration::from_millis(300);

/// Pause between coordinator-discovery retries.
pub const COORDINATOR_RETRY_DELAY: Duration = Duration::from_millis(400);

/// Default fetch `max_wait_ms`.
pub const DEFAULT_WAIT_TIME_MS: i32 = 10;

/// Default fetch `min_bytes`.
pub const DEFAULT_MIN_BYTES: i32 = 1;

/// Default fetch `max_bytes`.
pub const DEFAULT_MAX_BYTES: i32 = 1_000_000;

/// Default per-socket round-trip timeout.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Default timeout a caller waits for the worker's reply. Raised to the
/// configured sync timeout when that is larger.
pub const DEFAULT_CALLER_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Default interval between periodic metadata refreshes.
pub const DEFAULT_METADATA_UPDATE_INTERVAL: Duration = Duration::from_millis(30_000);

/// Default interval between periodic coordinator refreshes.
pub const DEFAULT_CONSUMER_GROUP_UPDATE_INTERVAL: Duration = Duration::from_millis(30_000);

/// Upper bound on a single response frame.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024 * 1024;

/// Everything a [`BrokerWorker`](crate::worker::BrokerWorker) needs to start.
pub struct WorkerConfig {
    /// Ordered `(host, port)` bootstrap brokers.
    pub uris: Vec<(String, i32)>,

    /// Wrap connections in TLS.
    pub use_ssl: bool,

    /// TLS parameters used when `use_ssl` is set.
    pub ssl_options: TlsConfig,

    /// Interval between periodic metadata refreshes.
    pub metadata_update_interval: Duration,

    /// Consumer group for group-aware ops. `None` disables the
    /// consumer-metadata timer.
    pub consumer_group: Option<String>,

    /// Interval between periodic coordinator refreshes.
    pub consumer_group_update_interval: Duration,

    /// Identifier used in log messages.
    pub worker_name: String,

    /// Per-socket round-trip timeout.
    pub sync_timeout: Duration,

    /// Upper bound on a single response frame.
    pub max_message_size: usize,

    /// Auxiliary task tied to this worker's lifetime (a streaming layer's
    /// event pipe); aborted when the worker terminates.
    pub event_sink: Option<tokio::task::JoinHandle<()>>,
}

impl WorkerConfig {
    /// Configuration with the given bootstrap brokers and every other option
    /// at its default.
    pub fn new(uris: Vec<(String, i32)>) -> Self {
        Self {
            uris,
            use_ssl: false,
            ssl_options: None,
            metadata_update_interval: DEFAULT_METADATA_UPDATE_INTERVAL,
            consumer_group: None,
            consumer_group_update_interval: DEFAULT_CONSUMER_GROUP_UPDATE_INTERVAL,
            worker_name: "kafka_ex".to_string(),
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            event_sink: None,
        }
    }

    /// Wrap connections in TLS with the given parameters.
    pub fn with_ssl(mut self, ssl_options: TlsConfig) -> Self {
        self.use_ssl = true;
        self.ssl_options = ssl_options;
        self
    }

    /// Set the consumer group for group-aware ops.
    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = Some(group.into());
        self
    }

    /// Set the periodic metadata refresh interval.
    pub fn with_metadata_update_interval(mut self, interval: Duration) -> Self {
        self.metadata_update_interval = interval;
        self
    }

    /// Set the periodic coordinator refresh interval.
    pub fn with_consumer_group_update_interval(mut self, interval: Duration) -> Self {
        self.consumer_group_update_interval = interval;
        self
    }

    /// Set the identifier used in log messages.
    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Set the per-socket round-trip timeout.
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// Attach a task the worker aborts when it terminates.
    pub fn with_event_sink(mut self, sink: tokio::task::JoinHandle<()>) -> Self {
        self.event_sink = Some(sink);
        self
    }
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("uris", &self.uris)
            .field("use_ssl", &self.use_ssl)
            .field("ssl_options", &"...")
            .field("metadata_update_interval", &self.metadata_update_interval)
            .field("consumer_group", &self.consumer_group)
            .field(
                "consumer_group_update_interval",
                &self.consumer_group_update_interval,
            )
            .field("worker_name", &self.worker_name)
            .field("sync_timeout", &self.sync_timeout)
            .field("max_message_size", &self.max_message_size)
            .finish()
    }
}

/// A usable consumer-group name is any non-empty string.
pub fn valid_consumer_group(group: &str) -> bool {
    !group.is_empty()
}
