//! The error surface of the worker.

use std::time::Duration;

use thiserror::Error;

use crate::connection::ConnectionError;
use crate::protocol::error::Error as ApiError;
use crate::protocol::messages::{ProduceResponse, ReadVersionedError, WriteVersionedError};

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The leader for `(topic, partition)` is still unresolved after one
    /// on-demand metadata refresh.
    #[error("topic or partition not found: {topic}/{partition}")]
    TopicNotFound { topic: String, partition: i32 },

    /// The produce path's flavor of a failed leader lookup.
    #[error("leader not available for {topic}/{partition}")]
    LeaderNotAvailable { topic: String, partition: i32 },

    /// No broker in the current list accepted a Metadata request. Fatal for
    /// the refresh; during bootstrap it aborts worker startup.
    #[error("unable to fetch metadata from any brokers")]
    NoBrokersAvailable,

    /// Transport-level failure: timeout, dead socket, connect error.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The response bytes ended early or declared an implausible length.
    #[error("malformed response: {0}")]
    Malformed(#[from] ReadVersionedError),

    /// A request could not be encoded.
    #[error("cannot encode request: {0}")]
    Encode(#[from] WriteVersionedError),

    /// The broker answered with something structurally unexpected.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A non-zero error code in a response, surfaced verbatim.
    #[error("server error: {0}")]
    Server(ApiError),

    /// The broker rejected (part of) a produce request; the full response is
    /// preserved for the caller.
    #[error("produce rejected by broker: {error}")]
    ProduceRejected {
        error: ApiError,
        response: ProduceResponse,
    },

    /// A group-aware op was issued without a consumer group configured.
    #[error("no consumer group configured")]
    NoConsumerGroup,

    /// The configured consumer-group name is unusable.
    #[error("invalid consumer group: {0:?}")]
    InvalidConsumerGroup(String),

    /// The worker task is gone; no further requests will be served.
    #[error("worker has shut down")]
    WorkerShutdown,

    /// The worker did not reply within the caller timeout.
    #[error("no reply from worker within {timeout:?}")]
    CallerTimeout { timeout: Duration },
}

pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

impl WorkerError {
    /// Whether this is the timeout flavor of a transport failure.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Connection(ConnectionError::Timeout { .. }) | Self::CallerTimeout { .. }
        )
    }
}
