//! A Kafka client core speaking the classic (v0/v1) wire protocol.
//!
//! The centerpiece is the [`worker::BrokerWorker`]: a single-task actor that
//! owns the connections to a dynamic set of brokers, keeps a refreshed view
//! of cluster metadata, routes every request to the partition leader (or the
//! group coordinator) and recovers from stale routing by refreshing on
//! demand. Callers talk to it through a clonable [`worker::WorkerHandle`].
//!
//! ```no_run
//! use kafka_worker::config::WorkerConfig;
//! use kafka_worker::ops::{ProduceMessage, ProduceRequest};
//! use kafka_worker::worker::BrokerWorker;
//!
//! # async fn run() -> Result<(), kafka_worker::error::WorkerError> {
//! let config = WorkerConfig::new(vec![("localhost".to_string(), 9092)]);
//! let worker = BrokerWorker::spawn(config).await?;
//!
//! let request = ProduceRequest::new("greetings", 0, vec![ProduceMessage::new("hello")])
//!     .with_required_acks(1);
//! let offset = worker.produce(request).await?;
//! assert!(offset.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod metadata;
pub mod ops;
pub mod protocol;
pub mod worker;

pub use error::WorkerError;
pub use worker::{BrokerWorker, WorkerHandle};

/// A server-reported error code, decoded.
pub type ProtocolError = protocol::error::Error;
