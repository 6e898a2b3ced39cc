//! One addressable broker endpoint and its socket.
//!
//! A [`BrokerConnection`] is owned by exactly one worker, which serializes
//! every use of it; `&mut self` on the send methods is what guarantees at
//! most one request in flight per broker. There is no implicit reconnect
//! anywhere: a dead socket stays dead until the next metadata reconciliation
//! replaces or prunes the broker.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufStream};
use tracing::{debug, info, warn};

use crate::protocol::frame::{AsyncMessageRead, AsyncMessageWrite};

pub use self::transport::{TlsConfig, Transport};

mod transport;

/// The `node_id` of a broker known only by address, before any Metadata
/// response has identified it.
pub const BOOTSTRAP_NODE_ID: i32 = -1;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("error connecting to broker {host}:{port}: {source}")]
    Connect {
        host: String,
        port: i32,
        #[source]
        source: transport::Error,
    },

    #[error("no open socket to broker")]
    Disconnected,

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("cannot write frame: {0}")]
    FrameWrite(#[from] crate::protocol::frame::WriteError),

    #[error("cannot read frame: {0}")]
    FrameRead(#[from] crate::protocol::frame::ReadError),
}

pub type Result<T, E = ConnectionError> = std::result::Result<T, E>;

/// One broker: identity, address and the socket to it.
pub struct BrokerConnection {
    node_id: i32,
    host: String,
    port: i32,
    stream: Option<BufStream<Transport>>,
    max_message_size: usize,
}

impl BrokerConnection {
    /// Connect to `host:port`.
    ///
    /// Pass [`BOOTSTRAP_NODE_ID`] for brokers taken from the bootstrap list.
    pub async fn connect(
        node_id: i32,
        host: impl Into<String>,
        port: i32,
        tls_config: &TlsConfig,
        use_ssl: bool,
        max_message_size: usize,
    ) -> Result<Self> {
        let host = host.into();
        info!(broker = node_id, host = %host, port, "Establishing new connection");
        let transport = Transport::connect(&host, port, tls_config, use_ssl)
            .await
            .map_err(|source| ConnectionError::Connect {
                host: host.clone(),
                port,
                source,
            })?;

        Ok(Self {
            node_id,
            host,
            port,
            stream: Some(BufStream::new(transport)),
            max_message_size,
        })
    }

    /// A broker record with no socket.
    ///
    /// Used when a connect fails: the endpoint stays in the worker's list so
    /// a later reconciliation can retry or prune it.
    pub fn disconnected(
        node_id: i32,
        host: impl Into<String>,
        port: i32,
        max_message_size: usize,
    ) -> Self {
        Self {
            node_id,
            host: host.into(),
            port,
            stream: None,
            max_message_size,
        }
    }

    pub fn node_id(&self) -> i32 {
        self.node_id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> i32 {
        self.port
    }

    /// Whether this broker still has a live socket.
    ///
    /// Flips to false when an I/O error or timeout forced the socket shut;
    /// only reconciliation brings a broker back.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// True for brokers created from the bootstrap list that no Metadata
    /// response has identified yet.
    pub fn is_bootstrap(&self) -> bool {
        self.node_id == BOOTSTRAP_NODE_ID
    }

    /// Stamp the real `node_id` once a Metadata response names this endpoint.
    pub fn identify(&mut self, node_id: i32) {
        debug!(host = %self.host, port = self.port, node_id, "Identified bootstrap broker");
        self.node_id = node_id;
    }

    /// Whether a Metadata broker entry describes this endpoint.
    pub fn addr_matches(&self, host: &str, port: i32) -> bool {
        self.host == host && self.port == port
    }

    /// Write one framed request and read exactly one framed response.
    ///
    /// On timeout the socket is closed as well: a response may still be in
    /// flight and frame alignment can no longer be guaranteed.
    pub async fn send_sync(&mut self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let max_message_size = self.max_message_size;
        let stream = self.stream.as_mut().ok_or(ConnectionError::Disconnected)?;

        let round_trip = async {
            stream.write_message(frame).await?;
            stream.flush().await.map_err(|e| {
                ConnectionError::FrameWrite(crate::protocol::frame::WriteError::IO(e))
            })?;
            let response = stream.read_message(max_message_size).await?;
            Ok(response)
        };

        let result = tokio::time::timeout(timeout, round_trip).await;
        match result {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                warn!(broker = self.node_id, error = %e, "Socket error, closing connection");
                self.close();
                Err(e)
            }
            Err(_) => {
                warn!(broker = self.node_id, ?timeout, "Request timed out, closing connection");
                self.close();
                Err(ConnectionError::Timeout { timeout })
            }
        }
    }

    /// Write one framed request without awaiting any response.
    pub async fn send_async(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(ConnectionError::Disconnected)?;

        let result = async {
            stream.write_message(frame).await?;
            stream
                .flush()
                .await
                .map_err(crate::protocol::frame::WriteError::IO)?;
            Ok(())
        }
        .await;

        if let Err(e) = &result {
            warn!(broker = self.node_id, error = %e, "Socket error, closing connection");
            self.close();
        }
        result.map_err(ConnectionError::FrameWrite)
    }

    /// Drop the socket, closing it. Idempotent.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(broker = self.node_id, host = %self.host, port = self.port, "Closed connection");
        }
    }
}

impl std::fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConnection")
            .field("node_id", &self.node_id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}
