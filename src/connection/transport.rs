use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

/// TLS parameters, `None` for plaintext sockets.
pub type TlsConfig = Option<Arc<rustls::ClientConfig>>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Invalid Hostname: {0}")]
    BadHostname(#[from] rustls::client::InvalidDnsNameError),

    #[error("TLS requested but no TLS configuration provided")]
    MissingTlsConfig,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pin_project! {
    /// One broker socket, plaintext or TLS-wrapped.
    #[project = TransportProj]
    #[derive(Debug)]
    pub enum Transport {
        Plain{
            #[pin]
            inner: TcpStream,
        },
        Tls{
            #[pin]
            inner: Box<TlsStream<TcpStream>>,
        },
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.project() {
            TransportProj::Plain { inner } => inner.poll_read(cx, buf),
            TransportProj::Tls { inner } => inner.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.project() {
            TransportProj::Plain { inner } => inner.poll_write(cx, buf),
            TransportProj::Tls { inner } => inner.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.project() {
            TransportProj::Plain { inner } => inner.poll_flush(cx),
            TransportProj::Tls { inner } => inner.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.project() {
            TransportProj::Plain { inner } => inner.poll_shutdown(cx),
            TransportProj::Tls { inner } => inner.poll_shutdown(cx),
        }
    }
}

impl Transport {
    /// Open a socket to `host:port`, wrapping it in TLS when `use_ssl` is set.
    pub async fn connect(
        host: &str,
        port: i32,
        tls_config: &TlsConfig,
        use_ssl: bool,
    ) -> Result<Self> {
        let tcp_stream = TcpStream::connect((host, port as u16)).await?;
        if !use_ssl {
            return Ok(Self::Plain { inner: tcp_stream });
        }

        let config = tls_config.as_ref().ok_or(Error::MissingTlsConfig)?;
        let server_name = rustls::ServerName::try_from(host)?;
        let connector = TlsConnector::from(Arc::clone(config));
        let tls_stream = connector.connect(server_name, tcp_stream).await?;
        Ok(Self::Tls {
            inner: Box::new(tls_stream),
        })
    }
}
