//! Read and write message frames from wire.
//!
//! Every request and response travels as an `INT32` size followed by that
//! many payload bytes.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_common>

use std::io::Cursor;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{
    primitives::Int32,
    traits::{ReadType, WriteType},
};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Cannot read data: {0}")]
    IO(#[from] std::io::Error),

    #[error("Implausible frame size: {size}")]
    BadFrameSize { size: i32 },

    #[error("Frame too large: {size} (max {max})")]
    TooLarge { size: usize, max: usize },
}

#[async_trait]
pub trait AsyncMessageRead {
    async fn read_message(&mut self, max_message_size: usize) -> Result<Vec<u8>, ReadError>;
}

#[async_trait]
impl<R> AsyncMessageRead for R
where
    R: AsyncRead + Send + Unpin,
{
    async fn read_message(&mut self, max_message_size: usize) -> Result<Vec<u8>, ReadError> {
        let mut len_buf = [0u8; 4];
        self.read_exact(&mut len_buf).await?;
        let len = Int32::read(&mut Cursor::new(len_buf))
            .expect("Reading Int32 from in-mem buffer should always work");

        if len.0 < 0 {
            return Err(ReadError::BadFrameSize { size: len.0 });
        }
        let len = len.0 as usize;
        if len > max_message_size {
            return Err(ReadError::TooLarge {
                size: len,
                max: max_message_size,
            });
        }

        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf).await?;
        Ok(buf)
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Cannot write data: {0}")]
    IO(#[from] std::io::Error),

    #[error("Message too large: {size}")]
    TooLarge { size: usize },
}

#[async_trait]
pub trait AsyncMessageWrite {
    async fn write_message(&mut self, msg: &[u8]) -> Result<(), WriteError>;
}

#[async_trait]
impl<W> AsyncMessageWrite for W
where
    W: AsyncWrite + Send + Unpin,
{
    async fn write_message(&mut self, msg: &[u8]) -> Result<(), WriteError> {
        let len = Int32(i32::try_from(msg.len()).map_err(|_| WriteError::TooLarge {
            size: msg.len(),
        })?);

        let mut len_buf = Vec::<u8>::with_capacity(4);
        len.write(&mut len_buf)
            .expect("Int32 should always be writable to in-mem buffer");

        self.write_all(len_buf.as_ref()).await?;
        self.write_all(msg).await?;

        Ok(())
    }
}
