use std::io::{Read, Write};

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReadError {
    #[error("Cannot read data: {0}")]
    IO(#[from] std::io::Error),

    #[error("Overflow converting integer: {0}")]
    Overflow(#[from] std::num::TryFromIntError),

    #[error("Malformed data: {0}")]
    Malformed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub trait ReadType<R>: Sized
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError>;
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WriteError {
    #[error("Cannot write data: {0}")]
    IO(#[from] std::io::Error),

    #[error("Overflow converting integer: {0}")]
    Overflow(#[from] std::num::TryFromIntError),

    #[error("Malformed data: {0}")]
    Malformed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub trait WriteType<W>: Sized
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError>;
}

/// Chunk size for length-prefixed reads (64KiB).
const READ_CHUNK: usize = 64 * 1024;

/// Read exactly `len` bytes without trusting `len` for pre-allocation.
///
/// A hostile length prefix must run out of input (an I/O error) before it can
/// run us out of memory, so the buffer grows at most one chunk at a time.
pub(crate) fn read_exact_bytes<R>(reader: &mut R, len: usize) -> Result<Vec<u8>, ReadError>
where
    R: Read,
{
    let mut buf = Vec::with_capacity(len.min(READ_CHUNK));
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(READ_CHUNK);
        let start = buf.len();
        buf.resize(start + chunk, 0);
        reader.read_exact(&mut buf[start..])?;
        remaining -= chunk;
    }
    Ok(buf)
}
