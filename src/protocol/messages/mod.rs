//! Individual API messages.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_messages>

use std::io::{Read, Write};

use thiserror::Error;

use super::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    primitives::Int32,
    traits::{ReadError, ReadType, WriteError, WriteType},
};

mod fetch;
pub use fetch::*;
mod group_coordinator;
pub use group_coordinator::*;
mod header;
pub use header::*;
mod heartbeat;
pub use heartbeat::*;
mod join_group;
pub use join_group::*;
mod leave_group;
pub use leave_group::*;
mod list_offsets;
pub use list_offsets::*;
mod metadata;
pub use metadata::*;
mod offset_commit;
pub use offset_commit::*;
mod offset_fetch;
pub use offset_fetch::*;
mod produce;
pub use produce::*;
mod sync_group;
pub use sync_group::*;

#[derive(Error, Debug)]
pub enum ReadVersionedError {
    #[error("Read error: {0}")]
    ReadError(#[from] ReadError),

    #[error("Invalid version: {version:?}")]
    InvalidVersion { version: ApiVersion },
}

pub trait ReadVersionedType<R>: Sized
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError>;
}

#[derive(Error, Debug)]
pub enum WriteVersionedError {
    #[error("Write error: {0}")]
    WriteError(#[from] WriteError),

    #[error("Invalid version: {version:?}")]
    InvalidVersion { version: ApiVersion },

    #[error("Field {field} not available in version: {version:?}")]
    FieldNotAvailable { field: String, version: ApiVersion },
}

pub trait WriteVersionedType<W>: Sized
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError>;
}

impl<'a, W: Write, T: WriteVersionedType<W>> WriteVersionedType<W> for &'a T {
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        T::write_versioned(self, writer, version)
    }
}

/// Specifies a request body.
pub trait RequestBody {
    /// The response type that will follow when issuing this request.
    type ResponseBody;

    /// Kafka API key.
    ///
    /// This will be added to the request header.
    const API_KEY: ApiKey;

    /// Supported version range.
    const API_VERSION_RANGE: ApiVersionRange;
}

impl<'a, T: RequestBody> RequestBody for &'a T {
    type ResponseBody = T::ResponseBody;
    const API_KEY: ApiKey = T::API_KEY;
    const API_VERSION_RANGE: ApiVersionRange = T::API_VERSION_RANGE;
}

/// Read an `INT32`-counted array of versioned objects.
fn read_versioned_array<R: Read, T: ReadVersionedType<R>>(
    reader: &mut R,
    version: ApiVersion,
) -> Result<Option<Vec<T>>, ReadVersionedError> {
    let len = Int32::read(reader)?.0;
    match len {
        -1 => Ok(None),
        l if l < -1 => Err(ReadVersionedError::ReadError(ReadError::Malformed(
            format!("Invalid negative length for array: {l}").into(),
        ))),
        _ => {
            let len = len as usize;
            let mut res = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                res.push(T::read_versioned(reader, version)?);
            }
            Ok(Some(res))
        }
    }
}

/// Write an `INT32`-counted array of versioned objects.
fn write_versioned_array<W: Write, T: WriteVersionedType<W>>(
    writer: &mut W,
    version: ApiVersion,
    data: Option<&[T]>,
) -> Result<(), WriteVersionedError> {
    match data {
        None => Ok(Int32(-1).write(writer)?),
        Some(inner) => {
            let len = i32::try_from(inner.len()).map_err(WriteError::from)?;
            Int32(len).write(writer)?;

            for element in inner {
                element.write_versioned(writer, version)?
            }

            Ok(())
        }
    }
}
