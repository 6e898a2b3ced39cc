//! `GroupCoordinator` request and response.
//!
//! Locates the broker acting as coordinator for a consumer group. Every
//! group-membership and coordinator-backed offset call is routed to the
//! broker this response names.

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Int16, Int32, String_},
    traits::{ReadType, WriteType},
};

use super::{
    ReadVersionedError, ReadVersionedType, RequestBody, WriteVersionedError, WriteVersionedType,
};

#[derive(Debug, PartialEq, Eq)]
pub struct GroupCoordinatorRequest {
    /// The group id.
    pub group_id: String_,
}

impl RequestBody for GroupCoordinatorRequest {
    type ResponseBody = GroupCoordinatorResponse;

    const API_KEY: ApiKey = ApiKey::GroupCoordinator;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(0)));
}

impl<W> WriteVersionedType<W> for GroupCoordinatorRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        if version.0 .0 != 0 {
            return Err(WriteVersionedError::InvalidVersion { version });
        }

        Ok(self.group_id.write(writer)?)
    }
}

impl<R> ReadVersionedType<R> for GroupCoordinatorRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            group_id: String_::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct GroupCoordinatorResponse {
    /// Error code.
    pub error: Option<ApiError>,

    /// The coordinator's node id.
    pub coordinator_id: Int32,

    /// The coordinator's hostname.
    pub host: String_,

    /// The coordinator's port.
    pub port: Int32,
}

impl<R> ReadVersionedType<R> for GroupCoordinatorResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            error: ApiError::new(Int16::read(reader)?.0),
            coordinator_id: Int32::read(reader)?,
            host: String_::read(reader)?,
            port: Int32::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for GroupCoordinatorResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        if version.0 .0 != 0 {
            return Err(WriteVersionedError::InvalidVersion { version });
        }

        Int16(self.error.map(|e| e.code()).unwrap_or(0)).write(writer)?;
        self.coordinator_id.write(writer)?;
        self.host.write(writer)?;
        self.port.write(writer)?;
        Ok(())
    }
}
