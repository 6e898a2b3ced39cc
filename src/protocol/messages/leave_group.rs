//! `LeaveGroup` request and response.

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Int16, String_},
    traits::{ReadType, WriteType},
};

use super::{
    ReadVersionedError, ReadVersionedType, RequestBody, WriteVersionedError, WriteVersionedType,
};

#[derive(Debug, PartialEq, Eq)]
pub struct LeaveGroupRequest {
    /// The group id.
    pub group_id: String_,

    /// The member leaving the group.
    pub member_id: String_,
}

impl RequestBody for LeaveGroupRequest {
    type ResponseBody = LeaveGroupResponse;

    const API_KEY: ApiKey = ApiKey::LeaveGroup;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(0)));
}

impl<W> WriteVersionedType<W> for LeaveGroupRequest
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

        self.group_id.write(writer)?;
        self.member_id.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for LeaveGroupRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            group_id: String_::read(reader)?,
            member_id: String_::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct LeaveGroupResponse {
    /// Error code.
    pub error: Option<ApiError>,
}

impl<R> ReadVersionedType<R> for LeaveGroupResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            error: ApiError::new(Int16::read(reader)?.0),
        })
    }
}

impl<W> WriteVersionedType<W> for LeaveGroupResponse
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
        Ok(())
    }
}
