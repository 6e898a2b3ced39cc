//! `Heartbeat` request and response.

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
pub struct HeartbeatRequest {
    /// The group id.
    pub group_id: String_,

    /// The generation returned by the join.
    pub generation_id: Int32,

    /// This member's id.
    pub member_id: String_,
}

impl RequestBody for HeartbeatRequest {
    type ResponseBody = HeartbeatResponse;

    const API_KEY: ApiKey = ApiKey::Heartbeat;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(0)));
}

impl<W> WriteVersionedType<W> for HeartbeatRequest
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
        self.generation_id.write(writer)?;
        self.member_id.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for HeartbeatRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            group_id: String_::read(reader)?,
            generation_id: Int32::read(reader)?,
            member_id: String_::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct HeartbeatResponse {
    /// Error code.
    pub error: Option<ApiError>,
}

impl<R> ReadVersionedType<R> for HeartbeatResponse
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

impl<W> WriteVersionedType<W> for HeartbeatResponse
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

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const V0: ApiVersion = ApiVersion(Int16(0));

    #[test]
    fn test_roundtrip() {
        let request = HeartbeatRequest {
            group_id: String_("group".to_string()),
            generation_id: Int32(1),
            member_id: String_("member-1".to_string()),
        };

        let mut buf = vec![];
        request.write_versioned(&mut buf, V0).unwrap();
        let restored = HeartbeatRequest::read_versioned(&mut Cursor::new(buf), V0).unwrap();
        assert_eq!(restored, request);

        let response = HeartbeatResponse {
            error: Some(ApiError::IllegalGeneration),
        };
        let mut buf = vec![];
        response.write_versioned(&mut buf, V0).unwrap();
        let restored = HeartbeatResponse::read_versioned(&mut Cursor::new(buf), V0).unwrap();
        assert_eq!(restored, response);
    }
}
