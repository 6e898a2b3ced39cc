//! `SyncGroup` request and response.
//!
//! The leader distributes assignments through the coordinator; every member
//! receives its own slice back. Assignment payloads are opaque bytes whose
//! standard consumer schema lives in [`MemberAssignment`].

use std::io::{Cursor, Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Array, Int16, Int32, NullableBytes, String_},
    traits::{ReadError, ReadType, WriteError, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

#[derive(Debug, PartialEq, Eq)]
pub struct SyncGroupRequestAssignment {
    /// The member this assignment is for.
    pub member_id: String_,

    /// The opaque assignment, usually an encoded [`MemberAssignment`].
    pub assignment: NullableBytes,
}

impl<W> WriteVersionedType<W> for SyncGroupRequestAssignment
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.member_id.write(writer)?;
        self.assignment.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for SyncGroupRequestAssignment
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            member_id: String_::read(reader)?,
            assignment: NullableBytes::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SyncGroupRequest {
    /// The group id.
    pub group_id: String_,

    /// The generation returned by the join.
    pub generation_id: Int32,

    /// This member's id.
    pub member_id: String_,

    /// All assignments, empty unless this member is the leader.
    pub assignments: Vec<SyncGroupRequestAssignment>,
}

impl RequestBody for SyncGroupRequest {
    type ResponseBody = SyncGroupResponse;

    const API_KEY: ApiKey = ApiKey::SyncGroup;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(0)));
}

impl<W> WriteVersionedType<W> for SyncGroupRequest
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
        write_versioned_array(writer, version, Some(&self.assignments))
    }
}

impl<R> ReadVersionedType<R> for SyncGroupRequest
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
            assignments: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SyncGroupResponse {
    /// Error code.
    pub error: Option<ApiError>,

    /// The assignment for this member.
    pub assignment: NullableBytes,
}

impl<R> ReadVersionedType<R> for SyncGroupResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            error: ApiError::new(Int16::read(reader)?.0),
            assignment: NullableBytes::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for SyncGroupResponse
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
        self.assignment.write(writer)?;
        Ok(())
    }
}

/// The standard consumer embedded schema carried in
/// [`SyncGroupResponse::assignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAssignment {
    /// Schema version, 0 for the classic consumer protocol.
    pub version: Int16,

    /// Assigned partitions per topic.
    pub partition_assignments: Vec<PartitionAssignment>,

    /// Opaque application data.
    pub user_data: NullableBytes,
}

/// One topic's worth of assigned partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssignment {
    /// The topic name.
    pub topic: String_,

    /// The assigned partition indexes.
    pub partitions: Array<Int32>,
}

impl MemberAssignment {
    /// Encode into the opaque bytes the membership APIs carry.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = vec![];
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Decode from the opaque bytes of a sync-group response.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ReadError> {
        Self::read(&mut Cursor::new(data))
    }
}

impl<R> ReadType<R> for MemberAssignment
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let version = Int16::read(reader)?;
        let count = Int32::read(reader)?.0;
        let count = usize::try_from(count).map_err(|e| ReadError::Malformed(Box::new(e)))?;
        let mut partition_assignments = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            partition_assignments.push(PartitionAssignment {
                topic: String_::read(reader)?,
                partitions: Array::read(reader)?,
            });
        }
        Ok(Self {
            version,
            partition_assignments,
            user_data: NullableBytes::read(reader)?,
        })
    }
}

impl<W> WriteType<W> for MemberAssignment
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.version.write(writer)?;
        let len = i32::try_from(self.partition_assignments.len())?;
        Int32(len).write(writer)?;
        for assignment in &self.partition_assignments {
            assignment.topic.write(writer)?;
            assignment.partitions.write(writer)?;
        }
        self.user_data.write(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V0: ApiVersion = ApiVersion(Int16(0));

    #[test]
    fn test_request_roundtrip() {
        let request = SyncGroupRequest {
            group_id: String_("group".to_string()),
            generation_id: Int32(1),
            member_id: String_("member-1".to_string()),
            assignments: vec![SyncGroupRequestAssignment {
                member_id: String_("member-1".to_string()),
                assignment: NullableBytes(Some(b"opaque".to_vec())),
            }],
        };

        let mut buf = vec![];
        request.write_versioned(&mut buf, V0).unwrap();

        let restored = SyncGroupRequest::read_versioned(&mut Cursor::new(buf), V0).unwrap();
        assert_eq!(restored, request);
    }

    #[test]
    fn test_response_roundtrip() {
        let response = SyncGroupResponse {
            error: Some(ApiError::RebalanceInProgress),
            assignment: NullableBytes(None),
        };

        let mut buf = vec![];
        response.write_versioned(&mut buf, V0).unwrap();

        let restored = SyncGroupResponse::read_versioned(&mut Cursor::new(buf), V0).unwrap();
        assert_eq!(restored, response);
    }

    #[test]
    fn test_member_assignment_roundtrip() {
        let assignment = MemberAssignment {
            version: Int16(0),
            partition_assignments: vec![PartitionAssignment {
                topic: String_("food".to_string()),
                partitions: Array(Some(vec![Int32(0), Int32(2)])),
            }],
            user_data: NullableBytes(None),
        };
        let bytes = assignment.to_bytes().unwrap();
        assert_eq!(MemberAssignment::from_bytes(&bytes).unwrap(), assignment);
    }
}
