//! `OffsetCommit` request and response.
//!
//! Version 0 commits to Zookeeper, version 1 to the group coordinator and
//! adds the group generation, member id and a per-partition timestamp.

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Int16, Int32, Int64, NullableString, String_},
    traits::{ReadType, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetCommitRequestPartition {
    /// The partition index.
    pub partition_index: Int32,

    /// The offset to commit.
    pub committed_offset: Int64,

    /// The commit timestamp; `-1` lets the broker assign one.
    ///
    /// Added in version 1.
    pub timestamp: Option<Int64>,

    /// Opaque metadata stored with the offset.
    pub committed_metadata: NullableString,
}

impl<W> WriteVersionedType<W> for OffsetCommitRequestPartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0 .0;

        self.partition_index.write(writer)?;
        self.committed_offset.write(writer)?;
        if v >= 1 {
            self.timestamp.unwrap_or(Int64(-1)).write(writer)?;
        }
        self.committed_metadata.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for OffsetCommitRequestPartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0 .0;

        Ok(Self {
            partition_index: Int32::read(reader)?,
            committed_offset: Int64::read(reader)?,
            timestamp: (v >= 1).then(|| Int64::read(reader)).transpose()?,
            committed_metadata: NullableString::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetCommitRequestTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition to commit offsets for.
    pub partitions: Vec<OffsetCommitRequestPartition>,
}

impl<W> WriteVersionedType<W> for OffsetCommitRequestTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.name.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

impl<R> ReadVersionedType<R> for OffsetCommitRequestTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String_::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetCommitRequest {
    /// The group id.
    pub group_id: String_,

    /// The group generation.
    ///
    /// Added in version 1.
    pub generation_id: Option<Int32>,

    /// The member id assigned by the coordinator.
    ///
    /// Added in version 1.
    pub member_id: Option<String_>,

    /// Each topic to commit offsets for.
    pub topics: Vec<OffsetCommitRequestTopic>,
}

impl RequestBody for OffsetCommitRequest {
    type ResponseBody = OffsetCommitResponse;

    const API_KEY: ApiKey = ApiKey::OffsetCommit;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(1)));
}

impl<W> WriteVersionedType<W> for OffsetCommitRequest
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0 .0;
        if v > 1 {
            return Err(WriteVersionedError::InvalidVersion { version });
        }

        self.group_id.write(writer)?;
        if v >= 1 {
            self.generation_id.unwrap_or(Int32(-1)).write(writer)?;
            self.member_id
                .as_ref()
                .unwrap_or(&String_(String::new()))
                .write(writer)?;
        }
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

impl<R> ReadVersionedType<R> for OffsetCommitRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0 .0;
        if v > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            group_id: String_::read(reader)?,
            generation_id: (v >= 1).then(|| Int32::read(reader)).transpose()?,
            member_id: (v >= 1).then(|| String_::read(reader)).transpose()?,
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetCommitResponsePartition {
    /// The partition index.
    pub partition_index: Int32,

    /// Error code.
    pub error: Option<ApiError>,
}

impl<R> ReadVersionedType<R> for OffsetCommitResponsePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            partition_index: Int32::read(reader)?,
            error: ApiError::new(Int16::read(reader)?.0),
        })
    }
}

impl<W> WriteVersionedType<W> for OffsetCommitResponsePartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.partition_index.write(writer)?;
        Int16(self.error.map(|e| e.code()).unwrap_or(0)).write(writer)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetCommitResponseTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition in the response.
    pub partitions: Vec<OffsetCommitResponsePartition>,
}

impl<R> ReadVersionedType<R> for OffsetCommitResponseTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String_::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

impl<W> WriteVersionedType<W> for OffsetCommitResponseTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.name.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetCommitResponse {
    /// Each topic in the response.
    pub topics: Vec<OffsetCommitResponseTopic>,
}

impl<R> ReadVersionedType<R> for OffsetCommitResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

impl<W> WriteVersionedType<W> for OffsetCommitResponse
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        if version.0 .0 > 1 {
            return Err(WriteVersionedError::InvalidVersion { version });
        }

        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_roundtrip() {
        for v in 0..=1 {
            let version = ApiVersion(Int16(v));
            let request = OffsetCommitRequest {
                group_id: String_("group".to_string()),
                generation_id: (v >= 1).then_some(Int32(3)),
                member_id: (v >= 1).then_some(String_("member-1".to_string())),
                topics: vec![OffsetCommitRequestTopic {
                    name: String_("food".to_string()),
                    partitions: vec![OffsetCommitRequestPartition {
                        partition_index: Int32(0),
                        committed_offset: Int64(100),
                        timestamp: (v >= 1).then_some(Int64(-1)),
                        committed_metadata: NullableString(None),
                    }],
                }],
            };

            let mut buf = vec![];
            request.write_versioned(&mut buf, version).unwrap();

            let restored =
                OffsetCommitRequest::read_versioned(&mut Cursor::new(buf), version).unwrap();
            assert_eq!(restored, request);
        }
    }

    #[test]
    fn test_response_roundtrip() {
        let version = ApiVersion(Int16(0));
        let response = OffsetCommitResponse {
            topics: vec![OffsetCommitResponseTopic {
                name: String_("food".to_string()),
                partitions: vec![OffsetCommitResponsePartition {
                    partition_index: Int32(0),
                    error: Some(ApiError::OffsetMetadataTooLarge),
                }],
            }],
        };

        let mut buf = vec![];
        response.write_versioned(&mut buf, version).unwrap();

        let restored =
            OffsetCommitResponse::read_versioned(&mut Cursor::new(buf), version).unwrap();
        assert_eq!(restored, response);
    }
}
