//! `OffsetFetch` request and response.
//!
//! Versions 0 and 1 share a wire shape; v0 answers from Zookeeper, v1 from
//! the offsets the group coordinator stores.

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Array, Int16, Int32, Int64, NullableString, String_},
    traits::{ReadType, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetFetchRequestTopic {
    /// The topic name.
    pub name: String_,

    /// The partition indexes to fetch offsets for.
    pub partition_indexes: Array<Int32>,
}

impl<W> WriteVersionedType<W> for OffsetFetchRequestTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.name.write(writer)?;
        self.partition_indexes.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for OffsetFetchRequestTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String_::read(reader)?,
            partition_indexes: Array::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetFetchRequest {
    /// The group id.
    pub group_id: String_,

    /// Each topic to fetch offsets for.
    pub topics: Vec<OffsetFetchRequestTopic>,
}

impl RequestBody for OffsetFetchRequest {
    type ResponseBody = OffsetFetchResponse;

    const API_KEY: ApiKey = ApiKey::OffsetFetch;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(1)));
}

impl<W> WriteVersionedType<W> for OffsetFetchRequest
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

        self.group_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

impl<R> ReadVersionedType<R> for OffsetFetchRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            group_id: String_::read(reader)?,
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetFetchResponsePartition {
    /// The partition index.
    pub partition_index: Int32,

    /// The committed offset, or -1 if there is none.
    pub committed_offset: Int64,

    /// The metadata stored with the offset.
    pub metadata: NullableString,

    /// Error code.
    pub error: Option<ApiError>,
}

impl<R> ReadVersionedType<R> for OffsetFetchResponsePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            partition_index: Int32::read(reader)?,
            committed_offset: Int64::read(reader)?,
            metadata: NullableString::read(reader)?,
            error: ApiError::new(Int16::read(reader)?.0),
        })
    }
}

impl<W> WriteVersionedType<W> for OffsetFetchResponsePartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.partition_index.write(writer)?;
        self.committed_offset.write(writer)?;
        self.metadata.write(writer)?;
        Int16(self.error.map(|e| e.code()).unwrap_or(0)).write(writer)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OffsetFetchResponseTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition in the response.
    pub partitions: Vec<OffsetFetchResponsePartition>,
}

impl<R> ReadVersionedType<R> for OffsetFetchResponseTopic
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

impl<W> WriteVersionedType<W> for OffsetFetchResponseTopic
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
pub struct OffsetFetchResponse {
    /// Each topic in the response.
    pub topics: Vec<OffsetFetchResponseTopic>,
}

impl<R> ReadVersionedType<R> for OffsetFetchResponse
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

impl<W> WriteVersionedType<W> for OffsetFetchResponse
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
        let version = ApiVersion(Int16(1));
        let request = OffsetFetchRequest {
            group_id: String_("group".to_string()),
            topics: vec![OffsetFetchRequestTopic {
                name: String_("food".to_string()),
                partition_indexes: Array(Some(vec![Int32(0), Int32(3)])),
            }],
        };

        let mut buf = vec![];
        request.write_versioned(&mut buf, version).unwrap();

        let restored = OffsetFetchRequest::read_versioned(&mut Cursor::new(buf), version).unwrap();
        assert_eq!(restored, request);
    }

    #[test]
    fn test_response_roundtrip() {
        let version = ApiVersion(Int16(0));
        let response = OffsetFetchResponse {
            topics: vec![OffsetFetchResponseTopic {
                name: String_("food".to_string()),
                partitions: vec![OffsetFetchResponsePartition {
                    partition_index: Int32(0),
                    committed_offset: Int64(9),
                    metadata: NullableString(None),
                    error: None,
                }],
            }],
        };

        let mut buf = vec![];
        response.write_versioned(&mut buf, version).unwrap();

        let restored = OffsetFetchResponse::read_versioned(&mut Cursor::new(buf), version).unwrap();
        assert_eq!(restored, response);
    }
}
