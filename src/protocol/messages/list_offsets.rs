//! `ListOffsets` ("Offset") request and response.
//!
//! Version 1 ([KIP-79]) replaces the offset list of v0 with a single
//! timestamp/offset pair and drops `max_num_offsets` from the request.
//!
//! [KIP-79]: https://cwiki.apache.org/confluence/pages/viewpage.action?pageId=65868090

use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Array, Int16, Int32, Int64, String_},
    traits::{ReadType, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

/// Special timestamp requesting the latest offset.
pub const OFFSET_LATEST: Int64 = Int64(-1);

/// Special timestamp requesting the earliest offset.
pub const OFFSET_EARLIEST: Int64 = Int64(-2);

#[derive(Debug, PartialEq, Eq)]
pub struct ListOffsetsRequestPartition {
    /// The partition index.
    pub partition_index: Int32,

    /// Offsets at or before this timestamp are returned; `-1` means latest,
    /// `-2` earliest.
    pub timestamp: Int64,

    /// The maximum number of offsets to report.
    ///
    /// Removed in version 1.
    pub max_num_offsets: Option<Int32>,
}

impl<W> WriteVersionedType<W> for ListOffsetsRequestPartition
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
        self.timestamp.write(writer)?;

        if v < 1 {
            // Only fetch 1 offset by default.
            self.max_num_offsets.unwrap_or(Int32(1)).write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for ListOffsetsRequestPartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0 .0;

        Ok(Self {
            partition_index: Int32::read(reader)?,
            timestamp: Int64::read(reader)?,
            max_num_offsets: (v < 1).then(|| Int32::read(reader)).transpose()?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ListOffsetsRequestTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition in the request.
    pub partitions: Vec<ListOffsetsRequestPartition>,
}

impl<W> WriteVersionedType<W> for ListOffsetsRequestTopic
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

impl<R> ReadVersionedType<R> for ListOffsetsRequestTopic
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
pub struct ListOffsetsRequest {
    /// The broker ID of the requestor, or -1 if this request is being made by
    /// a normal consumer.
    pub replica_id: Int32,

    /// Each topic in the request.
    pub topics: Vec<ListOffsetsRequestTopic>,
}

impl RequestBody for ListOffsetsRequest {
    type ResponseBody = ListOffsetsResponse;

    const API_KEY: ApiKey = ApiKey::ListOffsets;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(1)));
}

impl<W> WriteVersionedType<W> for ListOffsetsRequest
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

        self.replica_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

impl<R> ReadVersionedType<R> for ListOffsetsRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            replica_id: Int32::read(reader)?,
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ListOffsetsResponsePartition {
    /// The partition index.
    pub partition_index: Int32,

    /// The partition error code, or 0 if there was no error.
    pub error: Option<ApiError>,

    /// The result offsets.
    ///
    /// Removed in version 1.
    pub old_style_offsets: Option<Array<Int64>>,

    /// The timestamp associated with the returned offset.
    ///
    /// Added in version 1.
    pub timestamp: Option<Int64>,

    /// The returned offset.
    ///
    /// Added in version 1.
    pub offset: Option<Int64>,
}

impl<R> ReadVersionedType<R> for ListOffsetsResponsePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0 .0;

        Ok(Self {
            partition_index: Int32::read(reader)?,
            error: ApiError::new(Int16::read(reader)?.0),
            old_style_offsets: (v < 1).then(|| Array::read(reader)).transpose()?,
            timestamp: (v >= 1).then(|| Int64::read(reader)).transpose()?,
            offset: (v >= 1).then(|| Int64::read(reader)).transpose()?,
        })
    }
}

impl<W> WriteVersionedType<W> for ListOffsetsResponsePartition
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
        Int16(self.error.map(|e| e.code()).unwrap_or(0)).write(writer)?;
        if v < 1 {
            self.old_style_offsets
                .as_ref()
                .unwrap_or(&Array(Some(vec![])))
                .write(writer)?;
        } else {
            self.timestamp.unwrap_or(Int64(-1)).write(writer)?;
            self.offset.unwrap_or(Int64(-1)).write(writer)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ListOffsetsResponseTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition in the response.
    pub partitions: Vec<ListOffsetsResponsePartition>,
}

impl<R> ReadVersionedType<R> for ListOffsetsResponseTopic
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

impl<W> WriteVersionedType<W> for ListOffsetsResponseTopic
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
pub struct ListOffsetsResponse {
    /// Each topic in the response.
    pub topics: Vec<ListOffsetsResponseTopic>,
}

impl<R> ReadVersionedType<R> for ListOffsetsResponse
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

impl<W> WriteVersionedType<W> for ListOffsetsResponse
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
            let request = ListOffsetsRequest {
                replica_id: Int32(-1),
                topics: vec![ListOffsetsRequestTopic {
                    name: String_("food".to_string()),
                    partitions: vec![ListOffsetsRequestPartition {
                        partition_index: Int32(0),
                        timestamp: OFFSET_LATEST,
                        max_num_offsets: (v < 1).then_some(Int32(1)),
                    }],
                }],
            };

            let mut buf = vec![];
            request.write_versioned(&mut buf, version).unwrap();

            let restored =
                ListOffsetsRequest::read_versioned(&mut Cursor::new(buf), version).unwrap();
            assert_eq!(restored, request);
        }
    }

    #[test]
    fn test_response_roundtrip() {
        for v in 0..=1 {
            let version = ApiVersion(Int16(v));
            let response = ListOffsetsResponse {
                topics: vec![ListOffsetsResponseTopic {
                    name: String_("food".to_string()),
                    partitions: vec![ListOffsetsResponsePartition {
                        partition_index: Int32(0),
                        error: None,
                        old_style_offsets: (v < 1).then_some(Array(Some(vec![Int64(17)]))),
                        timestamp: (v >= 1).then_some(Int64(1_500_000_000_000)),
                        offset: (v >= 1).then_some(Int64(17)),
                    }],
                }],
            };

            let mut buf = vec![];
            response.write_versioned(&mut buf, version).unwrap();

            let restored =
                ListOffsetsResponse::read_versioned(&mut Cursor::new(buf), version).unwrap();
            assert_eq!(restored, response);
        }
    }
}
