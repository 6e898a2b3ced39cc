use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    record::MessageSet,
    primitives::{Int16, Int32, Int64, String_},
    traits::{ReadType, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

/// The `replica_id` signifying a request made by a normal consumer.
pub const NORMAL_CONSUMER: Int32 = Int32(-1);

#[derive(Debug, PartialEq, Eq)]
pub struct FetchRequestPartition {
    /// The partition index.
    pub partition_index: Int32,

    /// The message offset to start reading from.
    pub fetch_offset: Int64,

    /// The maximum bytes to fetch from this partition.
    pub partition_max_bytes: Int32,
}

impl<W> WriteVersionedType<W> for FetchRequestPartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.partition_index.write(writer)?;
        self.fetch_offset.write(writer)?;
        self.partition_max_bytes.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for FetchRequestPartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            partition_index: Int32::read(reader)?,
            fetch_offset: Int64::read(reader)?,
            partition_max_bytes: Int32::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchRequestTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition to fetch from.
    pub partitions: Vec<FetchRequestPartition>,
}

impl<W> WriteVersionedType<W> for FetchRequestTopic
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

impl<R> ReadVersionedType<R> for FetchRequestTopic
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
pub struct FetchRequest {
    /// The broker ID of the follower, or -1 for a normal consumer.
    pub replica_id: Int32,

    /// The maximum time in milliseconds to wait for the response.
    pub max_wait_ms: Int32,

    /// The minimum bytes to accumulate in the response.
    pub min_bytes: Int32,

    /// Each topic to fetch from.
    pub topics: Vec<FetchRequestTopic>,
}

impl RequestBody for FetchRequest {
    type ResponseBody = FetchResponse;

    const API_KEY: ApiKey = ApiKey::Fetch;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(1)));
}

impl<W> WriteVersionedType<W> for FetchRequest
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
        self.max_wait_ms.write(writer)?;
        self.min_bytes.write(writer)?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

impl<R> ReadVersionedType<R> for FetchRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            replica_id: Int32::read(reader)?,
            max_wait_ms: Int32::read(reader)?,
            min_bytes: Int32::read(reader)?,
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchResponsePartition {
    /// The partition index.
    pub partition_index: Int32,

    /// Error code.
    pub error: Option<ApiError>,

    /// The current high water mark.
    pub high_watermark: Int64,

    /// The fetched messages. A truncated trailing entry has already been
    /// dropped by the message-set decoder.
    pub message_set: MessageSet,
}

impl<R> ReadVersionedType<R> for FetchResponsePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            partition_index: Int32::read(reader)?,
            error: ApiError::new(Int16::read(reader)?.0),
            high_watermark: Int64::read(reader)?,
            message_set: MessageSet::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for FetchResponsePartition
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
        self.high_watermark.write(writer)?;
        self.message_set.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchResponseTopic {
    /// The topic name.
    pub name: String_,

    /// Each partition in the response.
    pub partitions: Vec<FetchResponsePartition>,
}

impl<R> ReadVersionedType<R> for FetchResponseTopic
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

impl<W> WriteVersionedType<W> for FetchResponseTopic
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
pub struct FetchResponse {
    /// The duration in milliseconds for which the request was throttled.
    ///
    /// Added in version 1.
    pub throttle_time_ms: Option<Int32>,

    /// Each topic in the response.
    pub topics: Vec<FetchResponseTopic>,
}

impl<R> ReadVersionedType<R> for FetchResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0 .0;
        if v > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            throttle_time_ms: (v >= 1).then(|| Int32::read(reader)).transpose()?,
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

impl<W> WriteVersionedType<W> for FetchResponse
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

        if v >= 1 {
            self.throttle_time_ms.unwrap_or(Int32(0)).write(writer)?;
        }
        write_versioned_array(writer, version, Some(&self.topics))
    }
}
