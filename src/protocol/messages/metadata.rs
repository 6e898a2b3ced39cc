use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    primitives::{Array, Int16, Int32, String_},
    traits::{ReadType, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

#[derive(Debug, PartialEq, Eq)]
pub struct MetadataRequest {
    /// The topics to fetch metadata for.
    ///
    /// An empty list requests data for all topics.
    pub topics: Vec<MetadataRequestTopic>,
}

impl RequestBody for MetadataRequest {
    type ResponseBody = MetadataResponse;

    const API_KEY: ApiKey = ApiKey::Metadata;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(0)));
}

impl<W> WriteVersionedType<W> for MetadataRequest
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

        write_versioned_array(writer, version, Some(&self.topics))
    }
}

impl<R> ReadVersionedType<R> for MetadataRequest
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MetadataRequestTopic {
    /// The topic name.
    pub name: String_,
}

impl<W> WriteVersionedType<W> for MetadataRequestTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        Ok(self.name.write(writer)?)
    }
}

impl<R> ReadVersionedType<R> for MetadataRequestTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String_::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MetadataResponse {
    /// Each broker in the response.
    pub brokers: Vec<MetadataResponseBroker>,

    /// Each topic in the response.
    pub topics: Vec<MetadataResponseTopic>,
}

impl<R> ReadVersionedType<R> for MetadataResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 != 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            brokers: read_versioned_array(reader, version)?.unwrap_or_default(),
            topics: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponse
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

        write_versioned_array(writer, version, Some(&self.brokers))?;
        write_versioned_array(writer, version, Some(&self.topics))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MetadataResponseBroker {
    /// The broker ID.
    pub node_id: Int32,
    /// The broker hostname.
    pub host: String_,
    /// The broker port.
    pub port: Int32,
}

impl<R> ReadVersionedType<R> for MetadataResponseBroker
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            node_id: Int32::read(reader)?,
            host: String_::read(reader)?,
            port: Int32::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponseBroker
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.node_id.write(writer)?;
        self.host.write(writer)?;
        self.port.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MetadataResponseTopic {
    /// The topic error, or 0 if there was no error.
    pub error_code: Int16,
    /// The topic name.
    pub name: String_,
    /// Each partition in the topic.
    pub partitions: Vec<MetadataResponsePartition>,
}

impl<R> ReadVersionedType<R> for MetadataResponseTopic
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            error_code: Int16::read(reader)?,
            name: String_::read(reader)?,
            partitions: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponseTopic
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.error_code.write(writer)?;
        self.name.write(writer)?;
        write_versioned_array(writer, version, Some(&self.partitions))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MetadataResponsePartition {
    /// The partition error, or 0 if there was no error.
    pub error_code: Int16,
    /// The partition index.
    pub partition_index: Int32,
    /// The ID of the leader broker, or -1 if there is none.
    pub leader_id: Int32,
    /// The set of all nodes that host this partition.
    pub replica_nodes: Array<Int32>,
    /// The set of all nodes that are in sync with the leader for this partition.
    pub isr_nodes: Array<Int32>,
}

impl<R> ReadVersionedType<R> for MetadataResponsePartition
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            error_code: Int16::read(reader)?,
            partition_index: Int32::read(reader)?,
            leader_id: Int32::read(reader)?,
            replica_nodes: Array::read(reader)?,
            isr_nodes: Array::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for MetadataResponsePartition
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.error_code.write(writer)?;
        self.partition_index.write(writer)?;
        self.leader_id.write(writer)?;
        self.replica_nodes.write(writer)?;
        self.isr_nodes.write(writer)?;
        Ok(())
    }
}
