//! `JoinGroup` request and response.
//!
//! Membership payloads (the per-protocol metadata) are opaque byte arrays on
//! the wire; the standard consumer embedded schema for them lives in
//! [`GroupProtocolMetadata`] so assignments interoperate with the stock Java
//! client and its tooling.
//!
//! # References
//! - <https://cwiki.apache.org/confluence/display/KAFKA/Kafka+Client-side+Assignment+Proposal>

use std::io::{Cursor, Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::{ApiVersion, ApiVersionRange},
    error::Error as ApiError,
    primitives::{Int16, Int32, NullableBytes, String_},
    traits::{ReadError, ReadType, WriteError, WriteType},
};

use super::{
    read_versioned_array, write_versioned_array, ReadVersionedError, ReadVersionedType,
    RequestBody, WriteVersionedError, WriteVersionedType,
};

/// The protocol type every consumer group uses.
pub const CONSUMER_PROTOCOL_TYPE: &str = "consumer";

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGroupRequestProtocol {
    /// The protocol name, e.g. `"assign"` or `"roundrobin"`.
    pub name: String_,

    /// The opaque protocol metadata, usually an encoded
    /// [`GroupProtocolMetadata`].
    pub metadata: NullableBytes,
}

impl<W> WriteVersionedType<W> for JoinGroupRequestProtocol
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.name.write(writer)?;
        self.metadata.write(writer)?;
        Ok(())
    }
}

impl<R> ReadVersionedType<R> for JoinGroupRequestProtocol
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            name: String_::read(reader)?,
            metadata: NullableBytes::read(reader)?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGroupRequest {
    /// The group id.
    pub group_id: String_,

    /// The coordinator considers the member dead if it receives no heartbeat
    /// within this time.
    pub session_timeout_ms: Int32,

    /// How long the coordinator waits for each member to rejoin during a
    /// rebalance.
    ///
    /// Added in version 1.
    pub rebalance_timeout_ms: Option<Int32>,

    /// The member id assigned by the coordinator, empty on first join.
    pub member_id: String_,

    /// The class of protocols, `"consumer"` for consumer groups.
    pub protocol_type: String_,

    /// The protocols the member supports, in preference order.
    pub protocols: Vec<JoinGroupRequestProtocol>,
}

impl RequestBody for JoinGroupRequest {
    type ResponseBody = JoinGroupResponse;

    const API_KEY: ApiKey = ApiKey::JoinGroup;

    const API_VERSION_RANGE: ApiVersionRange =
        ApiVersionRange::new(ApiVersion(Int16(0)), ApiVersion(Int16(1)));
}

impl<W> WriteVersionedType<W> for JoinGroupRequest
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
        self.session_timeout_ms.write(writer)?;
        if v >= 1 {
            // Default to the session timeout, like pre-KIP-62 clients did.
            self.rebalance_timeout_ms
                .unwrap_or(self.session_timeout_ms)
                .write(writer)?;
        }
        self.member_id.write(writer)?;
        self.protocol_type.write(writer)?;
        write_versioned_array(writer, version, Some(&self.protocols))
    }
}

impl<R> ReadVersionedType<R> for JoinGroupRequest
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
            session_timeout_ms: Int32::read(reader)?,
            rebalance_timeout_ms: (v >= 1).then(|| Int32::read(reader)).transpose()?,
            member_id: String_::read(reader)?,
            protocol_type: String_::read(reader)?,
            protocols: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGroupResponseMember {
    /// The member id.
    pub member_id: String_,

    /// The metadata this member published for the selected protocol.
    pub metadata: NullableBytes,
}

impl<R> ReadVersionedType<R> for JoinGroupResponseMember
where
    R: Read,
{
    fn read_versioned(reader: &mut R, _version: ApiVersion) -> Result<Self, ReadVersionedError> {
        Ok(Self {
            member_id: String_::read(reader)?,
            metadata: NullableBytes::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for JoinGroupResponseMember
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        _version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        self.member_id.write(writer)?;
        self.metadata.write(writer)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct JoinGroupResponse {
    /// Error code.
    pub error: Option<ApiError>,

    /// The group generation.
    pub generation_id: Int32,

    /// The protocol the coordinator selected.
    pub protocol_name: String_,

    /// The member id of the group leader.
    pub leader: String_,

    /// The member id assigned to this client.
    pub member_id: String_,

    /// The full membership, populated only for the leader.
    pub members: Vec<JoinGroupResponseMember>,
}

impl JoinGroupResponse {
    /// Whether this client was elected leader and must compute assignments.
    pub fn is_leader(&self) -> bool {
        self.leader == self.member_id
    }
}

impl<R> ReadVersionedType<R> for JoinGroupResponse
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            error: ApiError::new(Int16::read(reader)?.0),
            generation_id: Int32::read(reader)?,
            protocol_name: String_::read(reader)?,
            leader: String_::read(reader)?,
            member_id: String_::read(reader)?,
            members: read_versioned_array(reader, version)?.unwrap_or_default(),
        })
    }
}

impl<W> WriteVersionedType<W> for JoinGroupResponse
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

        Int16(self.error.map(|e| e.code()).unwrap_or(0)).write(writer)?;
        self.generation_id.write(writer)?;
        self.protocol_name.write(writer)?;
        self.leader.write(writer)?;
        self.member_id.write(writer)?;
        write_versioned_array(writer, version, Some(&self.members))
    }
}

/// The standard consumer embedded schema carried in
/// [`JoinGroupRequestProtocol::metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupProtocolMetadata {
    /// Schema version, 0 for the classic consumer protocol.
    pub version: Int16,

    /// The topics the member wants to consume.
    pub topics: Vec<String_>,

    /// Opaque application data.
    pub user_data: NullableBytes,
}

impl GroupProtocolMetadata {
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            version: Int16(0),
            topics: topics.into_iter().map(String_).collect(),
            user_data: NullableBytes(None),
        }
    }

    /// Encode into the opaque bytes the membership APIs carry.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = vec![];
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Decode from the opaque bytes of a join-group member entry.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ReadError> {
        Self::read(&mut Cursor::new(data))
    }
}

impl<R> ReadType<R> for GroupProtocolMetadata
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let version = Int16::read(reader)?;
        let topic_count = Int32::read(reader)?.0;
        let topic_count =
            usize::try_from(topic_count).map_err(|e| ReadError::Malformed(Box::new(e)))?;
        let mut topics = Vec::with_capacity(topic_count.min(1024));
        for _ in 0..topic_count {
            topics.push(String_::read(reader)?);
        }
        Ok(Self {
            version,
            topics,
            user_data: NullableBytes::read(reader)?,
        })
    }
}

impl<W> WriteType<W> for GroupProtocolMetadata
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        self.version.write(writer)?;
        let len = i32::try_from(self.topics.len())?;
        Int32(len).write(writer)?;
        for topic in &self.topics {
            topic.write(writer)?;
        }
        self.user_data.write(writer)?;
        Ok(())
    }
}
