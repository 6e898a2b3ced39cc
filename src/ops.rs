//! Typed operations accepted by the worker.
//!
//! Each struct names one partition (or one group) and carries exactly the
//! knobs the corresponding wire request exposes; the worker turns it into the
//! nested wire shape, routes it, and digests the response.

use crate::protocol::messages::MemberAssignment;

/// One message to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProduceMessage {
    /// Optional key, used by brokers for log compaction.
    pub key: Option<Vec<u8>>,

    /// The payload.
    pub value: Vec<u8>,
}

impl ProduceMessage {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }
}

/// Produce messages to one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequest {
    pub topic: String,
    pub partition: i32,

    /// 0 = fire-and-forget, 1 = leader ack, -1 = full ISR ack.
    pub required_acks: i16,

    /// How long the broker may wait for the acks, in milliseconds.
    pub timeout_ms: i32,

    pub messages: Vec<ProduceMessage>,

    /// Wire version to speak, 0 or 1.
    pub api_version: i16,
}

impl ProduceRequest {
    pub fn new(topic: impl Into<String>, partition: i32, messages: Vec<ProduceMessage>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            required_acks: 0,
            timeout_ms: 100,
            messages,
            api_version: 0,
        }
    }

    pub fn with_required_acks(mut self, acks: i16) -> Self {
        self.required_acks = acks;
        self
    }
}

/// Fetch messages from one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub topic: String,
    pub partition: i32,

    /// The offset to start reading from.
    pub offset: i64,

    /// How long the broker may wait to fill `min_bytes`, in milliseconds.
    pub wait_time_ms: i32,

    /// The fewest bytes the broker should answer with.
    pub min_bytes: i32,

    /// The most bytes the broker may answer with.
    pub max_bytes: i32,

    /// Wire version to speak, 0 or 1.
    pub api_version: i16,
}

impl FetchRequest {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            wait_time_ms: crate::config::DEFAULT_WAIT_TIME_MS,
            min_bytes: crate::config::DEFAULT_MIN_BYTES,
            max_bytes: crate::config::DEFAULT_MAX_BYTES,
            api_version: 0,
        }
    }
}

/// Query offsets for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetsRequest {
    pub topic: String,
    pub partition: i32,

    /// Offsets at or before this timestamp; `-1` latest, `-2` earliest.
    pub time: i64,

    /// The most offsets to report (v0 only).
    pub max_offsets: i32,

    /// Wire version to speak, 0 or 1.
    pub api_version: i16,
}

impl OffsetsRequest {
    /// Request the latest offset of a partition.
    pub fn latest(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
            time: -1,
            max_offsets: 1,
            api_version: 0,
        }
    }

    /// Request the earliest offset of a partition.
    pub fn earliest(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            time: -2,
            ..Self::latest(topic, partition)
        }
    }
}

/// Commit a consumed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCommitRequest {
    /// Group to commit under; defaults to the worker's configured group.
    pub consumer_group: Option<String>,

    pub topic: String,
    pub partition: i32,

    /// The offset to commit.
    pub offset: i64,

    /// Opaque metadata stored with the offset.
    pub metadata: Option<String>,

    /// Wire version to speak: 0 commits to Zookeeper, 1 to the coordinator.
    pub api_version: i16,
}

impl OffsetCommitRequest {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            consumer_group: None,
            topic: topic.into(),
            partition,
            offset,
            metadata: None,
            api_version: 0,
        }
    }
}

/// Fetch the last committed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetFetchRequest {
    /// Group to read from; defaults to the worker's configured group.
    pub consumer_group: Option<String>,

    pub topic: String,
    pub partition: i32,

    /// Wire version to speak: 0 reads Zookeeper offsets, 1 coordinator ones.
    pub api_version: i16,
}

impl OffsetFetchRequest {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            consumer_group: None,
            topic: topic.into(),
            partition,
            api_version: 0,
        }
    }
}

/// Join a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGroupRequest {
    pub group_name: String,

    /// Empty on first join; thereafter the id the coordinator assigned.
    pub member_id: String,

    /// The topics this member wants to consume.
    pub topics: Vec<String>,

    /// The coordinator considers the member dead after this long without a
    /// heartbeat.
    pub session_timeout_ms: i32,
}

/// Distribute (or receive) partition assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncGroupRequest {
    pub group_name: String,
    pub generation_id: i32,
    pub member_id: String,

    /// Per-member assignments; empty unless this member is the leader.
    pub assignments: Vec<GroupAssignment>,
}

/// One member's assignment, as distributed by the group leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub member_id: String,
    pub assignment: MemberAssignment,
}

/// Keep group membership alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub group_name: String,
    pub generation_id: i32,
    pub member_id: String,
}

/// Deregister from a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveGroupRequest {
    pub group_name: String,
    pub member_id: String,
}
