//! ApiKey to tag request types.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_api_keys>

use super::primitives::Int16;

/// The APIs this client speaks.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ApiKey {
    Produce,
    Fetch,
    ListOffsets,
    Metadata,
    OffsetCommit,
    OffsetFetch,
    GroupCoordinator,
    JoinGroup,
    Heartbeat,
    LeaveGroup,
    SyncGroup,
    Unknown(Int16),
}

impl From<Int16> for ApiKey {
    fn from(key: Int16) -> Self {
        match key.0 {
            0 => Self::Produce,
            1 => Self::Fetch,
            2 => Self::ListOffsets,
            3 => Self::Metadata,
            8 => Self::OffsetCommit,
            9 => Self::OffsetFetch,
            10 => Self::GroupCoordinator,
            11 => Self::JoinGroup,
            12 => Self::Heartbeat,
            13 => Self::LeaveGroup,
            14 => Self::SyncGroup,
            _ => Self::Unknown(key),
        }
    }
}

impl From<ApiKey> for Int16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Produce => Int16(0),
            ApiKey::Fetch => Int16(1),
            ApiKey::ListOffsets => Int16(2),
            ApiKey::Metadata => Int16(3),
            ApiKey::OffsetCommit => Int16(8),
            ApiKey::OffsetFetch => Int16(9),
            ApiKey::GroupCoordinator => Int16(10),
            ApiKey::JoinGroup => Int16(11),
            ApiKey::Heartbeat => Int16(12),
            ApiKey::LeaveGroup => Int16(13),
            ApiKey::SyncGroup => Int16(14),
            ApiKey::Unknown(code) => code,
        }
    }
}
