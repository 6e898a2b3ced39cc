//! Kafka error codes.
//!
//! Numeric error codes carried in responses, mapped to symbolic kinds. Code
//! `0` means "no error" and is represented as `None` by [`Error::new`].
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_error_codes>

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Error {
    #[error("Unknown server error")]
    UnknownError,

    #[error("Offset out of range")]
    OffsetOutOfRange,

    #[error("Corrupt message")]
    CorruptMessage,

    #[error("Unknown topic or partition")]
    UnknownTopicOrPartition,

    #[error("Invalid message size")]
    InvalidMessageSize,

    #[error("Leader not available")]
    LeaderNotAvailable,

    #[error("Not leader for partition")]
    NotLeaderForPartition,

    #[error("Request timed out")]
    RequestTimedOut,

    #[error("Broker not available")]
    BrokerNotAvailable,

    #[error("Replica not available")]
    ReplicaNotAvailable,

    #[error("Message size too large")]
    MessageSizeTooLarge,

    #[error("Stale controller epoch")]
    StaleControllerEpoch,

    #[error("Offset metadata too large")]
    OffsetMetadataTooLarge,

    #[error("Offsets load in progress")]
    OffsetsLoadInProgress,

    #[error("Consumer coordinator not available")]
    ConsumerCoordinatorNotAvailable,

    #[error("Not coordinator for consumer")]
    NotCoordinatorForConsumer,

    #[error("Invalid topic")]
    InvalidTopic,

    #[error("Record list too large")]
    RecordListTooLarge,

    #[error("Not enough replicas")]
    NotEnoughReplicas,

    #[error("Not enough replicas after append")]
    NotEnoughReplicasAfterAppend,

    #[error("Invalid required acks")]
    InvalidRequiredAcks,

    #[error("Illegal generation")]
    IllegalGeneration,

    #[error("Inconsistent group protocol")]
    InconsistentGroupProtocol,

    #[error("Invalid group id")]
    InvalidGroupId,

    #[error("Unknown member id")]
    UnknownMemberId,

    #[error("Invalid session timeout")]
    InvalidSessionTimeout,

    #[error("Rebalance in progress")]
    RebalanceInProgress,

    #[error("Invalid commit offset size")]
    InvalidCommitOffsetSize,

    #[error("Topic authorization failed")]
    TopicAuthorizationFailed,

    #[error("Group authorization failed")]
    GroupAuthorizationFailed,

    #[error("Cluster authorization failed")]
    ClusterAuthorizationFailed,

    /// A non-zero code this client has no mapping for, surfaced verbatim.
    #[error("Unknown server error (code {0})")]
    UnknownServerError(i16),
}

impl Error {
    /// Map a wire error code, with `0` meaning no error.
    pub fn new(code: i16) -> Option<Self> {
        match code {
            0 => None,
            -1 => Some(Self::UnknownError),
            1 => Some(Self::OffsetOutOfRange),
            2 => Some(Self::CorruptMessage),
            3 => Some(Self::UnknownTopicOrPartition),
            4 => Some(Self::InvalidMessageSize),
            5 => Some(Self::LeaderNotAvailable),
            6 => Some(Self::NotLeaderForPartition),
            7 => Some(Self::RequestTimedOut),
            8 => Some(Self::BrokerNotAvailable),
            9 => Some(Self::ReplicaNotAvailable),
            10 => Some(Self::MessageSizeTooLarge),
            11 => Some(Self::StaleControllerEpoch),
            12 => Some(Self::OffsetMetadataTooLarge),
            14 => Some(Self::OffsetsLoadInProgress),
            15 => Some(Self::ConsumerCoordinatorNotAvailable),
            16 => Some(Self::NotCoordinatorForConsumer),
            17 => Some(Self::InvalidTopic),
            18 => Some(Self::RecordListTooLarge),
            19 => Some(Self::NotEnoughReplicas),
            20 => Some(Self::NotEnoughReplicasAfterAppend),
            21 => Some(Self::InvalidRequiredAcks),
            22 => Some(Self::IllegalGeneration),
            23 => Some(Self::InconsistentGroupProtocol),
            24 => Some(Self::InvalidGroupId),
            25 => Some(Self::UnknownMemberId),
            26 => Some(Self::InvalidSessionTimeout),
            27 => Some(Self::RebalanceInProgress),
            28 => Some(Self::InvalidCommitOffsetSize),
            29 => Some(Self::TopicAuthorizationFailed),
            30 => Some(Self::GroupAuthorizationFailed),
            31 => Some(Self::ClusterAuthorizationFailed),
            other => Some(Self::UnknownServerError(other)),
        }
    }

    /// The wire code for this error.
    pub fn code(&self) -> i16 {
        match self {
            Self::UnknownError => -1,
            Self::OffsetOutOfRange => 1,
            Self::CorruptMessage => 2,
            Self::UnknownTopicOrPartition => 3,
            Self::InvalidMessageSize => 4,
            Self::LeaderNotAvailable => 5,
            Self::NotLeaderForPartition => 6,
            Self::RequestTimedOut => 7,
            Self::BrokerNotAvailable => 8,
            Self::ReplicaNotAvailable => 9,
            Self::MessageSizeTooLarge => 10,
            Self::StaleControllerEpoch => 11,
            Self::OffsetMetadataTooLarge => 12,
            Self::OffsetsLoadInProgress => 14,
            Self::ConsumerCoordinatorNotAvailable => 15,
            Self::NotCoordinatorForConsumer => 16,
            Self::InvalidTopic => 17,
            Self::RecordListTooLarge => 18,
            Self::NotEnoughReplicas => 19,
            Self::NotEnoughReplicasAfterAppend => 20,
            Self::InvalidRequiredAcks => 21,
            Self::IllegalGeneration => 22,
            Self::InconsistentGroupProtocol => 23,
            Self::InvalidGroupId => 24,
            Self::UnknownMemberId => 25,
            Self::InvalidSessionTimeout => 26,
            Self::RebalanceInProgress => 27,
            Self::InvalidCommitOffsetSize => 28,
            Self::TopicAuthorizationFailed => 29,
            Self::GroupAuthorizationFailed => 30,
            Self::ClusterAuthorizationFailed => 31,
            Self::UnknownServerError(code) => *code,
        }
    }

    /// True for the two codes that mean "this broker is not (or no longer)
    /// the group coordinator".
    pub fn invalidates_coordinator(&self) -> bool {
        matches!(
            self,
            Self::ConsumerCoordinatorNotAvailable | Self::NotCoordinatorForConsumer
        )
    }
}
