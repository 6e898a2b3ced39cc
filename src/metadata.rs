//! Cluster-wide Kafka metadata.
//!
//! A [`MetadataSnapshot`] is the decoded form of one Metadata response. The
//! worker replaces its snapshot wholesale after every refresh; lookups here
//! are pure reads, mutation is entirely the worker's business.

use crate::protocol::messages::{GroupCoordinatorResponse, MetadataResponse};

/// Metadata for a certain broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMetadata {
    /// The broker ID.
    pub node_id: i32,

    /// The broker hostname.
    pub host: String,

    /// The broker port.
    pub port: i32,
}

/// Metadata for a certain partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    /// The partition index.
    pub partition_id: i32,

    /// The partition error code, 0 if none.
    pub error_code: i16,

    /// The `node_id` of the leader broker, or -1 if leaderless.
    pub leader: i32,

    /// All nodes hosting this partition.
    pub replicas: Vec<i32>,

    /// The in-sync subset of the replicas.
    pub isrs: Vec<i32>,
}

/// Metadata for a certain topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    /// The topic name.
    pub topic: String,

    /// The topic error code, 0 if none.
    pub error_code: i16,

    /// Each partition in the topic.
    pub partitions: Vec<PartitionMetadata>,
}

/// One decoded Metadata response: the worker's entire view of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataSnapshot {
    /// Brokers.
    pub brokers: Vec<BrokerMetadata>,

    /// Topics.
    pub topics: Vec<TopicMetadata>,
}

impl MetadataSnapshot {
    /// Resolve the leader broker for `(topic, partition)`.
    ///
    /// Returns `None` when the topic or partition is unknown, either carries
    /// a non-zero error code, the partition is leaderless (`leader == -1`),
    /// or the leader is missing from the broker list.
    pub fn broker_for(&self, topic: &str, partition: i32) -> Option<&BrokerMetadata> {
        let topic = self
            .topics
            .iter()
            .find(|t| t.topic == topic && t.error_code == 0)?;
        let partition = topic
            .partitions
            .iter()
            .find(|p| p.partition_id == partition && p.error_code == 0)?;
        if partition.leader == -1 {
            return None;
        }
        self.brokers
            .iter()
            .find(|b| b.node_id == partition.leader)
    }

    /// Whether any topic in the snapshot reports `LeaderNotAvailable`.
    pub fn has_leader_not_available(&self) -> bool {
        let code = crate::protocol::error::Error::LeaderNotAvailable.code();
        self.topics.iter().any(|t| t.error_code == code)
    }
}

impl From<MetadataResponse> for MetadataSnapshot {
    fn from(response: MetadataResponse) -> Self {
        Self {
            brokers: response
                .brokers
                .into_iter()
                .map(|b| BrokerMetadata {
                    node_id: b.node_id.0,
                    host: b.host.0,
                    port: b.port.0,
                })
                .collect(),
            topics: response
                .topics
                .into_iter()
                .map(|t| TopicMetadata {
                    topic: t.name.0,
                    error_code: t.error_code.0,
                    partitions: t
                        .partitions
                        .into_iter()
                        .map(|p| PartitionMetadata {
                            partition_id: p.partition_index.0,
                            error_code: p.error_code.0,
                            leader: p.leader_id.0,
                            replicas: p
                                .replica_nodes
                                .0
                                .unwrap_or_default()
                                .into_iter()
                                .map(|n| n.0)
                                .collect(),
                            isrs: p
                                .isr_nodes
                                .0
                                .unwrap_or_default()
                                .into_iter()
                                .map(|n| n.0)
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Which broker coordinates a consumer group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerMetadata {
    /// The coordinator's node id.
    pub coordinator_node_id: i32,

    /// The coordinator's hostname.
    pub coordinator_host: String,

    /// The coordinator's port.
    pub coordinator_port: i32,

    /// The error code the discovery response carried, 0 if none.
    pub error_code: i16,
}

impl From<GroupCoordinatorResponse> for ConsumerMetadata {
    fn from(response: GroupCoordinatorResponse) -> Self {
        Self {
            coordinator_node_id: response.coordinator_id.0,
            coordinator_host: response.host.0,
            coordinator_port: response.port.0,
            error_code: response.error.map(|e| e.code()).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot {
            brokers: vec![
                BrokerMetadata {
                    node_id: 1,
                    host: "kafka1".to_string(),
                    port: 9092,
                },
                BrokerMetadata {
                    node_id: 2,
                    host: "kafka2".to_string(),
                    port: 9092,
                },
            ],
            topics: vec![TopicMetadata {
                topic: "food".to_string(),
                error_code: 0,
                partitions: vec![
                    PartitionMetadata {
                        partition_id: 0,
                        error_code: 0,
                        leader: 1,
                        replicas: vec![1, 2],
                        isrs: vec![1, 2],
                    },
                    PartitionMetadata {
                        partition_id: 1,
                        error_code: 0,
                        leader: -1,
                        replicas: vec![2],
                        isrs: vec![],
                    },
                    PartitionMetadata {
                        partition_id: 2,
                        error_code: 5,
                        leader: 2,
                        replicas: vec![2],
                        isrs: vec![2],
                    },
                    PartitionMetadata {
                        partition_id: 3,
                        error_code: 0,
                        leader: 9,
                        replicas: vec![9],
                        isrs: vec![9],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_broker_for_hit() {
        let snapshot = snapshot();
        let broker = snapshot.broker_for("food", 0).unwrap();
        assert_eq!(broker.node_id, 1);
    }

    #[test]
    fn test_broker_for_unknown_topic() {
        assert!(snapshot().broker_for("nope", 0).is_none());
    }

    #[test]
    fn test_broker_for_unknown_partition() {
        assert!(snapshot().broker_for("food", 42).is_none());
    }

    #[test]
    fn test_broker_for_leaderless_partition() {
        assert!(snapshot().broker_for("food", 1).is_none());
    }

    #[test]
    fn test_broker_for_errored_partition() {
        assert!(snapshot().broker_for("food", 2).is_none());
    }

    #[test]
    fn test_broker_for_leader_missing_from_broker_list() {
        assert!(snapshot().broker_for("food", 3).is_none());
    }

    #[test]
    fn test_broker_for_errored_topic() {
        let mut snapshot = snapshot();
        snapshot.topics[0].error_code = 5;
        assert!(snapshot.broker_for("food", 0).is_none());
    }

    #[test]
    fn test_has_leader_not_available() {
        let mut snapshot = snapshot();
        assert!(!snapshot.has_leader_not_available());
        snapshot.topics[0].error_code = 5;
        assert!(snapshot.has_leader_not_available());
    }
}
