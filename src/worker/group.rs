//! Consumer-group operations: coordinator discovery and the ops routed
//! through it.
//!
//! The coordinator is one of the cluster brokers, so routing resolves the
//! discovered `(host, port)` against the worker's connection list rather
//! than opening anything new. A response carrying
//! `NotCoordinatorForConsumer` or `ConsumerCoordinatorNotAvailable` drops
//! the cached discovery so the next call starts over.

use std::io::Cursor;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config;
use crate::error::{Result, WorkerError};
use crate::metadata::ConsumerMetadata;
use crate::ops;
use crate::protocol::api_version::ApiVersion;
use crate::protocol::error::Error as ApiError;
use crate::protocol::messages as wire;
use crate::protocol::messages::{ReadVersionedType, RequestBody, WriteVersionedType};
use crate::protocol::primitives::{Int16, Int32, Int64, NullableBytes, NullableString, String_};

use super::{decode_response, BrokerWorker, V0};

impl BrokerWorker {
    /// Ask the cluster which broker coordinates the configured group,
    /// retrying while the coordinator is still being elected.
    pub(super) async fn update_consumer_metadata(&mut self) -> Result<ConsumerMetadata> {
        let group = self
            .consumer_group
            .clone()
            .ok_or(WorkerError::NoConsumerGroup)?;

        let mut retries_left = config::RETRY_COUNT;
        loop {
            let correlation_id = self.correlation_id;
            let request = wire::GroupCoordinatorRequest {
                group_id: String_(group.clone()),
            };
            let frame = self.encode_request(&request, V0, correlation_id)?;

            let timeout = self.sync_timeout;
            let bytes = self
                .first_broker_response(&frame, timeout)
                .await
                .ok_or(WorkerError::NoBrokersAvailable)?;
            self.correlation_id += 1;

            let response: wire::GroupCoordinatorResponse =
                decode_response(bytes, V0, correlation_id)?;

            match response.error {
                Some(ApiError::ConsumerCoordinatorNotAvailable) if retries_left > 0 => {
                    retries_left -= 1;
                    warn!(
                        worker = %self.worker_name,
                        group = %group,
                        retries_left,
                        "Coordinator not yet available, retrying"
                    );
                    tokio::time::sleep(config::COORDINATOR_RETRY_DELAY).await;
                }
                Some(error) => {
                    warn!(
                        worker = %self.worker_name,
                        group = %group,
                        error = %error,
                        "Fetching consumer group metadata failed"
                    );
                    return Err(WorkerError::Server(error));
                }
                None => {
                    let metadata = ConsumerMetadata::from(response);
                    debug!(
                        worker = %self.worker_name,
                        group = %group,
                        coordinator = metadata.coordinator_node_id,
                        "Discovered group coordinator"
                    );
                    self.consumer_metadata = Some(metadata.clone());
                    return Ok(metadata);
                }
            }
        }
    }

    /// Resolve the coordinator to a broker in the connection list,
    /// discovering it first when nothing is cached.
    async fn coordinator_broker(&mut self) -> Result<usize> {
        if self.consumer_metadata.is_none() {
            self.update_consumer_metadata().await?;
        }
        if let Some(index) = self.coordinator_index() {
            return Ok(index);
        }

        // The discovered coordinator is not in the connection list, which
        // means the cluster view is stale; refresh it once and re-resolve.
        self.update_metadata().await?;
        self.coordinator_index()
            .ok_or(WorkerError::Server(ApiError::ConsumerCoordinatorNotAvailable))
    }

    fn coordinator_index(&self) -> Option<usize> {
        let metadata = self.consumer_metadata.as_ref()?;
        self.brokers.iter().position(|b| {
            b.addr_matches(&metadata.coordinator_host, metadata.coordinator_port)
                && b.is_connected()
        })
    }

    /// One round trip through the coordinator broker.
    async fn coordinator_request<R>(
        &mut self,
        request: &R,
        version: ApiVersion,
        network_timeout: Option<Duration>,
    ) -> Result<R::ResponseBody>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let broker_index = self.coordinator_broker().await?;
        let timeout = network_timeout.unwrap_or(self.sync_timeout);
        self.sync_request(broker_index, request, version, timeout)
            .await
    }

    /// Drop the cached coordinator when a response says this broker no
    /// longer is one; the next group op rediscovers.
    fn maybe_invalidate_coordinator(&mut self, error: Option<ApiError>) {
        if let Some(error) = error {
            if error.invalidates_coordinator() {
                warn!(
                    worker = %self.worker_name,
                    error = %error,
                    "Coordinator invalidated by response"
                );
                self.consumer_metadata = None;
            }
        }
    }

    pub(super) async fn handle_join_group(
        &mut self,
        request: ops::JoinGroupRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::JoinGroupResponse> {
        let metadata = wire::GroupProtocolMetadata::new(request.topics)
            .to_bytes()
            .map_err(wire::WriteVersionedError::from)?;
        let wire_request = wire::JoinGroupRequest {
            group_id: String_(request.group_name),
            session_timeout_ms: Int32(request.session_timeout_ms),
            rebalance_timeout_ms: None,
            member_id: String_(request.member_id),
            protocol_type: String_(wire::CONSUMER_PROTOCOL_TYPE.to_string()),
            protocols: vec![wire::JoinGroupRequestProtocol {
                name: String_("assign".to_string()),
                metadata: NullableBytes(Some(metadata)),
            }],
        };

        let response = self
            .coordinator_request(&wire_request, V0, network_timeout)
            .await?;
        self.maybe_invalidate_coordinator(response.error);
        Ok(response)
    }

    pub(super) async fn handle_sync_group(
        &mut self,
        request: ops::SyncGroupRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::SyncGroupResponse> {
        let mut assignments = Vec::with_capacity(request.assignments.len());
        for entry in request.assignments {
            let bytes = entry
                .assignment
                .to_bytes()
                .map_err(wire::WriteVersionedError::from)?;
            assignments.push(wire::SyncGroupRequestAssignment {
                member_id: String_(entry.member_id),
                assignment: NullableBytes(Some(bytes)),
            });
        }
        let wire_request = wire::SyncGroupRequest {
            group_id: String_(request.group_name),
            generation_id: Int32(request.generation_id),
            member_id: String_(request.member_id),
            assignments,
        };

        let response = self
            .coordinator_request(&wire_request, V0, network_timeout)
            .await?;
        self.maybe_invalidate_coordinator(response.error);
        Ok(response)
    }

    pub(super) async fn handle_heartbeat(
        &mut self,
        request: ops::HeartbeatRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::HeartbeatResponse> {
        let wire_request = wire::HeartbeatRequest {
            group_id: String_(request.group_name),
            generation_id: Int32(request.generation_id),
            member_id: String_(request.member_id),
        };

        let response = self
            .coordinator_request(&wire_request, V0, network_timeout)
            .await?;
        self.maybe_invalidate_coordinator(response.error);
        Ok(response)
    }

    pub(super) async fn handle_leave_group(
        &mut self,
        request: ops::LeaveGroupRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::LeaveGroupResponse> {
        let wire_request = wire::LeaveGroupRequest {
            group_id: String_(request.group_name),
            member_id: String_(request.member_id),
        };

        let response = self
            .coordinator_request(&wire_request, V0, network_timeout)
            .await?;
        self.maybe_invalidate_coordinator(response.error);
        Ok(response)
    }

    pub(super) async fn handle_offset_commit(
        &mut self,
        request: ops::OffsetCommitRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::OffsetCommitResponse> {
        let group = request
            .consumer_group
            .clone()
            .or_else(|| self.consumer_group.clone())
            .ok_or(WorkerError::NoConsumerGroup)?;

        let v1 = request.api_version >= 1;
        let version = ApiVersion(Int16(request.api_version));
        let wire_request = wire::OffsetCommitRequest {
            group_id: String_(group),
            generation_id: v1.then_some(Int32(-1)),
            member_id: v1.then(|| String_(String::new())),
            topics: vec![wire::OffsetCommitRequestTopic {
                name: String_(request.topic.clone()),
                partitions: vec![wire::OffsetCommitRequestPartition {
                    partition_index: Int32(request.partition),
                    committed_offset: Int64(request.offset),
                    timestamp: v1.then_some(Int64(-1)),
                    committed_metadata: NullableString(request.metadata.clone()),
                }],
            }],
        };

        let response = self
            .coordinator_request(&wire_request, version, network_timeout)
            .await?;
        self.maybe_invalidate_coordinator(first_partition_error(
            response
                .topics
                .iter()
                .flat_map(|t| t.partitions.iter().map(|p| p.error)),
        ));
        Ok(response)
    }

    pub(super) async fn handle_offset_fetch(
        &mut self,
        request: ops::OffsetFetchRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::OffsetFetchResponse> {
        let group = request
            .consumer_group
            .clone()
            .or_else(|| self.consumer_group.clone())
            .ok_or(WorkerError::NoConsumerGroup)?;

        let version = ApiVersion(Int16(request.api_version));
        let wire_request = wire::OffsetFetchRequest {
            group_id: String_(group),
            topics: vec![wire::OffsetFetchRequestTopic {
                name: String_(request.topic.clone()),
                partition_indexes: crate::protocol::primitives::Array(Some(vec![Int32(
                    request.partition,
                )])),
            }],
        };

        let response = self
            .coordinator_request(&wire_request, version, network_timeout)
            .await?;
        self.maybe_invalidate_coordinator(first_partition_error(
            response
                .topics
                .iter()
                .flat_map(|t| t.partitions.iter().map(|p| p.error)),
        ));
        Ok(response)
    }
}

/// First coordinator-invalidating error among per-partition error codes.
fn first_partition_error(errors: impl Iterator<Item = Option<ApiError>>) -> Option<ApiError> {
    errors
        .flatten()
        .find(ApiError::invalidates_coordinator)
}
