//! The broker-worker: a single-task actor owning connections, metadata and
//! the correlation-id counter.
//!
//! All public operations go through the mailbox of one worker task, which
//! serializes them; callers hold a clonable [`WorkerHandle`]. Routing follows
//! the metadata snapshot: leader-addressed ops resolve `(topic, partition)`
//! against the cache, refreshing it once on a miss, while group-addressed ops
//! resolve the coordinator discovered for the configured consumer group.

use std::io::Cursor;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{self, WorkerConfig};
use crate::connection::{BrokerConnection, TlsConfig, BOOTSTRAP_NODE_ID};
use crate::error::{Result, WorkerError};
use crate::metadata::{ConsumerMetadata, MetadataSnapshot};
use crate::ops;
use crate::protocol::api_version::ApiVersion;
use crate::protocol::messages as wire;
use crate::protocol::messages::{
    ReadVersionedType, RequestBody, RequestHeader, ResponseHeader, WriteVersionedType,
};
use crate::protocol::primitives::{Int16, Int32, Int64, Int8, NullableBytes, NullableString, String_};
use crate::protocol::record::{Message, MessageSet};

mod group;
mod refresh;

const HEADER_VERSION: ApiVersion = ApiVersion(Int16(1));
const RESPONSE_HEADER_VERSION: ApiVersion = ApiVersion(Int16(0));
pub(crate) const V0: ApiVersion = ApiVersion(Int16(0));

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Produce(ops::ProduceRequest, Reply<Option<i64>>),
    Fetch(ops::FetchRequest, Reply<wire::FetchResponse>),
    Offsets(ops::OffsetsRequest, Reply<wire::ListOffsetsResponse>),
    OffsetCommit(
        ops::OffsetCommitRequest,
        Option<Duration>,
        Reply<wire::OffsetCommitResponse>,
    ),
    OffsetFetch(
        ops::OffsetFetchRequest,
        Option<Duration>,
        Reply<wire::OffsetFetchResponse>,
    ),
    Metadata(Option<String>, Reply<MetadataSnapshot>),
    ConsumerGroup(Reply<Option<String>>),
    ConsumerGroupMetadata(Reply<ConsumerMetadata>),
    JoinGroup(
        ops::JoinGroupRequest,
        Option<Duration>,
        Reply<wire::JoinGroupResponse>,
    ),
    SyncGroup(
        ops::SyncGroupRequest,
        Option<Duration>,
        Reply<wire::SyncGroupResponse>,
    ),
    Heartbeat(
        ops::HeartbeatRequest,
        Option<Duration>,
        Reply<wire::HeartbeatResponse>,
    ),
    LeaveGroup(
        ops::LeaveGroupRequest,
        Option<Duration>,
        Reply<wire::LeaveGroupResponse>,
    ),
    Shutdown(Reply<()>),
}

/// Caller-side handle to one worker.
///
/// Cheap to clone; the worker terminates once every handle is dropped (or
/// [`shutdown`](Self::shutdown) is called).
#[derive(Clone, Debug)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Command>,
    sync_timeout: Duration,
}

impl WorkerHandle {
    /// Produce to one partition.
    ///
    /// Returns `Ok(None)` for `required_acks == 0` (fire-and-forget, no
    /// response read) and `Ok(Some(offset))` once the broker acknowledged.
    pub async fn produce(&self, request: ops::ProduceRequest) -> Result<Option<i64>> {
        self.call(|reply| Command::Produce(request, reply), None)
            .await
    }

    /// Fetch messages from one partition.
    pub async fn fetch(&self, request: ops::FetchRequest) -> Result<wire::FetchResponse> {
        self.call(|reply| Command::Fetch(request, reply), None).await
    }

    /// Query offsets for one partition.
    pub async fn offsets(&self, request: ops::OffsetsRequest) -> Result<wire::ListOffsetsResponse> {
        self.call(|reply| Command::Offsets(request, reply), None)
            .await
    }

    /// Commit a consumed offset through the group coordinator.
    pub async fn offset_commit(
        &self,
        request: ops::OffsetCommitRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::OffsetCommitResponse> {
        self.call(
            |reply| Command::OffsetCommit(request, network_timeout, reply),
            network_timeout,
        )
        .await
    }

    /// Fetch the last committed offset through the group coordinator.
    pub async fn offset_fetch(
        &self,
        request: ops::OffsetFetchRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::OffsetFetchResponse> {
        self.call(
            |reply| Command::OffsetFetch(request, network_timeout, reply),
            network_timeout,
        )
        .await
    }

    /// Refresh and return cluster metadata, optionally for a single topic.
    pub async fn metadata(&self, topic: Option<String>) -> Result<MetadataSnapshot> {
        self.call(|reply| Command::Metadata(topic, reply), None).await
    }

    /// The consumer group this worker was configured with.
    pub async fn consumer_group(&self) -> Result<Option<String>> {
        self.call(Command::ConsumerGroup, None).await
    }

    /// Discover (or re-discover) the group coordinator.
    pub async fn consumer_group_metadata(&self) -> Result<ConsumerMetadata> {
        self.call(Command::ConsumerGroupMetadata, None).await
    }

    /// Join the configured consumer group.
    pub async fn join_group(
        &self,
        request: ops::JoinGroupRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::JoinGroupResponse> {
        self.call(
            |reply| Command::JoinGroup(request, network_timeout, reply),
            network_timeout,
        )
        .await
    }

    /// Distribute or receive group assignments.
    pub async fn sync_group(
        &self,
        request: ops::SyncGroupRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::SyncGroupResponse> {
        self.call(
            |reply| Command::SyncGroup(request, network_timeout, reply),
            network_timeout,
        )
        .await
    }

    /// Keep group membership alive.
    pub async fn heartbeat(
        &self,
        request: ops::HeartbeatRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::HeartbeatResponse> {
        self.call(
            |reply| Command::Heartbeat(request, network_timeout, reply),
            network_timeout,
        )
        .await
    }

    /// Deregister from the group.
    pub async fn leave_group(
        &self,
        request: ops::LeaveGroupRequest,
        network_timeout: Option<Duration>,
    ) -> Result<wire::LeaveGroupResponse> {
        self.call(
            |reply| Command::LeaveGroup(request, network_timeout, reply),
            network_timeout,
        )
        .await
    }

    /// Stop the worker: close every broker socket and end the task.
    pub async fn shutdown(&self) -> Result<()> {
        self.call(Command::Shutdown, None).await
    }

    async fn call<T>(
        &self,
        make_command: impl FnOnce(Reply<T>) -> Command,
        network_timeout: Option<Duration>,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make_command(reply))
            .await
            .map_err(|_| WorkerError::WorkerShutdown)?;

        // The caller waits at least the default, stretched whenever the
        // socket timeout underneath is longer.
        let socket_timeout = network_timeout.unwrap_or(self.sync_timeout);
        let timeout = config::DEFAULT_CALLER_TIMEOUT.max(socket_timeout);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WorkerError::WorkerShutdown),
            Err(_) => Err(WorkerError::CallerTimeout { timeout }),
        }
    }
}

/// The worker itself: state plus the mailbox loop.
pub struct BrokerWorker {
    brokers: Vec<BrokerConnection>,
    metadata: MetadataSnapshot,
    consumer_metadata: Option<ConsumerMetadata>,
    correlation_id: i32,
    consumer_group: Option<String>,
    worker_name: String,
    sync_timeout: Duration,
    use_ssl: bool,
    ssl_options: TlsConfig,
    max_message_size: usize,
    event_sink: Option<tokio::task::JoinHandle<()>>,
}

impl BrokerWorker {
    /// Connect the bootstrap brokers, take the initial metadata snapshot and
    /// start the worker task.
    ///
    /// Fails with [`WorkerError::NoBrokersAvailable`] when no bootstrap
    /// broker answers the initial Metadata request.
    pub async fn spawn(config: WorkerConfig) -> Result<WorkerHandle> {
        let WorkerConfig {
            uris,
            use_ssl,
            ssl_options,
            metadata_update_interval,
            consumer_group,
            consumer_group_update_interval,
            worker_name,
            sync_timeout,
            max_message_size,
            event_sink,
        } = config;

        if let Some(group) = &consumer_group {
            if !config::valid_consumer_group(group) {
                return Err(WorkerError::InvalidConsumerGroup(group.clone()));
            }
        }

        let mut brokers = Vec::with_capacity(uris.len());
        for (host, port) in uris {
            match BrokerConnection::connect(
                BOOTSTRAP_NODE_ID,
                host.clone(),
                port,
                &ssl_options,
                use_ssl,
                max_message_size,
            )
            .await
            {
                Ok(broker) => brokers.push(broker),
                Err(e) => {
                    warn!(
                        worker = %worker_name,
                        host = %host,
                        port,
                        error = %e,
                        "Cannot connect to bootstrap broker"
                    );
                    brokers.push(BrokerConnection::disconnected(
                        BOOTSTRAP_NODE_ID,
                        host,
                        port,
                        max_message_size,
                    ));
                }
            }
        }

        let mut worker = Self {
            brokers,
            metadata: MetadataSnapshot::default(),
            consumer_metadata: None,
            correlation_id: 0,
            consumer_group,
            worker_name,
            sync_timeout,
            use_ssl,
            ssl_options,
            max_message_size,
            event_sink,
        };

        worker.update_metadata().await?;

        let (tx, rx) = mpsc::channel(64);
        let handle = WorkerHandle { tx, sync_timeout };
        tokio::spawn(worker.run(rx, metadata_update_interval, consumer_group_update_interval));
        Ok(handle)
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Command>,
        metadata_update_interval: Duration,
        consumer_group_update_interval: Duration,
    ) {
        let start = Instant::now();
        let mut metadata_tick = interval_at(start + metadata_update_interval, metadata_update_interval);
        metadata_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut consumer_tick = self.consumer_group.as_ref().map(|_| {
            let mut tick = interval_at(
                start + consumer_group_update_interval,
                consumer_group_update_interval,
            );
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tick
        });

        info!(worker = %self.worker_name, brokers = self.brokers.len(), "Worker started");

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                _ = metadata_tick.tick() => {
                    if let Err(e) = self.update_metadata().await {
                        warn!(worker = %self.worker_name, error = %e, "Periodic metadata refresh failed");
                    }
                }
                _ = maybe_tick(&mut consumer_tick) => {
                    if let Err(e) = self.update_consumer_metadata().await {
                        warn!(worker = %self.worker_name, error = %e, "Periodic coordinator refresh failed");
                    }
                }
            }
        }

        self.terminate();
    }

    fn terminate(mut self) {
        info!(worker = %self.worker_name, "Worker terminating");
        if let Some(sink) = self.event_sink.take() {
            sink.abort();
        }
        for broker in &mut self.brokers {
            broker.close();
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Produce(request, reply) => {
                let _ = reply.send(self.handle_produce(request).await);
            }
            Command::Fetch(request, reply) => {
                let _ = reply.send(self.handle_fetch(request).await);
            }
            Command::Offsets(request, reply) => {
                let _ = reply.send(self.handle_offsets(request).await);
            }
            Command::OffsetCommit(request, network_timeout, reply) => {
                let _ = reply.send(self.handle_offset_commit(request, network_timeout).await);
            }
            Command::OffsetFetch(request, network_timeout, reply) => {
                let _ = reply.send(self.handle_offset_fetch(request, network_timeout).await);
            }
            Command::Metadata(topic, reply) => {
                let _ = reply.send(self.handle_metadata(topic).await);
            }
            Command::ConsumerGroup(reply) => {
                let _ = reply.send(Ok(self.consumer_group.clone()));
            }
            Command::ConsumerGroupMetadata(reply) => {
                let _ = reply.send(self.update_consumer_metadata().await);
            }
            Command::JoinGroup(request, network_timeout, reply) => {
                let _ = reply.send(self.handle_join_group(request, network_timeout).await);
            }
            Command::SyncGroup(request, network_timeout, reply) => {
                let _ = reply.send(self.handle_sync_group(request, network_timeout).await);
            }
            Command::Heartbeat(request, network_timeout, reply) => {
                let _ = reply.send(self.handle_heartbeat(request, network_timeout).await);
            }
            Command::LeaveGroup(request, network_timeout, reply) => {
                let _ = reply.send(self.handle_leave_group(request, network_timeout).await);
            }
            Command::Shutdown(_) => {
                // handled in the select loop
            }
        }
    }

    /// Resolve the leader broker for `(topic, partition)`, refreshing the
    /// metadata once when the cache misses.
    async fn leader_for_or_refresh(&mut self, topic: &str, partition: i32) -> Result<Option<usize>> {
        if let Some(index) = self.leader_index(topic, partition) {
            return Ok(Some(index));
        }
        debug!(
            worker = %self.worker_name,
            topic,
            partition,
            "No leader cached, refreshing metadata"
        );
        self.update_metadata().await?;
        Ok(self.leader_index(topic, partition))
    }

    fn leader_index(&self, topic: &str, partition: i32) -> Option<usize> {
        let leader = self.metadata.broker_for(topic, partition)?.node_id;
        self.brokers.iter().position(|b| b.node_id() == leader)
    }

    async fn handle_produce(&mut self, request: ops::ProduceRequest) -> Result<Option<i64>> {
        let broker_index = match self
            .leader_for_or_refresh(&request.topic, request.partition)
            .await?
        {
            Some(index) => index,
            // The produce path reports a missing leader as exactly that, in
            // contrast to the offsets path's TopicNotFound.
            None => {
                return Err(WorkerError::LeaderNotAvailable {
                    topic: request.topic,
                    partition: request.partition,
                })
            }
        };

        let version = ApiVersion(Int16(request.api_version));
        let message_set = MessageSet(
            request
                .messages
                .iter()
                .map(|m| Message {
                    offset: Int64(0),
                    attributes: Int8(0),
                    timestamp: None,
                    key: NullableBytes(m.key.clone()),
                    value: NullableBytes(Some(m.value.clone())),
                })
                .collect(),
        );
        let wire_request = wire::ProduceRequest {
            acks: Int16(request.required_acks),
            timeout_ms: Int32(request.timeout_ms),
            topic_data: vec![wire::ProduceRequestTopicData {
                name: String_(request.topic.clone()),
                partition_data: vec![wire::ProduceRequestPartitionData {
                    index: Int32(request.partition),
                    message_set,
                }],
            }],
        };

        if request.required_acks == 0 {
            let correlation_id = self.correlation_id;
            let frame = self.encode_request(&wire_request, version, correlation_id)?;
            let result = self.brokers[broker_index].send_async(&frame).await;
            self.correlation_id += 1;
            result?;
            return Ok(None);
        }

        let timeout = self.sync_timeout;
        let response: wire::ProduceResponse = self
            .sync_request(broker_index, &wire_request, version, timeout)
            .await?;

        let outcome = response
            .topics
            .iter()
            .find(|t| t.name.0 == request.topic)
            .and_then(|t| {
                t.partitions
                    .iter()
                    .find(|p| p.index.0 == request.partition)
            })
            .map(|p| (p.error, p.base_offset.0));
        match outcome {
            Some((None, offset)) => Ok(Some(offset)),
            Some((Some(error), _)) => Err(WorkerError::ProduceRejected { error, response }),
            None => Err(WorkerError::InvalidResponse(format!(
                "produce response missing {}/{}",
                request.topic, request.partition
            ))),
        }
    }

    async fn handle_fetch(&mut self, request: ops::FetchRequest) -> Result<wire::FetchResponse> {
        let broker_index = match self
            .leader_for_or_refresh(&request.topic, request.partition)
            .await?
        {
            Some(index) => index,
            None => {
                return Err(WorkerError::TopicNotFound {
                    topic: request.topic,
                    partition: request.partition,
                })
            }
        };

        let version = ApiVersion(Int16(request.api_version));
        let wire_request = wire::FetchRequest {
            replica_id: wire::NORMAL_CONSUMER,
            max_wait_ms: Int32(request.wait_time_ms),
            min_bytes: Int32(request.min_bytes),
            topics: vec![wire::FetchRequestTopic {
                name: String_(request.topic.clone()),
                partitions: vec![wire::FetchRequestPartition {
                    partition_index: Int32(request.partition),
                    fetch_offset: Int64(request.offset),
                    partition_max_bytes: Int32(request.max_bytes),
                }],
            }],
        };

        let timeout = self.sync_timeout;
        self.sync_request(broker_index, &wire_request, version, timeout)
            .await
    }

    async fn handle_offsets(
        &mut self,
        request: ops::OffsetsRequest,
    ) -> Result<wire::ListOffsetsResponse> {
        let broker_index = match self
            .leader_for_or_refresh(&request.topic, request.partition)
            .await?
        {
            Some(index) => index,
            None => {
                return Err(WorkerError::TopicNotFound {
                    topic: request.topic,
                    partition: request.partition,
                })
            }
        };

        let version = ApiVersion(Int16(request.api_version));
        let wire_request = wire::ListOffsetsRequest {
            replica_id: wire::NORMAL_CONSUMER,
            topics: vec![wire::ListOffsetsRequestTopic {
                name: String_(request.topic.clone()),
                partitions: vec![wire::ListOffsetsRequestPartition {
                    partition_index: Int32(request.partition),
                    timestamp: Int64(request.time),
                    max_num_offsets: (request.api_version < 1).then(|| Int32(request.max_offsets)),
                }],
            }],
        };

        let timeout = self.sync_timeout;
        self.sync_request(broker_index, &wire_request, version, timeout)
            .await
    }

    async fn handle_metadata(&mut self, topic: Option<String>) -> Result<MetadataSnapshot> {
        let filter: Vec<String> = topic.into_iter().collect();
        let snapshot = self.retrieve_metadata(&filter).await?;
        self.metadata = snapshot.clone();
        Ok(snapshot)
    }

    /// Stamp the header and serialize one request body.
    fn encode_request<R>(
        &self,
        request: &R,
        version: ApiVersion,
        correlation_id: i32,
    ) -> Result<Vec<u8>>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
    {
        if !R::API_VERSION_RANGE.contains(version) {
            return Err(WorkerError::Encode(
                wire::WriteVersionedError::InvalidVersion { version },
            ));
        }

        let header = RequestHeader {
            request_api_key: R::API_KEY,
            request_api_version: version,
            correlation_id: Int32(correlation_id),
            client_id: NullableString(Some(config::CLIENT_ID.to_string())),
        };

        let mut buf = Vec::new();
        header.write_versioned(&mut buf, HEADER_VERSION)?;
        request.write_versioned(&mut buf, version)?;
        Ok(buf)
    }

    /// One synchronous round trip through the broker at `broker_index`.
    ///
    /// The correlation id advances by exactly one per send attempt, success
    /// or failure; only paths that never reach a socket leave it untouched.
    async fn sync_request<R>(
        &mut self,
        broker_index: usize,
        request: &R,
        version: ApiVersion,
        timeout: Duration,
    ) -> Result<R::ResponseBody>
    where
        R: RequestBody + WriteVersionedType<Vec<u8>>,
        R::ResponseBody: ReadVersionedType<Cursor<Vec<u8>>>,
    {
        let correlation_id = self.correlation_id;
        let frame = self.encode_request(request, version, correlation_id)?;
        let result = self.brokers[broker_index].send_sync(&frame, timeout).await;
        self.correlation_id += 1;
        let bytes = result?;
        decode_response(bytes, version, correlation_id)
    }

    /// Send one frame to the first connected broker, in list order, that
    /// yields a response.
    async fn first_broker_response(&mut self, frame: &[u8], timeout: Duration) -> Option<Vec<u8>> {
        for broker in self.brokers.iter_mut().filter(|b| b.is_connected()) {
            let node_id = broker.node_id();
            match broker.send_sync(frame, timeout).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => {
                    warn!(
                        worker = %self.worker_name,
                        broker = node_id,
                        error = %e,
                        "Broker did not answer, trying next"
                    );
                }
            }
        }
        None
    }
}

/// Strip the response header and decode the body.
fn decode_response<B>(bytes: Vec<u8>, version: ApiVersion, expected_correlation: i32) -> Result<B>
where
    B: ReadVersionedType<Cursor<Vec<u8>>>,
{
    let mut cursor = Cursor::new(bytes);
    let header = ResponseHeader::read_versioned(&mut cursor, RESPONSE_HEADER_VERSION)?;
    if header.correlation_id.0 != expected_correlation {
        // The socket is synchronous request/reply, so a mismatch means the
        // stream desynced somewhere upstream; surface the body anyway and
        // leave the judgement to the caller.
        warn!(
            expected = expected_correlation,
            got = header.correlation_id.0,
            "Correlation id mismatch in response"
        );
    }
    Ok(B::read_versioned(&mut cursor, version)?)
}

async fn maybe_tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
impl BrokerWorker {
    /// Bare worker for unit tests, no task spawned.
    pub(crate) fn for_tests(brokers: Vec<BrokerConnection>) -> Self {
        Self {
            brokers,
            metadata: MetadataSnapshot::default(),
            consumer_metadata: None,
            correlation_id: 0,
            consumer_group: None,
            worker_name: "test".to_string(),
            sync_timeout: config::DEFAULT_SYNC_TIMEOUT,
            use_ssl: false,
            ssl_options: None,
            max_message_size: config::DEFAULT_MAX_MESSAGE_SIZE,
            event_sink: None,
        }
    }
}
