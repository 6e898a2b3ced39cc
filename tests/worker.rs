//! End-to-end worker tests against an in-process mock broker.
//!
//! Each mock is a real TCP listener speaking the framed protocol: it decodes
//! request headers, records `(api_key, correlation_id)` per request, and
//! answers from a shared cluster view the test mutates along the way.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;

use kafka_worker::config::WorkerConfig;
use kafka_worker::ops;
use kafka_worker::protocol::api_key::ApiKey;
use kafka_worker::protocol::api_version::ApiVersion;
use kafka_worker::protocol::error::Error as ApiError;
use kafka_worker::protocol::frame::{AsyncMessageRead, AsyncMessageWrite};
use kafka_worker::protocol::messages::{
    FetchResponse, FetchResponsePartition, FetchResponseTopic, GroupCoordinatorResponse,
    HeartbeatResponse, JoinGroupResponse, JoinGroupResponseMember, LeaveGroupResponse,
    ListOffsetsResponse, ListOffsetsResponsePartition, ListOffsetsResponseTopic, MetadataResponse,
    MetadataResponseBroker, MetadataResponsePartition, MetadataResponseTopic, OffsetCommitResponse,
    OffsetCommitResponsePartition, OffsetCommitResponseTopic, OffsetFetchResponse,
    OffsetFetchResponsePartition, OffsetFetchResponseTopic, ProduceResponse,
    ProduceRequest as WireProduceRequest, ProduceResponsePartition, ProduceResponseTopic,
    RequestHeader, ResponseHeader, ReadVersionedType, SyncGroupResponse, WriteVersionedType,
};
use kafka_worker::protocol::primitives::{
    Array, Int16, Int32, Int64, Int8, NullableBytes, NullableString, String_,
};
use kafka_worker::protocol::record::{Message, MessageSet};
use kafka_worker::worker::BrokerWorker;
use kafka_worker::WorkerError;

const V0: ApiVersion = ApiVersion(Int16(0));
const HEADER_V1: ApiVersion = ApiVersion(Int16(1));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Recorded {
    api_key: ApiKey,
    correlation_id: i32,
}

/// What the mock cluster currently looks like.
#[derive(Debug, Clone, Default)]
struct ClusterView {
    /// `(node_id, host, port)`
    brokers: Vec<(i32, String, i32)>,
    /// `(topic, topic_error, [(partition, leader)])`
    topics: Vec<(String, i16, Vec<(i32, i32)>)>,
}

impl ClusterView {
    fn metadata_body(&self) -> Vec<u8> {
        let response = MetadataResponse {
            brokers: self
                .brokers
                .iter()
                .map(|(node_id, host, port)| MetadataResponseBroker {
                    node_id: Int32(*node_id),
                    host: String_(host.clone()),
                    port: Int32(*port),
                })
                .collect(),
            topics: self
                .topics
                .iter()
                .map(|(name, error, partitions)| MetadataResponseTopic {
                    error_code: Int16(*error),
                    name: String_(name.clone()),
                    partitions: partitions
                        .iter()
                        .map(|(partition, leader)| MetadataResponsePartition {
                            error_code: Int16(0),
                            partition_index: Int32(*partition),
                            leader_id: Int32(*leader),
                            replica_nodes: Array(Some(vec![Int32(*leader)])),
                            isr_nodes: Array(Some(vec![Int32(*leader)])),
                        })
                        .collect(),
                })
                .collect(),
        };
        encode_body(&response)
    }
}

fn encode_body<B>(body: &B) -> Vec<u8>
where
    B: WriteVersionedType<Vec<u8>>,
{
    let mut buf = vec![];
    body.write_versioned(&mut buf, V0).unwrap();
    buf
}

type Handler =
    Arc<dyn Fn(&RequestHeader, &mut Cursor<Vec<u8>>) -> Option<Vec<u8>> + Send + Sync>;

struct MockBroker {
    host: String,
    port: i32,
    requests: Arc<Mutex<Vec<Recorded>>>,
    active_connections: Arc<AtomicUsize>,
    accept_task: tokio::task::JoinHandle<()>,
}

impl MockBroker {
    async fn start(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let active_connections: Arc<AtomicUsize> = Arc::default();

        let requests_captured = Arc::clone(&requests);
        let active_captured = Arc::clone(&active_connections);
        let accept_task = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                let handler = Arc::clone(&handler);
                let requests = Arc::clone(&requests_captured);
                let active = Arc::clone(&active_captured);
                active.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    loop {
                        let frame = match stream.read_message(64 * 1024 * 1024).await {
                            Ok(frame) => frame,
                            Err(_) => break,
                        };
                        let mut cursor = Cursor::new(frame);
                        let header =
                            RequestHeader::read_versioned(&mut cursor, HEADER_V1).unwrap();
                        requests.lock().unwrap().push(Recorded {
                            api_key: header.request_api_key,
                            correlation_id: header.correlation_id.0,
                        });

                        if let Some(body) = handler(&header, &mut cursor) {
                            let mut out = vec![];
                            ResponseHeader {
                                correlation_id: header.correlation_id,
                            }
                            .write_versioned(&mut out, V0)
                            .unwrap();
                            out.extend(body);
                            if stream.write_message(&out).await.is_err() {
                                break;
                            }
                        }
                    }
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            host: addr.ip().to_string(),
            port: addr.port() as i32,
            requests,
            active_connections,
            accept_task,
        }
    }

    fn uri(&self) -> (String, i32) {
        (self.host.clone(), self.port)
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    async fn wait_for_connections(&self, n: usize) {
        for _ in 0..100 {
            if self.active_connections.load(Ordering::SeqCst) == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "mock broker has {} open connections, wanted {n}",
            self.active_connections.load(Ordering::SeqCst)
        );
    }

    async fn wait_for_disconnect(&self) {
        self.wait_for_connections(0).await;
    }
}

impl Drop for MockBroker {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

fn produce_body(topic: &str, partition: i32, error: Option<ApiError>, offset: i64) -> Vec<u8> {
    encode_body(&ProduceResponse {
        topics: vec![ProduceResponseTopic {
            name: String_(topic.to_string()),
            partitions: vec![ProduceResponsePartition {
                index: Int32(partition),
                error,
                base_offset: Int64(offset),
            }],
        }],
        throttle_time_ms: None,
    })
}

fn offsets_body(topic: &str, partition: i32, offset: i64) -> Vec<u8> {
    encode_body(&ListOffsetsResponse {
        topics: vec![ListOffsetsResponseTopic {
            name: String_(topic.to_string()),
            partitions: vec![ListOffsetsResponsePartition {
                partition_index: Int32(partition),
                error: None,
                old_style_offsets: Some(Array(Some(vec![Int64(offset)]))),
                timestamp: None,
                offset: None,
            }],
        }],
    })
}

fn fetch_body(topic: &str, partition: i32, values: &[&[u8]]) -> Vec<u8> {
    encode_body(&FetchResponse {
        throttle_time_ms: None,
        topics: vec![FetchResponseTopic {
            name: String_(topic.to_string()),
            partitions: vec![FetchResponsePartition {
                partition_index: Int32(partition),
                error: None,
                high_watermark: Int64(values.len() as i64),
                message_set: MessageSet(
                    values
                        .iter()
                        .enumerate()
                        .map(|(offset, value)| Message {
                            offset: Int64(offset as i64),
                            attributes: Int8(0),
                            timestamp: None,
                            key: NullableBytes(None),
                            value: NullableBytes(Some(value.to_vec())),
                        })
                        .collect(),
                ),
            }],
        }],
    })
}

/// Standard handler: answers Metadata from the shared view, Produce, Fetch
/// and Offsets with canned values. A produce with `acks == 0` gets no
/// response, like a real broker.
fn cluster_handler(view: Arc<Mutex<ClusterView>>) -> Handler {
    Arc::new(move |header, body| match header.request_api_key {
        ApiKey::Metadata => Some(view.lock().unwrap().metadata_body()),
        ApiKey::Produce => {
            let request =
                WireProduceRequest::read_versioned(body, header.request_api_version).unwrap();
            if request.acks == Int16(0) {
                None
            } else {
                Some(produce_body("food", 0, None, 42))
            }
        }
        ApiKey::Fetch => Some(fetch_body("food", 0, &[b"hey", b"there"])),
        ApiKey::ListOffsets => Some(offsets_body("food", 0, 17)),
        other => panic!("mock got unexpected request: {other:?}"),
    })
}

fn single_broker_view(broker: &MockBroker, topics: Vec<(String, i16, Vec<(i32, i32)>)>) -> ClusterView {
    ClusterView {
        brokers: vec![(1, broker.host.clone(), broker.port)],
        topics,
    }
}

fn food_topic() -> (String, i16, Vec<(i32, i32)>) {
    ("food".to_string(), 0, vec![(0, 1)])
}

#[tokio::test]
async fn test_leader_miss_triggers_refresh_then_produce() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let handler = cluster_handler(Arc::clone(&view));
    let broker = MockBroker::start(handler).await;

    // before spawn: cluster knows the broker but no topics
    *view.lock().unwrap() = single_broker_view(&broker, vec![]);

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    // now the topic appears; the worker's cache is still empty
    view.lock().unwrap().topics = vec![food_topic()];

    let request =
        ops::ProduceRequest::new("food", 0, vec![ops::ProduceMessage::new("hey")])
            .with_required_acks(1);
    let offset = worker.produce(request).await.unwrap();
    assert_eq!(offset, Some(42));

    // spawn metadata, on-demand metadata, produce: correlation ids 0, 1, 2
    let recorded = broker.recorded();
    assert_eq!(
        recorded
            .iter()
            .map(|r| (r.api_key, r.correlation_id))
            .collect::<Vec<_>>(),
        vec![
            (ApiKey::Metadata, 0),
            (ApiKey::Metadata, 1),
            (ApiKey::Produce, 2),
        ],
    );

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_produce_acks_zero_fire_and_forget() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let handler = cluster_handler(Arc::clone(&view));
    let broker = MockBroker::start(handler).await;
    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    // acks = 0: no response is written and the worker must not wait for one
    let request = ops::ProduceRequest::new("food", 0, vec![ops::ProduceMessage::new("hey")]);
    assert_eq!(request.required_acks, 0);
    let outcome = worker.produce(request).await.unwrap();
    assert_eq!(outcome, None);

    // the socket is still aligned: an acked produce right after works, and
    // its correlation id shows the fire-and-forget consumed exactly one
    let request =
        ops::ProduceRequest::new("food", 0, vec![ops::ProduceMessage::new("ho")])
            .with_required_acks(1);
    assert_eq!(worker.produce(request).await.unwrap(), Some(42));

    let recorded = broker.recorded();
    assert_eq!(
        recorded
            .iter()
            .map(|r| (r.api_key, r.correlation_id))
            .collect::<Vec<_>>(),
        vec![
            (ApiKey::Metadata, 0),
            (ApiKey::Produce, 1),
            (ApiKey::Produce, 2),
        ],
    );

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fetch_round_trip() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let broker = MockBroker::start(cluster_handler(Arc::clone(&view))).await;
    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    let response = worker
        .fetch(ops::FetchRequest::new("food", 0, 0))
        .await
        .unwrap();
    let partition = &response.topics[0].partitions[0];
    assert_eq!(partition.error, None);
    assert_eq!(partition.high_watermark, Int64(2));
    let values: Vec<&[u8]> = partition
        .message_set
        .0
        .iter()
        .filter_map(|m| m.value.0.as_deref())
        .collect();
    assert_eq!(values, vec![&b"hey"[..], &b"there"[..]]);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_leader_not_available_retry_bound() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let handler = cluster_handler(Arc::clone(&view));
    let broker = MockBroker::start(handler).await;

    // every metadata response reports error 5 on the topic
    *view.lock().unwrap() = single_broker_view(
        &broker,
        vec![("food".to_string(), ApiError::LeaderNotAvailable.code(), vec![(0, 1)])],
    );

    // spawn succeeds with the best snapshot once the retries are exhausted
    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    // exactly retry_count + 1 = 4 metadata requests, each consuming one id
    let recorded = broker.recorded();
    assert_eq!(
        recorded
            .iter()
            .map(|r| (r.api_key, r.correlation_id))
            .collect::<Vec<_>>(),
        vec![
            (ApiKey::Metadata, 0),
            (ApiKey::Metadata, 1),
            (ApiKey::Metadata, 2),
            (ApiKey::Metadata, 3),
        ],
    );

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stale_broker_pruned_on_refresh() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let broker_a = MockBroker::start(cluster_handler(Arc::clone(&view))).await;
    let broker_b = MockBroker::start(cluster_handler(Arc::clone(&view))).await;

    *view.lock().unwrap() = ClusterView {
        brokers: vec![
            (1, broker_a.host.clone(), broker_a.port),
            (2, broker_b.host.clone(), broker_b.port),
        ],
        topics: vec![food_topic()],
    };

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker_a.uri(), broker_b.uri()]))
        .await
        .unwrap();
    broker_b.wait_for_connections(1).await;

    // broker 2 leaves the cluster; the next refresh prunes it
    view.lock().unwrap().brokers = vec![(1, broker_a.host.clone(), broker_a.port)];

    // a lookup miss triggers the on-demand refresh
    let err = worker
        .offsets(ops::OffsetsRequest::latest("missing", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::TopicNotFound { .. }));

    broker_b.wait_for_disconnect().await;

    // the surviving broker still serves requests
    assert_eq!(
        worker
            .produce(
                ops::ProduceRequest::new("food", 0, vec![ops::ProduceMessage::new("hey")])
                    .with_required_acks(1)
            )
            .await
            .unwrap(),
        Some(42)
    );

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_empty_refresh_keeps_brokers() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let broker = MockBroker::start(cluster_handler(Arc::clone(&view))).await;
    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    // the cluster "vanishes": metadata reports no brokers at all
    *view.lock().unwrap() = ClusterView::default();

    let err = worker
        .offsets(ops::OffsetsRequest::latest("missing", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::TopicNotFound { .. }));

    // the clamp kept the previous broker list: the socket is still open
    assert_eq!(broker.active_connections.load(Ordering::SeqCst), 1);

    // and once the cluster looks sane again the same connection serves
    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);
    assert_eq!(
        worker
            .produce(
                ops::ProduceRequest::new("food", 0, vec![ops::ProduceMessage::new("hey")])
                    .with_required_acks(1)
            )
            .await
            .unwrap(),
        Some(42)
    );

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_correlation_ids_monotone_with_short_circuit() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let broker = MockBroker::start(cluster_handler(Arc::clone(&view))).await;
    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    // a short-circuiting TopicNotFound in the middle (consumes an id for the
    // on-demand metadata request, none for the reply itself)
    let err = worker
        .offsets(ops::OffsetsRequest::latest("missing", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::TopicNotFound { .. }));

    worker
        .produce(
            ops::ProduceRequest::new("food", 0, vec![ops::ProduceMessage::new("hey")])
                .with_required_acks(1),
        )
        .await
        .unwrap();
    worker
        .offsets(ops::OffsetsRequest::latest("food", 0))
        .await
        .unwrap();

    let correlations: Vec<i32> = broker.recorded().iter().map(|r| r.correlation_id).collect();
    assert_eq!(correlations, vec![0, 1, 2, 3]);

    worker.shutdown().await.unwrap();
}

/// Handler for a broker that also coordinates a consumer group.
fn group_handler(
    view: Arc<Mutex<ClusterView>>,
    coordinator: Arc<Mutex<(i32, String, i32)>>,
    heartbeat_errors: Arc<Mutex<Vec<Option<ApiError>>>>,
) -> Handler {
    Arc::new(move |header, _body| match header.request_api_key {
        ApiKey::Metadata => Some(view.lock().unwrap().metadata_body()),
        ApiKey::GroupCoordinator => {
            let (node_id, host, port) = coordinator.lock().unwrap().clone();
            Some(encode_body(&GroupCoordinatorResponse {
                error: None,
                coordinator_id: Int32(node_id),
                host: String_(host),
                port: Int32(port),
            }))
        }
        ApiKey::Heartbeat => {
            let error = heartbeat_errors.lock().unwrap().remove(0);
            Some(encode_body(&HeartbeatResponse { error }))
        }
        ApiKey::JoinGroup => Some(encode_body(&JoinGroupResponse {
            error: None,
            generation_id: Int32(1),
            protocol_name: String_("assign".to_string()),
            leader: String_("member-1".to_string()),
            member_id: String_("member-1".to_string()),
            members: vec![JoinGroupResponseMember {
                member_id: String_("member-1".to_string()),
                metadata: NullableBytes(None),
            }],
        })),
        ApiKey::SyncGroup => Some(encode_body(&SyncGroupResponse {
            error: None,
            assignment: NullableBytes(Some(b"assignment".to_vec())),
        })),
        ApiKey::LeaveGroup => Some(encode_body(&LeaveGroupResponse { error: None })),
        ApiKey::OffsetCommit => Some(encode_body(&OffsetCommitResponse {
            topics: vec![OffsetCommitResponseTopic {
                name: String_("food".to_string()),
                partitions: vec![OffsetCommitResponsePartition {
                    partition_index: Int32(0),
                    error: None,
                }],
            }],
        })),
        ApiKey::OffsetFetch => Some(encode_body(&OffsetFetchResponse {
            topics: vec![OffsetFetchResponseTopic {
                name: String_("food".to_string()),
                partitions: vec![OffsetFetchResponsePartition {
                    partition_index: Int32(0),
                    committed_offset: Int64(42),
                    metadata: NullableString(None),
                    error: None,
                }],
            }],
        })),
        other => panic!("mock got unexpected request: {other:?}"),
    })
}

#[tokio::test]
async fn test_group_ops_route_through_coordinator() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let coordinator = Arc::new(Mutex::new((0, String::new(), 0)));
    let heartbeat_errors = Arc::new(Mutex::new(vec![
        Some(ApiError::NotCoordinatorForConsumer),
        None,
    ]));
    let broker = MockBroker::start(group_handler(
        Arc::clone(&view),
        Arc::clone(&coordinator),
        Arc::clone(&heartbeat_errors),
    ))
    .await;

    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);
    *coordinator.lock().unwrap() = (1, broker.host.clone(), broker.port);

    let worker = BrokerWorker::spawn(
        WorkerConfig::new(vec![broker.uri()]).with_consumer_group("a-group"),
    )
    .await
    .unwrap();

    assert_eq!(
        worker.consumer_group().await.unwrap(),
        Some("a-group".to_string())
    );

    let metadata = worker.consumer_group_metadata().await.unwrap();
    assert_eq!(metadata.coordinator_node_id, 1);

    // first heartbeat: coordinator answers NotCoordinatorForConsumer, which
    // the worker surfaces and uses to invalidate its cached coordinator
    let response = worker
        .heartbeat(
            ops::HeartbeatRequest {
                group_name: "a-group".to_string(),
                generation_id: 1,
                member_id: "member-1".to_string(),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.error, Some(ApiError::NotCoordinatorForConsumer));

    // second heartbeat: rediscovery first, then the op
    let response = worker
        .heartbeat(
            ops::HeartbeatRequest {
                group_name: "a-group".to_string(),
                generation_id: 1,
                member_id: "member-1".to_string(),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.error, None);

    let keys: Vec<ApiKey> = broker.recorded().iter().map(|r| r.api_key).collect();
    assert_eq!(
        keys,
        vec![
            ApiKey::Metadata,
            ApiKey::GroupCoordinator,
            ApiKey::Heartbeat,
            ApiKey::GroupCoordinator,
            ApiKey::Heartbeat,
        ],
    );

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_group_membership_round_trip() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let coordinator = Arc::new(Mutex::new((0, String::new(), 0)));
    let heartbeat_errors = Arc::new(Mutex::new(vec![]));
    let broker = MockBroker::start(group_handler(
        Arc::clone(&view),
        Arc::clone(&coordinator),
        heartbeat_errors,
    ))
    .await;

    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);
    *coordinator.lock().unwrap() = (1, broker.host.clone(), broker.port);

    let worker = BrokerWorker::spawn(
        WorkerConfig::new(vec![broker.uri()]).with_consumer_group("a-group"),
    )
    .await
    .unwrap();

    let join = worker
        .join_group(
            ops::JoinGroupRequest {
                group_name: "a-group".to_string(),
                member_id: String::new(),
                topics: vec!["food".to_string()],
                session_timeout_ms: 10_000,
            },
            None,
        )
        .await
        .unwrap();
    assert!(join.is_leader());
    assert_eq!(join.generation_id, Int32(1));

    let sync = worker
        .sync_group(
            ops::SyncGroupRequest {
                group_name: "a-group".to_string(),
                generation_id: 1,
                member_id: join.member_id.0.clone(),
                assignments: vec![],
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(sync.assignment, NullableBytes(Some(b"assignment".to_vec())));

    let committed = worker
        .offset_commit(ops::OffsetCommitRequest::new("food", 0, 42), None)
        .await
        .unwrap();
    assert_eq!(committed.topics[0].partitions[0].error, None);

    let fetched = worker
        .offset_fetch(ops::OffsetFetchRequest::new("food", 0), None)
        .await
        .unwrap();
    assert_eq!(fetched.topics[0].partitions[0].committed_offset, Int64(42));

    let left = worker
        .leave_group(
            ops::LeaveGroupRequest {
                group_name: "a-group".to_string(),
                member_id: join.member_id.0,
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(left.error, None);

    worker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_sockets() {
    let view: Arc<Mutex<ClusterView>> = Arc::default();
    let broker = MockBroker::start(cluster_handler(Arc::clone(&view))).await;
    *view.lock().unwrap() = single_broker_view(&broker, vec![food_topic()]);

    let worker = BrokerWorker::spawn(WorkerConfig::new(vec![broker.uri()]))
        .await
        .unwrap();

    worker.shutdown().await.unwrap();
    broker.wait_for_disconnect().await;

    // the worker is gone for good
    let err = worker
        .offsets(ops::OffsetsRequest::latest("food", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::WorkerShutdown));
}

#[tokio::test]
async fn test_spawn_fails_without_brokers() {
    // a listener that accepts and immediately closes every connection
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => drop(stream),
                Err(_) => return,
            }
        }
    });

    let config = WorkerConfig::new(vec![(addr.ip().to_string(), addr.port() as i32)])
        .with_sync_timeout(Duration::from_millis(200));
    let err = BrokerWorker::spawn(config).await.unwrap_err();
    assert!(matches!(err, WorkerError::NoBrokersAvailable));
}
