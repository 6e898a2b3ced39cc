//! Metadata retrieval and broker-list reconciliation.
//!
//! The refresher runs on the worker's periodic tick and on demand whenever a
//! leader lookup misses. A refresh is two steps: fetch a snapshot from the
//! first broker willing to answer (retrying a bounded number of times while
//! the cluster reports `LeaderNotAvailable`), then reconcile the connection
//! list against the snapshot's broker list.

use tracing::{info, warn};

use crate::config;
use crate::connection::BrokerConnection;
use crate::error::{Result, WorkerError};
use crate::metadata::MetadataSnapshot;
use crate::protocol::messages as wire;
use crate::protocol::primitives::String_;

use super::{decode_response, BrokerWorker, V0};

impl BrokerWorker {
    /// Full refresh: fetch a snapshot of every topic, reconcile the broker
    /// list, replace the cache.
    pub(super) async fn update_metadata(&mut self) -> Result<()> {
        let snapshot = self.retrieve_metadata(&[]).await?;
        self.reconcile_brokers(&snapshot).await;
        self.metadata = snapshot;
        Ok(())
    }

    /// Fetch one metadata snapshot, retrying on `LeaderNotAvailable`.
    ///
    /// At most `retry_count + 1` requests go out, [`config::RETRY_DELAY`]
    /// apart; if the last one still reports an unavailable leader its
    /// snapshot is returned regardless. Each issued request consumes one
    /// correlation id. When no broker answers at all the refresh fails with
    /// [`WorkerError::NoBrokersAvailable`], never an empty snapshot.
    pub(super) async fn retrieve_metadata(
        &mut self,
        topic_filter: &[String],
    ) -> Result<MetadataSnapshot> {
        let mut retries_left = config::RETRY_COUNT;
        loop {
            let correlation_id = self.correlation_id;
            let request = wire::MetadataRequest {
                topics: topic_filter
                    .iter()
                    .map(|t| wire::MetadataRequestTopic {
                        name: String_(t.clone()),
                    })
                    .collect(),
            };
            let frame = self.encode_request(&request, V0, correlation_id)?;

            let timeout = self.sync_timeout;
            let bytes = self
                .first_broker_response(&frame, timeout)
                .await
                .ok_or(WorkerError::NoBrokersAvailable)?;
            self.correlation_id += 1;

            let response: wire::MetadataResponse = decode_response(bytes, V0, correlation_id)?;
            let snapshot = MetadataSnapshot::from(response);

            if snapshot.has_leader_not_available() {
                if retries_left > 0 {
                    retries_left -= 1;
                    warn!(
                        worker = %self.worker_name,
                        retries_left,
                        "Metadata reports leader_not_available, retrying"
                    );
                    tokio::time::sleep(config::RETRY_DELAY).await;
                    continue;
                }
                warn!(
                    worker = %self.worker_name,
                    "Metadata still reports leader_not_available, keeping this snapshot"
                );
            }

            return Ok(snapshot);
        }
    }

    /// Reconcile the connection list against a fresh snapshot.
    ///
    /// Keeps brokers the snapshot still names whose socket is live, plus
    /// every bootstrap broker unconditionally (a bootstrap entry is exempt
    /// from the liveness check until a Metadata response has identified it).
    /// Closed brokers are closed exactly once. If keeping that rule would
    /// empty the list entirely, the previous list survives untouched instead.
    pub(super) async fn reconcile_brokers(&mut self, snapshot: &MetadataSnapshot) {
        let existing = std::mem::take(&mut self.brokers);
        let (mut keep, mut remove): (Vec<BrokerConnection>, Vec<BrokerConnection>) =
            existing.into_iter().partition(|b| {
                b.is_bootstrap()
                    || (snapshot.brokers.iter().any(|nb| nb.node_id == b.node_id())
                        && b.is_connected())
            });

        if keep.is_empty() && !remove.is_empty() {
            warn!(
                worker = %self.worker_name,
                "Reconciliation would drop every broker, keeping the previous list"
            );
            keep = remove;
        } else {
            for broker in &mut remove {
                info!(
                    worker = %self.worker_name,
                    broker = broker.node_id(),
                    "Removing stale broker"
                );
                broker.close();
            }
        }

        // A bootstrap entry the new metadata names by address gets its real
        // node id stamped instead of a duplicate connection.
        for broker in keep.iter_mut().filter(|b| b.is_bootstrap()) {
            if let Some(named) = snapshot
                .brokers
                .iter()
                .find(|nb| broker.addr_matches(&nb.host, nb.port))
            {
                broker.identify(named.node_id);
            }
        }

        for named in &snapshot.brokers {
            if keep.iter().any(|b| b.node_id() == named.node_id) {
                continue;
            }
            match BrokerConnection::connect(
                named.node_id,
                named.host.clone(),
                named.port,
                &self.ssl_options,
                self.use_ssl,
                self.max_message_size,
            )
            .await
            {
                Ok(broker) => keep.push(broker),
                Err(e) => {
                    warn!(
                        worker = %self.worker_name,
                        broker = named.node_id,
                        error = %e,
                        "Cannot connect to new broker"
                    );
                    keep.push(BrokerConnection::disconnected(
                        named.node_id,
                        named.host.clone(),
                        named.port,
                        self.max_message_size,
                    ));
                }
            }
        }

        self.brokers = keep;
    }
}
