//! Replication session lifecycle.
//!
//! A [`ReplicationSession`] owns the swarm attachment for one log store:
//! joining the discovery topic, replicating with every peer that shows up,
//! and tearing the attachment down. Connecting is lazy and memoized, so
//! callers can race `connect` freely and the topic is only joined once.

use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use hypdid_core::encode_key;
use hypdid_store::LogStore;

use crate::error::{ReplicationError, Result};
use crate::replicator::Replicator;
use crate::transport::{Swarm, Topic};

/// Point-in-time snapshot of a session and its store.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    /// Distinct peers with a live connection.
    pub number_of_peers: usize,
    /// Whether at least one peer is connected.
    pub connected: bool,
    /// Logs held in the local store.
    pub number_of_logs: usize,
    /// Per-log key and length.
    pub logs: Vec<LogStatus>,
}

/// Status of one replicated log.
#[derive(Debug, Clone, Serialize)]
pub struct LogStatus {
    /// Base64url-encoded log key.
    pub key: String,
    /// Number of records in the log.
    pub length: u64,
}

/// Manages replication of a log store over a swarm.
pub struct ReplicationSession<S: LogStore + 'static, T: Swarm + 'static> {
    store: Arc<S>,
    swarm: Arc<T>,
    topic: Topic,
    ready: OnceCell<Result<()>>,
    accept_task: StdMutex<Option<JoinHandle<()>>>,
}

impl<S: LogStore + 'static, T: Swarm + 'static> ReplicationSession<S, T> {
    pub fn new(store: Arc<S>, swarm: Arc<T>, topic: Topic) -> Self {
        Self {
            store,
            swarm,
            topic,
            ready: OnceCell::new(),
            accept_task: StdMutex::new(None),
        }
    }

    /// Join the discovery topic and start replicating with peers.
    ///
    /// The first call performs the join; every later call (including
    /// concurrent ones) awaits and returns that first outcome.
    pub async fn connect(&self) -> Result<()> {
        self.ready
            .get_or_init(|| self.establish())
            .await
            .clone()
    }

    /// Alias for [`connect`](Self::connect); reads as intent at call sites
    /// that only care about the session being usable.
    pub async fn ready(&self) -> Result<()> {
        self.connect().await
    }

    async fn establish(&self) -> Result<()> {
        let store = Arc::clone(&self.store);
        let swarm = Arc::clone(&self.swarm);
        let local_key = self.swarm.local_public_key();
        let accept_task = tokio::spawn(async move {
            while let Some(conn) = swarm.accept().await {
                let replicator = Replicator::new(Arc::clone(&store), local_key);
                tokio::spawn(async move {
                    let peer = conn.remote_public_key();
                    match replicator.run(conn).await {
                        Ok(report) => debug!(
                            %peer,
                            received = report.received,
                            sent = report.sent,
                            "peer exchange finished"
                        ),
                        Err(e) => warn!(%peer, error = %e, "peer exchange failed"),
                    }
                });
            }
        });
        *self.accept_task.lock().unwrap() = Some(accept_task);

        let discovery = self.swarm.join(self.topic).await?;
        discovery.flushed().await?;
        // The announce can settle before any peer dials back; give pending
        // connection attempts a chance to land.
        if self.swarm.peer_count().await == 0 {
            self.swarm.flush().await?;
        }
        debug!(topic = ?self.topic, "replication session connected");
        Ok(())
    }

    /// Tear down the swarm attachment.
    ///
    /// A session that never connected has nothing to tear down. Errors from
    /// the underlying swarm are surfaced; closing already-closed connections
    /// is a no-op.
    pub async fn destroy(&self) -> Result<()> {
        if self.ready.get().is_none() {
            return Ok(());
        }
        self.swarm.flush().await?;
        self.swarm.destroy().await?;
        // The swarm may leave connection objects dangling after destroy.
        for conn in self.swarm.connections().await {
            if !conn.is_closed() {
                conn.close().await;
            }
        }
        if let Some(task) = self.accept_task.lock().unwrap().take() {
            task.abort();
        }
        debug!("replication session destroyed");
        Ok(())
    }

    /// Snapshot current peer and store state.
    pub async fn status(&self) -> Result<Status> {
        let number_of_peers = self.swarm.peer_count().await;
        let logs: Vec<LogStatus> = self
            .store
            .list()
            .await
            .map_err(ReplicationError::from)?
            .into_iter()
            .map(|info| LogStatus {
                key: encode_key(&info.key),
                length: info.length,
            })
            .collect();
        Ok(Status {
            number_of_peers,
            connected: number_of_peers > 0,
            number_of_logs: logs.len(),
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryNet;
    use crate::transport::discovery_topic;
    use bytes::Bytes;
    use hypdid_core::Keypair;
    use hypdid_store::MemoryLogStore;
    use std::time::Duration;

    async fn wait_for_length(
        store: &MemoryLogStore,
        key: &hypdid_core::PublicKey,
        want: u64,
    ) {
        for _ in 0..100 {
            let log = store.open(key).await.unwrap();
            if log.length().await.unwrap() >= want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("store never reached length {want}");
    }

    #[tokio::test]
    async fn test_sessions_replicate_on_connect() {
        let writer = Keypair::from_seed(&[5; 32]);
        let store_a = Arc::new(MemoryLogStore::new());
        let log = store_a.open_writable(&writer).await.unwrap();
        log.append(vec![Bytes::from("r0"), Bytes::from("r1")])
            .await
            .unwrap();
        let store_b = Arc::new(MemoryLogStore::new());

        let net = MemoryNet::new();
        let swarm_a = Arc::new(net.create_swarm(&Keypair::from_seed(&[1; 32])));
        let swarm_b = Arc::new(net.create_swarm(&Keypair::from_seed(&[2; 32])));

        let session_a =
            ReplicationSession::new(Arc::clone(&store_a), Arc::clone(&swarm_a), discovery_topic());
        let session_b =
            ReplicationSession::new(Arc::clone(&store_b), Arc::clone(&swarm_b), discovery_topic());

        session_a.connect().await.unwrap();
        session_b.connect().await.unwrap();

        wait_for_length(&store_b, &writer.public_key(), 2).await;

        session_a.destroy().await.unwrap();
        session_b.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_is_memoized() {
        let net = MemoryNet::new();
        let swarm = Arc::new(net.create_swarm(&Keypair::from_seed(&[1; 32])));
        let store = Arc::new(MemoryLogStore::new());
        let session =
            ReplicationSession::new(Arc::clone(&store), Arc::clone(&swarm), discovery_topic());

        let (a, b, c) = tokio::join!(session.connect(), session.connect(), session.ready());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(swarm.join_count(), 1);
    }

    #[tokio::test]
    async fn test_destroy_without_connect_is_noop() {
        let net = MemoryNet::new();
        let swarm = Arc::new(net.create_swarm(&Keypair::from_seed(&[1; 32])));
        let store = Arc::new(MemoryLogStore::new());
        let session = ReplicationSession::new(store, Arc::clone(&swarm), discovery_topic());

        session.destroy().await.unwrap();
        // No join, no destroy reached the swarm.
        assert_eq!(swarm.join_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let net = MemoryNet::new();
        let swarm = Arc::new(net.create_swarm(&Keypair::from_seed(&[1; 32])));
        let store = Arc::new(MemoryLogStore::new());
        let session = ReplicationSession::new(store, swarm, discovery_topic());

        session.connect().await.unwrap();
        session.destroy().await.unwrap();
        session.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn test_status_reflects_store() {
        let writer = Keypair::from_seed(&[5; 32]);
        let store = Arc::new(MemoryLogStore::new());
        let log = store.open_writable(&writer).await.unwrap();
        log.append(vec![Bytes::from("r0")]).await.unwrap();

        let net = MemoryNet::new();
        let swarm = Arc::new(net.create_swarm(&Keypair::from_seed(&[1; 32])));
        let session = ReplicationSession::new(Arc::clone(&store), swarm, discovery_topic());

        let status = session.status().await.unwrap();
        assert_eq!(status.number_of_peers, 0);
        assert!(!status.connected);
        assert_eq!(status.number_of_logs, 1);
        assert_eq!(status.logs[0].length, 1);
        assert_eq!(status.logs[0].key, encode_key(&writer.public_key()));
    }
}
