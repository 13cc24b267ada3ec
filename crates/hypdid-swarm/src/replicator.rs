//! Per-connection replication.
//!
//! One replicator runs per peer connection and keeps the whole local log
//! store converged with the peer: advertise heads, request missing record
//! ranges, serve the peer's requests, ingest what arrives. The exchange is
//! live — whenever a local log grows, its head is re-advertised on the
//! still-open connection — and ends only when the connection closes. The
//! protocol is symmetric; both ends run the same loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use hypdid_core::PublicKey;
use hypdid_store::LogStore;

use crate::error::{ReplicationError, Result};
use crate::messages::{LogHead, ReplicationMessage, MAX_RECORDS_PER_MESSAGE, PROTOCOL_VERSION};
use crate::transport::Connection;

/// How often local heads are checked for re-advertisement.
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one replication exchange.
#[derive(Debug, Default, Clone)]
pub struct ReplicationReport {
    /// Records sent to the peer.
    pub sent: usize,
    /// Records newly ingested from the peer.
    pub received: usize,
    /// Records the peer sent that we already had.
    pub duplicates: usize,
}

/// Replicates the entire local store over one connection.
pub struct Replicator<S: LogStore> {
    store: Arc<S>,
    local_key: PublicKey,
}

impl<S: LogStore> Replicator<S> {
    pub fn new(store: Arc<S>, local_key: PublicKey) -> Self {
        Self { store, local_key }
    }

    /// Run the exchange until the connection closes.
    ///
    /// Heads are re-advertised whenever a local log has grown, so records
    /// appended after the initial convergence still reach the peer.
    pub async fn run(&self, conn: Arc<dyn Connection>) -> Result<ReplicationReport> {
        let mut report = ReplicationReport::default();

        self.send(
            &conn,
            ReplicationMessage::Hello {
                public_key: self.local_key,
                protocol_version: PROTOCOL_VERSION,
            },
        )
        .await?;

        // key -> length last advertised to the peer
        let mut advertised: HashMap<PublicKey, u64> = HashMap::new();
        // key -> length already requested from the peer
        let mut requested: HashMap<PublicKey, u64> = HashMap::new();

        let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let step = tokio::select! {
                frame = conn.recv() => match frame {
                    Some(frame) => {
                        self.handle(&conn, &frame, &mut requested, &mut report)
                            .await
                    }
                    None => break,
                },
                _ = refresh.tick() => self.advertise(&conn, &mut advertised).await,
            };
            match step {
                Ok(()) => {}
                // Teardown closes connections out from under us; an exchange
                // that loses its socket just ends.
                Err(ReplicationError::ConnectionClosed) => break,
                Err(e) => return Err(e),
            }
        }

        debug!(
            peer = %conn.remote_public_key(),
            sent = report.sent,
            received = report.received,
            duplicates = report.duplicates,
            "replication exchange ended"
        );
        Ok(report)
    }

    async fn handle(
        &self,
        conn: &Arc<dyn Connection>,
        frame: &[u8],
        requested: &mut HashMap<PublicKey, u64>,
        report: &mut ReplicationReport,
    ) -> Result<()> {
        match ReplicationMessage::decode(frame)? {
            ReplicationMessage::Hello {
                public_key,
                protocol_version,
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(ReplicationError::VersionMismatch {
                        local: PROTOCOL_VERSION,
                        peer: protocol_version,
                    });
                }
                debug!(peer = %public_key, "replication hello");
            }

            ReplicationMessage::Heads { heads } => {
                for head in heads {
                    let local = self.store.open(&head.key).await?.length().await?;
                    // Skip ranges already requested and still in flight.
                    let have = local.max(requested.get(&head.key).copied().unwrap_or(0));
                    if head.length > have {
                        requested.insert(head.key, head.length);
                        self.send(
                            conn,
                            ReplicationMessage::Need {
                                key: head.key,
                                start: have,
                                end: head.length,
                            },
                        )
                        .await?;
                    }
                }
            }

            ReplicationMessage::Need { key, start, end } => {
                self.serve(conn, &key, start, end, report).await?;
            }

            ReplicationMessage::Records {
                key,
                start,
                records,
            } => {
                for (offset, raw) in records.into_iter().enumerate() {
                    let index = start + offset as u64;
                    if self.store.ingest(&key, index, Bytes::from(raw)).await? {
                        report.received += 1;
                    } else {
                        report.duplicates += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Advertise local heads if any log grew since the last advertisement.
    async fn advertise(
        &self,
        conn: &Arc<dyn Connection>,
        advertised: &mut HashMap<PublicKey, u64>,
    ) -> Result<()> {
        let infos = self.store.list().await?;
        let changed = infos
            .iter()
            .any(|info| advertised.get(&info.key).copied().unwrap_or(0) != info.length);
        if !changed {
            return Ok(());
        }

        let mut heads = Vec::with_capacity(infos.len());
        advertised.clear();
        for info in infos {
            advertised.insert(info.key, info.length);
            heads.push(LogHead {
                key: info.key,
                length: info.length,
            });
        }
        self.send(conn, ReplicationMessage::Heads { heads }).await
    }

    /// Stream the record range `[start, end)` of one log to the peer.
    async fn serve(
        &self,
        conn: &Arc<dyn Connection>,
        key: &PublicKey,
        start: u64,
        end: u64,
        report: &mut ReplicationReport,
    ) -> Result<()> {
        let log = self.store.open(key).await?;
        let mut index = start;
        while index < end {
            let chunk_end = end.min(index + MAX_RECORDS_PER_MESSAGE as u64);
            let mut records = Vec::with_capacity((chunk_end - index) as usize);
            for i in index..chunk_end {
                records.push(log.get(i).await?.to_vec());
            }
            report.sent += records.len();
            self.send(
                conn,
                ReplicationMessage::Records {
                    key: *key,
                    start: index,
                    records,
                },
            )
            .await?;
            index = chunk_end;
        }
        Ok(())
    }

    async fn send(&self, conn: &Arc<dyn Connection>, message: ReplicationMessage) -> Result<()> {
        conn.send(message.encode()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{MemoryNet, MemorySwarm};
    use crate::transport::{discovery_topic, Swarm, Topic};
    use hypdid_core::Keypair;
    use hypdid_store::MemoryLogStore;
    use tokio::task::JoinHandle;

    async fn seeded_store(keypair: &Keypair, records: &[&str]) -> Arc<MemoryLogStore> {
        let store = Arc::new(MemoryLogStore::new());
        let log = store.open_writable(keypair).await.unwrap();
        log.append(records.iter().map(|r| Bytes::from(r.to_string())).collect())
            .await
            .unwrap();
        store
    }

    async fn wait_for_length(store: &MemoryLogStore, key: &PublicKey, want: u64) {
        for _ in 0..200 {
            let log = store.open(key).await.unwrap();
            if log.length().await.unwrap() >= want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("store never reached length {want}");
    }

    fn spawn_exchange(
        store: &Arc<MemoryLogStore>,
        swarm: &MemorySwarm,
        conn: &Arc<dyn Connection>,
    ) -> JoinHandle<Result<ReplicationReport>> {
        let replicator = Replicator::new(Arc::clone(store), swarm.local_public_key());
        let conn = Arc::clone(conn);
        tokio::spawn(async move { replicator.run(conn).await })
    }

    #[tokio::test]
    async fn test_two_stores_converge() {
        let writer = Keypair::from_seed(&[9; 32]);
        let store_a = seeded_store(&writer, &["r0", "r1", "r2"]).await;
        let store_b = Arc::new(MemoryLogStore::new());

        let net = MemoryNet::new();
        let swarm_a = net.create_swarm(&Keypair::from_seed(&[1; 32]));
        let swarm_b = net.create_swarm(&Keypair::from_seed(&[2; 32]));
        swarm_a.join(discovery_topic()).await.unwrap();
        swarm_b.join(discovery_topic()).await.unwrap();

        let conn_a = swarm_a.accept().await.unwrap();
        let conn_b = swarm_b.accept().await.unwrap();

        let task_a = spawn_exchange(&store_a, &swarm_a, &conn_a);
        let task_b = spawn_exchange(&store_b, &swarm_b, &conn_b);

        wait_for_length(&store_b, &writer.public_key(), 3).await;
        conn_a.close().await;

        let report_a = task_a.await.unwrap().unwrap();
        let report_b = task_b.await.unwrap().unwrap();
        assert_eq!(report_a.sent, 3);
        assert_eq!(report_b.received, 3);

        let log = store_b.open(&writer.public_key()).await.unwrap();
        assert_eq!(log.get(2).await.unwrap(), Bytes::from("r2"));
    }

    #[tokio::test]
    async fn test_append_after_convergence_reaches_peer() {
        let writer = Keypair::from_seed(&[9; 32]);
        let store_a = seeded_store(&writer, &["r0"]).await;
        let store_b = Arc::new(MemoryLogStore::new());

        let net = MemoryNet::new();
        let swarm_a = net.create_swarm(&Keypair::from_seed(&[1; 32]));
        let swarm_b = net.create_swarm(&Keypair::from_seed(&[2; 32]));
        swarm_a.join(discovery_topic()).await.unwrap();
        swarm_b.join(discovery_topic()).await.unwrap();
        let conn_a = swarm_a.accept().await.unwrap();
        let conn_b = swarm_b.accept().await.unwrap();

        let task_a = spawn_exchange(&store_a, &swarm_a, &conn_a);
        let task_b = spawn_exchange(&store_b, &swarm_b, &conn_b);

        wait_for_length(&store_b, &writer.public_key(), 1).await;

        // Written after the initial convergence, on the same connection.
        let log = store_a.open_writable(&writer).await.unwrap();
        log.append(vec![Bytes::from("r1")]).await.unwrap();
        wait_for_length(&store_b, &writer.public_key(), 2).await;

        conn_a.close().await;
        let report_b = task_b.await.unwrap().unwrap();
        assert_eq!(report_b.received, 2);
        task_a.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reconnect_sends_nothing_new() {
        let writer = Keypair::from_seed(&[9; 32]);
        let store_a = seeded_store(&writer, &["r0", "r1"]).await;
        let store_b = Arc::new(MemoryLogStore::new());

        let net = MemoryNet::new();
        let swarm_a = net.create_swarm(&Keypair::from_seed(&[1; 32]));
        let swarm_b = net.create_swarm(&Keypair::from_seed(&[2; 32]));

        for round in 0..2 {
            swarm_a
                .join(Topic::derive(&format!("round-{round}")))
                .await
                .unwrap();
            swarm_b
                .join(Topic::derive(&format!("round-{round}")))
                .await
                .unwrap();
            let conn_a = swarm_a.accept().await.unwrap();
            let conn_b = swarm_b.accept().await.unwrap();

            let task_a = spawn_exchange(&store_a, &swarm_a, &conn_a);
            let task_b = spawn_exchange(&store_b, &swarm_b, &conn_b);

            wait_for_length(&store_b, &writer.public_key(), 2).await;
            // Let a few head refreshes pass before closing.
            tokio::time::sleep(Duration::from_millis(300)).await;
            conn_a.close().await;

            let report_b = task_b.await.unwrap().unwrap();
            task_a.await.unwrap().unwrap();
            if round == 0 {
                assert_eq!(report_b.received, 2);
            } else {
                assert_eq!(report_b.received, 0);
            }
            assert_eq!(report_b.duplicates, 0);
        }
    }

    #[tokio::test]
    async fn test_bidirectional_exchange() {
        let writer_a = Keypair::from_seed(&[7; 32]);
        let writer_b = Keypair::from_seed(&[8; 32]);
        let store_a = seeded_store(&writer_a, &["a0"]).await;
        let store_b = seeded_store(&writer_b, &["b0", "b1"]).await;

        let net = MemoryNet::new();
        let swarm_a = net.create_swarm(&Keypair::from_seed(&[1; 32]));
        let swarm_b = net.create_swarm(&Keypair::from_seed(&[2; 32]));
        swarm_a.join(discovery_topic()).await.unwrap();
        swarm_b.join(discovery_topic()).await.unwrap();
        let conn_a = swarm_a.accept().await.unwrap();
        let conn_b = swarm_b.accept().await.unwrap();

        let task_a = spawn_exchange(&store_a, &swarm_a, &conn_a);
        let task_b = spawn_exchange(&store_b, &swarm_b, &conn_b);

        wait_for_length(&store_a, &writer_b.public_key(), 2).await;
        wait_for_length(&store_b, &writer_a.public_key(), 1).await;
        conn_a.close().await;
        task_a.await.unwrap().unwrap();
        task_b.await.unwrap().unwrap();
    }
}
