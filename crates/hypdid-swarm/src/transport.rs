//! Transport abstraction for peer replication.
//!
//! The swarm collaborator handles discovery and encrypted sockets.
//! Implementations may sit on a DHT-based rendezvous network; the in-process
//! [`memory`] implementation backs the test suite.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use hypdid_core::PublicKey;

use crate::error::Result;

/// A 32-byte discovery topic.
///
/// Peers joining the same topic become discoverable to one another.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic(pub [u8; 32]);

impl Topic {
    /// Derive a topic from a label.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"hypdid-topic-v0:");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", &hex::encode(self.0)[..16])
    }
}

/// The fixed topic every hypdid registry node joins.
pub fn discovery_topic() -> Topic {
    Topic::derive("hypdid-discovery-v0")
}

/// One encrypted socket to a peer. Frame-oriented.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The peer's public key.
    fn remote_public_key(&self) -> PublicKey;

    /// Send one frame.
    async fn send(&self, frame: Bytes) -> Result<()>;

    /// Receive the next frame. `None` once the connection is closed and
    /// drained.
    async fn recv(&self) -> Option<Bytes>;

    /// Close the connection. Safe to call on an already-closed connection.
    async fn close(&self);

    /// Whether the connection has been closed by either end.
    fn is_closed(&self) -> bool;
}

/// Handle returned by [`Swarm::join`].
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Resolves once the topic join has been announced to the network.
    async fn flushed(&self) -> Result<()>;
}

/// The peer discovery and connection substrate.
///
/// Constructed by the caller with a deterministic seed so the local identity
/// is stable across restarts. Implementations must be thread-safe.
#[async_trait]
pub trait Swarm: Send + Sync {
    /// The local swarm identity.
    fn local_public_key(&self) -> PublicKey;

    /// Join a discovery topic.
    async fn join(&self, topic: Topic) -> Result<Box<dyn Discovery>>;

    /// Wait for the next inbound peer connection. `None` once the swarm is
    /// destroyed.
    async fn accept(&self) -> Option<Arc<dyn Connection>>;

    /// Await pending peer connection attempts.
    async fn flush(&self) -> Result<()>;

    /// Number of currently known peers.
    async fn peer_count(&self) -> usize;

    /// All connection objects, including any already closed.
    async fn connections(&self) -> Vec<Arc<dyn Connection>>;

    /// Tear down swarm state. Idempotent.
    async fn destroy(&self) -> Result<()>;
}

/// A simple in-process swarm for testing.
///
/// A shared [`memory::MemoryNet`] acts as the rendezvous point: swarms that
/// join the same topic are paired with channel-backed connections.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex, RwLock};
    use tokio::sync::{mpsc, Mutex};

    use hypdid_core::Keypair;

    type ConnectionList = Arc<RwLock<Vec<Arc<MemoryConnection>>>>;

    struct Registration {
        key: PublicKey,
        incoming: mpsc::UnboundedSender<Arc<dyn Connection>>,
        connections: ConnectionList,
    }

    /// Shared rendezvous state for a set of memory swarms.
    #[derive(Default)]
    pub struct MemoryNet {
        topics: RwLock<HashMap<Topic, Vec<Registration>>>,
    }

    impl MemoryNet {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a swarm attached to this network.
        pub fn create_swarm(self: &Arc<Self>, keypair: &Keypair) -> MemorySwarm {
            let (tx, rx) = mpsc::unbounded_channel();
            MemorySwarm {
                key: keypair.public_key(),
                net: Arc::clone(self),
                incoming_tx: StdMutex::new(Some(tx)),
                incoming_rx: Mutex::new(rx),
                connections: Arc::new(RwLock::new(Vec::new())),
                destroyed: AtomicBool::new(false),
                join_count: AtomicUsize::new(0),
            }
        }
    }

    /// In-process swarm implementation.
    pub struct MemorySwarm {
        key: PublicKey,
        net: Arc<MemoryNet>,
        incoming_tx: StdMutex<Option<mpsc::UnboundedSender<Arc<dyn Connection>>>>,
        incoming_rx: Mutex<mpsc::UnboundedReceiver<Arc<dyn Connection>>>,
        connections: ConnectionList,
        destroyed: AtomicBool,
        join_count: AtomicUsize,
    }

    impl MemorySwarm {
        /// How many times `join` has been called. Test observability.
        pub fn join_count(&self) -> usize {
            self.join_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Swarm for MemorySwarm {
        fn local_public_key(&self) -> PublicKey {
            self.key
        }

        async fn join(&self, topic: Topic) -> Result<Box<dyn Discovery>> {
            self.join_count.fetch_add(1, Ordering::SeqCst);

            let our_tx = {
                let guard = self.incoming_tx.lock().unwrap();
                guard.clone()
            };
            let Some(our_tx) = our_tx else {
                return Err(crate::error::ReplicationError::ReplicationFailure(
                    "swarm destroyed".into(),
                ));
            };

            let mut topics = self.net.topics.write().unwrap();
            let registrations = topics.entry(topic).or_default();

            // Pair up with every peer already on the topic. Both ends see a
            // connection event, as a real swarm would deliver.
            for peer in registrations.iter() {
                if peer.key == self.key {
                    continue;
                }
                let (ours, theirs) = MemoryConnection::pair(self.key, peer.key);
                let ours = Arc::new(ours);
                let theirs = Arc::new(theirs);
                peer.connections.write().unwrap().push(Arc::clone(&theirs));
                let _ = peer.incoming.send(theirs);
                let _ = our_tx.send(Arc::clone(&ours) as Arc<dyn Connection>);
                self.connections.write().unwrap().push(ours);
            }

            registrations.push(Registration {
                key: self.key,
                incoming: our_tx,
                connections: Arc::clone(&self.connections),
            });

            Ok(Box::new(MemoryDiscovery))
        }

        async fn accept(&self) -> Option<Arc<dyn Connection>> {
            self.incoming_rx.lock().await.recv().await
        }

        async fn flush(&self) -> Result<()> {
            // All pairing is synchronous in-process; nothing pending.
            Ok(())
        }

        async fn peer_count(&self) -> usize {
            let connections = self.connections.read().unwrap();
            let mut peers: Vec<PublicKey> = connections
                .iter()
                .filter(|c| !c.is_closed())
                .map(|c| c.remote_public_key())
                .collect();
            peers.sort_by_key(|k| k.0);
            peers.dedup();
            peers.len()
        }

        async fn connections(&self) -> Vec<Arc<dyn Connection>> {
            self.connections
                .read()
                .unwrap()
                .iter()
                .map(|c| Arc::clone(c) as Arc<dyn Connection>)
                .collect()
        }

        async fn destroy(&self) -> Result<()> {
            if self.destroyed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            // Deregister so no new pairings reach us; existing connection
            // objects are left to the session's dangling-connection sweep.
            let mut topics = self.net.topics.write().unwrap();
            for registrations in topics.values_mut() {
                registrations.retain(|r| r.key != self.key);
            }
            self.incoming_tx.lock().unwrap().take();
            Ok(())
        }
    }

    struct MemoryDiscovery;

    #[async_trait]
    impl Discovery for MemoryDiscovery {
        async fn flushed(&self) -> Result<()> {
            Ok(())
        }
    }

    /// One end of a channel-backed connection pair.
    pub struct MemoryConnection {
        remote: PublicKey,
        tx: mpsc::UnboundedSender<Bytes>,
        rx: Mutex<mpsc::UnboundedReceiver<Bytes>>,
        closed: Arc<AtomicBool>,
    }

    impl MemoryConnection {
        fn pair(a: PublicKey, b: PublicKey) -> (Self, Self) {
            let (tx_ab, rx_ab) = mpsc::unbounded_channel();
            let (tx_ba, rx_ba) = mpsc::unbounded_channel();
            let closed = Arc::new(AtomicBool::new(false));
            (
                Self {
                    remote: b,
                    tx: tx_ab,
                    rx: Mutex::new(rx_ba),
                    closed: Arc::clone(&closed),
                },
                Self {
                    remote: a,
                    tx: tx_ba,
                    rx: Mutex::new(rx_ab),
                    closed,
                },
            )
        }
    }

    #[async_trait]
    impl Connection for MemoryConnection {
        fn remote_public_key(&self) -> PublicKey {
            self.remote
        }

        async fn send(&self, frame: Bytes) -> Result<()> {
            if self.is_closed() {
                return Err(crate::error::ReplicationError::ConnectionClosed);
            }
            self.tx
                .send(frame)
                .map_err(|_| crate::error::ReplicationError::ConnectionClosed)
        }

        async fn recv(&self) -> Option<Bytes> {
            let mut rx = self.rx.lock().await;
            // Frames queued before the close must still be delivered; the
            // empty frame is the close sentinel, real frames are never empty.
            if let Ok(frame) = rx.try_recv() {
                if frame.is_empty() {
                    return None;
                }
                return Some(frame);
            }
            if self.is_closed() {
                return None;
            }
            let frame = rx.recv().await?;
            if frame.is_empty() {
                return None;
            }
            Some(frame)
        }

        async fn close(&self) {
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            // Wake the peer's pending recv.
            let _ = self.tx.send(Bytes::new());
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }
}
