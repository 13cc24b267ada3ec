//! Peer replication for the hypdid registry.
//!
//! A [`ReplicationSession`] binds a local log store to a peer swarm: it
//! joins a fixed discovery topic, wires every inbound peer connection into
//! bidirectional whole-store replication, and exposes idempotent
//! connect/ready/destroy lifecycle operations plus a status snapshot.
//!
//! The swarm itself (discovery, encrypted sockets) is a collaborator behind
//! the [`Swarm`] trait; an in-process [`memory`](transport::memory)
//! implementation backs the test suite.

pub mod error;
pub mod messages;
pub mod replicator;
pub mod session;
pub mod transport;

pub use error::{ReplicationError, Result};
pub use messages::{LogHead, ReplicationMessage, PROTOCOL_VERSION};
pub use replicator::{ReplicationReport, Replicator};
pub use session::{LogStatus, ReplicationSession, Status};
pub use transport::memory;
pub use transport::{discovery_topic, Connection, Discovery, Swarm, Topic};
