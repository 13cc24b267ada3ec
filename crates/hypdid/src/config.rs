//! Client configuration.

use hypdid_core::{derive_seed, Keypair};
use hypdid_swarm::{discovery_topic, Topic};

/// Configuration for a [`DidClient`](crate::DidClient).
///
/// The storage path doubles as the identity seed source: the same path
/// always yields the same swarm identity, so a restarted node rejoins the
/// network as itself.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Local storage root, also the identity seed source.
    pub storage_path: String,
    /// Discovery topic to replicate on.
    pub topic: Topic,
}

impl ClientConfig {
    /// Config with the default discovery topic.
    pub fn new(storage_path: impl Into<String>) -> Self {
        Self {
            storage_path: storage_path.into(),
            topic: discovery_topic(),
        }
    }

    /// Replace the discovery topic.
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }

    /// The deterministic identity seed for this storage path.
    pub fn identity_seed(&self) -> [u8; 32] {
        derive_seed(&self.storage_path)
    }

    /// The swarm identity keypair for this storage path.
    pub fn identity_keypair(&self) -> Keypair {
        Keypair::from_seed(&self.identity_seed())
    }
}
