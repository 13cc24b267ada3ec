//! Error types for the replication module.
//!
//! `ReplicationError` is `Clone` so the session's memoized readiness outcome
//! can be handed to every caller that awaits it.

use thiserror::Error;

use hypdid_store::StoreError;

/// Errors that can occur during swarm replication.
#[derive(Debug, Clone, Error)]
pub enum ReplicationError {
    /// Swarm join or connection failure. Surfaced as-is; retry policy
    /// belongs to the caller.
    #[error("replication failure: {0}")]
    ReplicationFailure(String),

    /// Protocol version mismatch with peer.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u8, peer: u8 },

    /// A wire frame failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(String),

    /// The peer connection closed mid-exchange.
    #[error("connection closed")]
    ConnectionClosed,

    /// Log store failure while serving or ingesting records.
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for ReplicationError {
    fn from(e: StoreError) -> Self {
        ReplicationError::Store(e.to_string())
    }
}

/// Result type for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;
