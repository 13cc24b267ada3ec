//! Replication wire messages.
//!
//! Exchanged over a peer connection to converge two log stores. Frames are
//! CBOR-encoded; the transport below them handles encryption and delivery.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use hypdid_core::PublicKey;

use crate::error::{ReplicationError, Result};

/// Current replication protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Max records carried by one `Records` frame.
pub const MAX_RECORDS_PER_MESSAGE: usize = 64;

/// Replication protocol messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplicationMessage {
    /// Introduce yourself.
    Hello {
        /// The sender's swarm identity.
        public_key: PublicKey,
        /// Protocol version for compatibility checking.
        protocol_version: u8,
    },

    /// Advertise every local log and its length. Whole store, no subset
    /// negotiation. Re-sent whenever a local log grows.
    Heads { heads: Vec<LogHead> },

    /// Request the record range `[start, end)` of one log.
    Need {
        key: PublicKey,
        start: u64,
        end: u64,
    },

    /// Provide consecutive raw records of one log starting at `start`.
    Records {
        key: PublicKey,
        start: u64,
        records: Vec<Vec<u8>>,
    },
}

impl ReplicationMessage {
    /// Encode to a wire frame.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ReplicationError::Codec(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    /// Decode a wire frame.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(frame).map_err(|e| ReplicationError::Codec(e.to_string()))
    }
}

/// Advertised head of one log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHead {
    pub key: PublicKey,
    pub length: u64,
}
