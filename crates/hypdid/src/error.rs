//! Client-level error aggregation.

use thiserror::Error;

use hypdid_core::DidError;
use hypdid_ledger::LedgerError;
use hypdid_store::StoreError;
use hypdid_swarm::ReplicationError;

/// Errors surfaced by [`DidClient`](crate::DidClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Did(#[from] DidError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
