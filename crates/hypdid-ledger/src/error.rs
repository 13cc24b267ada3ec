//! Error types for the ledger module.

use thiserror::Error;

use hypdid_core::{CoreError, Did, PublicKey};
use hypdid_store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The log's own key disagrees with the DID-derived key. Storage
    /// corruption; never retried.
    #[error("key binding mismatch: did key {did_key:?}, log key {log_key:?}")]
    KeyBindingMismatch {
        did_key: PublicKey,
        log_key: PublicKey,
    },

    /// A second `initialize` on an already-initialized DID. Caller error.
    #[error("{0} already initialized")]
    AlreadyInitialized(Did),

    /// Read past the current log length.
    #[error("index {index} out of range: length is {length}")]
    IndexOutOfRange { index: u64, length: u64 },

    /// A record failed to parse. Fatal for that read.
    #[error(transparent)]
    Corrupt(#[from] CoreError),

    /// Underlying log storage failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
