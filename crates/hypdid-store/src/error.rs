//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during log store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Read past the current end of a log.
    #[error("index {index} out of range: log length is {length}")]
    IndexOutOfRange { index: u64, length: u64 },

    /// Append attempted on a log opened without its secret key.
    #[error("log is not writable")]
    NotWritable,

    /// Replication handed us a record that does not extend the log.
    #[error("non-contiguous ingest at index {index}: log length is {length}")]
    NonContiguousIngest { index: u64, length: u64 },

    /// The store has been torn down.
    #[error("store is closed")]
    Closed,

    /// Backend I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
