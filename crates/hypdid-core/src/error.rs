//! Error types for hypdid core.

use thiserror::Error;

/// Errors from parsing or encoding identifiers.
#[derive(Debug, Error)]
pub enum DidError {
    #[error("invalid did format: {0:?}")]
    InvalidDidFormat(String),

    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),
}

/// Core errors that can occur during record operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("corrupt record at index {index}: {reason}")]
    CorruptRecord { index: u64, reason: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,
}
