//! Log and LogStore traits: the abstract interface for append-only storage.
//!
//! These traits let the registry stay storage-agnostic. A `Log` is an
//! append-only sequence of raw records owned by exactly one keypair; a
//! `LogStore` addresses many logs by their public key and is the unit the
//! replication session synchronizes as a whole.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hypdid_core::{Keypair, PublicKey};

use crate::error::Result;

/// Key and length of one registered log, as reported by [`LogStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogInfo {
    pub key: PublicKey,
    pub length: u64,
}

/// One append-only, single-writer, multi-reader log.
///
/// # Design Notes
///
/// - **Monotonic length**: `append` returns the new length; a single writer
///   always observes strictly increasing lengths.
/// - **Immutable records**: there is no update or delete. Replication may
///   only extend a log, never rewrite it.
#[async_trait]
pub trait Log: Send + Sync {
    /// The log's own public key.
    fn key(&self) -> PublicKey;

    /// Whether this handle holds the secret key and may append.
    fn writable(&self) -> bool;

    /// Current record count.
    async fn length(&self) -> Result<u64>;

    /// Append a batch of records, returning the new length.
    async fn append(&self, records: Vec<Bytes>) -> Result<u64>;

    /// Read the raw record at `index`.
    ///
    /// Fails with [`StoreError::IndexOutOfRange`] past the current end.
    ///
    /// [`StoreError::IndexOutOfRange`]: crate::StoreError::IndexOutOfRange
    async fn get(&self, index: u64) -> Result<Bytes>;
}

/// A multi-log container addressing logs by public key.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Open the log for `key` read-only, registering it if unknown.
    async fn open(&self, key: &PublicKey) -> Result<Arc<dyn Log>>;

    /// Open the log owned by `keypair` with append rights.
    async fn open_writable(&self, keypair: &Keypair) -> Result<Arc<dyn Log>>;

    /// Enumerate all registered logs.
    async fn list(&self) -> Result<Vec<LogInfo>>;

    /// Ingest a replicated record at `index`.
    ///
    /// Idempotent: returns `false` if the record is already present. The
    /// record must extend the log contiguously.
    async fn ingest(&self, key: &PublicKey, index: u64, record: Bytes) -> Result<bool>;
}
