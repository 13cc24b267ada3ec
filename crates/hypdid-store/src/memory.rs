//! In-memory implementation of the log store.
//!
//! Reference backend for tests and examples. Same semantics as a persistent
//! engine but everything lives in process memory. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use hypdid_core::{Keypair, PublicKey};

use crate::error::{Result, StoreError};
use crate::traits::{Log, LogInfo, LogStore};

/// In-memory multi-log store.
#[derive(Default)]
pub struct MemoryLogStore {
    logs: RwLock<HashMap<PublicKey, Arc<MemoryLog>>>,
}

impl MemoryLogStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
        }
    }

    fn open_inner(&self, key: &PublicKey) -> Arc<MemoryLog> {
        let mut logs = self.logs.write().unwrap();
        Arc::clone(logs.entry(*key).or_insert_with(|| {
            Arc::new(MemoryLog {
                key: *key,
                writable: AtomicBool::new(false),
                records: RwLock::new(Vec::new()),
            })
        }))
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn open(&self, key: &PublicKey) -> Result<Arc<dyn Log>> {
        Ok(self.open_inner(key))
    }

    async fn open_writable(&self, keypair: &Keypair) -> Result<Arc<dyn Log>> {
        let log = self.open_inner(&keypair.public_key());
        log.writable.store(true, Ordering::SeqCst);
        Ok(log)
    }

    async fn list(&self) -> Result<Vec<LogInfo>> {
        let logs = self.logs.read().unwrap();
        Ok(logs
            .values()
            .map(|log| LogInfo {
                key: log.key,
                length: log.records.read().unwrap().len() as u64,
            })
            .collect())
    }

    async fn ingest(&self, key: &PublicKey, index: u64, record: Bytes) -> Result<bool> {
        let log = self.open_inner(key);
        let mut records = log.records.write().unwrap();
        let length = records.len() as u64;

        if index < length {
            return Ok(false);
        }
        if index > length {
            return Err(StoreError::NonContiguousIngest { index, length });
        }

        records.push(record);
        debug!(key = %key, index, "ingested replicated record");
        Ok(true)
    }
}

/// One in-memory append-only log.
pub struct MemoryLog {
    key: PublicKey,
    writable: AtomicBool,
    records: RwLock<Vec<Bytes>>,
}

#[async_trait]
impl Log for MemoryLog {
    fn key(&self) -> PublicKey {
        self.key
    }

    fn writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    async fn length(&self) -> Result<u64> {
        Ok(self.records.read().unwrap().len() as u64)
    }

    async fn append(&self, records: Vec<Bytes>) -> Result<u64> {
        if !self.writable() {
            return Err(StoreError::NotWritable);
        }
        let mut stored = self.records.write().unwrap();
        stored.extend(records);
        Ok(stored.len() as u64)
    }

    async fn get(&self, index: u64) -> Result<Bytes> {
        let records = self.records.read().unwrap();
        records
            .get(index as usize)
            .cloned()
            .ok_or(StoreError::IndexOutOfRange {
                index,
                length: records.len() as u64,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypdid_core::Keypair;

    #[tokio::test]
    async fn test_append_and_get() {
        let store = MemoryLogStore::new();
        let keypair = Keypair::generate();

        let log = store.open_writable(&keypair).await.unwrap();
        let length = log
            .append(vec![Bytes::from("a"), Bytes::from("b")])
            .await
            .unwrap();
        assert_eq!(length, 2);
        assert_eq!(log.get(0).await.unwrap(), Bytes::from("a"));
        assert_eq!(log.get(1).await.unwrap(), Bytes::from("b"));
    }

    #[tokio::test]
    async fn test_get_out_of_range() {
        let store = MemoryLogStore::new();
        let log = store.open(&PublicKey([1; 32])).await.unwrap();

        match log.get(0).await {
            Err(StoreError::IndexOutOfRange { index: 0, length: 0 }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_readonly_log_rejects_append() {
        let store = MemoryLogStore::new();
        let log = store.open(&PublicKey([2; 32])).await.unwrap();
        assert!(!log.writable());
        assert!(matches!(
            log.append(vec![Bytes::from("x")]).await,
            Err(StoreError::NotWritable)
        ));
    }

    #[tokio::test]
    async fn test_ingest_idempotent() {
        let store = MemoryLogStore::new();
        let key = PublicKey([3; 32]);

        assert!(store.ingest(&key, 0, Bytes::from("r0")).await.unwrap());
        assert!(!store.ingest(&key, 0, Bytes::from("r0")).await.unwrap());
        assert!(store.ingest(&key, 1, Bytes::from("r1")).await.unwrap());

        let log = store.open(&key).await.unwrap();
        assert_eq!(log.length().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_rejects_gap() {
        let store = MemoryLogStore::new();
        let key = PublicKey([4; 32]);

        assert!(matches!(
            store.ingest(&key, 5, Bytes::from("r5")).await,
            Err(StoreError::NonContiguousIngest { index: 5, length: 0 })
        ));
    }

    #[tokio::test]
    async fn test_list() {
        let store = MemoryLogStore::new();
        let keypair = Keypair::generate();
        let log = store.open_writable(&keypair).await.unwrap();
        log.append(vec![Bytes::from("a")]).await.unwrap();
        store.open(&PublicKey([9; 32])).await.unwrap();

        let mut infos = store.list().await.unwrap();
        infos.sort_by_key(|i| i.length);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].length, 0);
        assert_eq!(infos[1].key, keypair.public_key());
        assert_eq!(infos[1].length, 1);
    }

    #[tokio::test]
    async fn test_open_same_key_shares_log() {
        let store = MemoryLogStore::new();
        let keypair = Keypair::generate();

        let writer = store.open_writable(&keypair).await.unwrap();
        writer.append(vec![Bytes::from("a")]).await.unwrap();

        let reader = store.open(&keypair.public_key()).await.unwrap();
        assert_eq!(reader.length().await.unwrap(), 1);
    }
}
