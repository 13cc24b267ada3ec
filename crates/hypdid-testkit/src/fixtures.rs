//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use hypdid_core::{Did, Event, Keypair, PublicKey};
use hypdid_ledger::Ledger;
use hypdid_store::{LogStore, MemoryLogStore};

/// A test fixture with a keypair and memory log store.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: Arc<MemoryLogStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            store: Arc::new(MemoryLogStore::new()),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            store: Arc::new(MemoryLogStore::new()),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// The DID for this fixture's key.
    pub fn did(&self) -> Did {
        Did::from_key(&self.keypair.public_key())
    }

    /// Open a writable, uninitialized ledger for this fixture's DID.
    pub async fn writable_ledger(&self) -> hypdid_ledger::Result<Ledger> {
        let log = self.store.open_writable(&self.keypair).await?;
        Ok(Ledger::new(self.did(), log))
    }

    /// Open a writable ledger and write its header record.
    pub async fn initialized_ledger(&self, doc_type: &str) -> hypdid_ledger::Result<Ledger> {
        let mut ledger = self.writable_ledger().await?;
        ledger.initialize(self.metadata(doc_type)).await?;
        Ok(ledger)
    }

    /// Header metadata with the given document type.
    pub fn metadata(&self, doc_type: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".to_string(), json!(doc_type));
        map
    }

    /// A payload-wrapped event setting one document field.
    pub fn payload_event(&self, field: &str, value: impl Into<Value>) -> Event {
        let value: Value = value.into();
        json!({ "payload": { field: value } })
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
