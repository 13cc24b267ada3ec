//! The unified DID client.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use hypdid_core::{Did, Event, Keypair};
use hypdid_ledger::Ledger;
use hypdid_store::LogStore;
use hypdid_swarm::{ReplicationSession, Status, Swarm};

use crate::config::ClientConfig;
use crate::error::Result;

/// Creates, resolves, and replicates DID documents.
///
/// Binds one log store and one swarm. Local reads and writes work without
/// ever connecting; [`connect`](Self::connect) is only needed to exchange
/// records with peers.
///
/// Teardown on process signals is the caller's concern: register
/// [`destroy`](Self::destroy) in a shutdown hook if the process can be
/// interrupted while connected.
pub struct DidClient<S: LogStore + 'static, T: Swarm + 'static> {
    config: ClientConfig,
    store: Arc<S>,
    session: ReplicationSession<S, T>,
}

impl<S: LogStore + 'static, T: Swarm + 'static> DidClient<S, T> {
    pub fn new(config: ClientConfig, store: Arc<S>, swarm: Arc<T>) -> Self {
        let session = ReplicationSession::new(Arc::clone(&store), swarm, config.topic);
        Self {
            config,
            store,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The node's own swarm identity.
    pub fn identity(&self) -> Keypair {
        self.config.identity_keypair()
    }

    /// Create a new DID with a fresh keypair and write its header record.
    ///
    /// Returns the writable ledger for the new DID. Metadata lands in the
    /// header event; a `type` field there becomes the document type.
    pub async fn create(&self, metadata: Map<String, Value>) -> Result<Ledger> {
        let keypair = Keypair::generate();
        let did = Did::from_key(&keypair.public_key());
        let log = self.store.open_writable(&keypair).await?;

        let mut ledger = Ledger::new(did, log);
        ledger.initialize(metadata).await?;
        debug!(did = %ledger.did(), "created");
        Ok(ledger)
    }

    /// Open the ledger for a DID and load its current state.
    ///
    /// Works for any DID, local or replicated; the ledger may turn out
    /// uninitialized if no records have arrived yet.
    pub async fn get(&self, did: &Did) -> Result<Ledger> {
        let log = self.store.open(&did.public_key()).await?;
        let mut ledger = Ledger::new(did.clone(), log);
        ledger.update().await?;
        Ok(ledger)
    }

    /// Resolve a DID to its folded document value.
    ///
    /// `None` if no records for the DID are known locally.
    pub async fn resolve(&self, did: &Did) -> Result<Option<Value>> {
        let mut ledger = self.get(did).await?;
        if !ledger.initialized() {
            return Ok(None);
        }
        Ok(Some(ledger.value().await?))
    }

    /// The full event history of a DID, header first.
    pub async fn history(&self, did: &Did) -> Result<Vec<Event>> {
        let mut ledger = self.get(did).await?;
        Ok(ledger.events().await?)
    }

    /// Join the discovery topic and start replicating. Memoized; see
    /// [`ReplicationSession::connect`].
    pub async fn connect(&self) -> Result<()> {
        Ok(self.session.connect().await?)
    }

    /// Await the session being connected.
    pub async fn ready(&self) -> Result<()> {
        Ok(self.session.ready().await?)
    }

    /// Tear down the swarm attachment. No-op if never connected.
    pub async fn destroy(&self) -> Result<()> {
        Ok(self.session.destroy().await?)
    }

    /// Snapshot peer and store state.
    pub async fn status(&self) -> Result<Status> {
        Ok(self.session.status().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypdid_core::DidError;
    use hypdid_store::MemoryLogStore;
    use hypdid_swarm::memory::{MemoryNet, MemorySwarm};
    use serde_json::json;
    use std::str::FromStr;

    fn test_client() -> DidClient<MemoryLogStore, MemorySwarm> {
        let config = ClientConfig::new("/tmp/hypdid-test");
        let store = Arc::new(MemoryLogStore::new());
        let net = MemoryNet::new();
        let swarm = Arc::new(net.create_swarm(&config.identity_keypair()));
        DidClient::new(config, store, swarm)
    }

    fn metadata(doc_type: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".to_string(), json!(doc_type));
        map
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let client = test_client();
        let ledger = client.create(metadata("profile")).await.unwrap();
        let did = ledger.did().clone();

        ledger
            .append(vec![json!({"payload": {"name": "Alice"}})])
            .await
            .unwrap();

        let value = client.resolve(&did).await.unwrap().unwrap();
        assert_eq!(value, json!({"name": "Alice"}));
    }

    #[tokio::test]
    async fn test_resolve_unknown_did_is_none() {
        let client = test_client();
        let did = Did::from_key(&Keypair::generate().public_key());
        assert!(client.resolve(&did).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_is_ordered() {
        let client = test_client();
        let ledger = client.create(metadata("profile")).await.unwrap();
        ledger
            .append(vec![
                json!({"payload": {"a": 1}}),
                json!({"payload": {"b": 2}}),
            ])
            .await
            .unwrap();

        let events = client.history(ledger.did()).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["eventType"], "init");
        assert_eq!(events[1]["payload"]["a"], 1);
        assert_eq!(events[2]["payload"]["b"], 2);
    }

    #[tokio::test]
    async fn test_get_reopens_writable_ledger() {
        let client = test_client();
        let created = client.create(metadata("profile")).await.unwrap();

        let reopened = client.get(created.did()).await.unwrap();
        assert!(reopened.initialized());
        assert!(reopened.writable());
        assert_eq!(reopened.doc_type(), Some("profile"));
    }

    #[test]
    fn test_bad_did_string_rejected_before_lookup() {
        assert!(matches!(
            Did::from_str("did:web:alice"),
            Err(DidError::InvalidDidFormat(_))
        ));
    }
}
