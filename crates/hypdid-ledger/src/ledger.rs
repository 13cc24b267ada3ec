//! Per-DID ledger over one append-only log.

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::debug;

use hypdid_core::{header_event, Did, Event, Header, PublicKey, Record};
use hypdid_store::{Log, StoreError};

use crate::error::{LedgerError, Result};

/// In-memory handle bound to exactly one DID and one underlying log.
///
/// The ledger owns its cached header/type view; it does not own the log.
/// Dropping a ledger loses nothing but the cache.
///
/// Lifecycle: `Unloaded` until the first [`update`](Ledger::update); then
/// `Loaded` and either uninitialized (length 0) or initialized. The only
/// transition to initialized is [`initialize`](Ledger::initialize), exactly
/// once per DID. Initialized is terminal; the log only grows. Revocation,
/// where used, is just another appended event.
pub struct Ledger {
    did: Did,
    public_key: PublicKey,
    log: Arc<dyn Log>,
    loaded: bool,
    initialized: bool,
    header: Option<Header>,
    doc_type: Option<String>,
}

impl Ledger {
    /// Bind a DID to a log. Performs no I/O.
    pub fn new(did: Did, log: Arc<dyn Log>) -> Self {
        let public_key = did.public_key();
        Self {
            did,
            public_key,
            log,
            loaded: false,
            initialized: false,
            header: None,
            doc_type: None,
        }
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Whether the header has been read.
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// Whether the log holds at least the header record.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// The parsed header event, if loaded and initialized.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The document type declared by the header.
    pub fn doc_type(&self) -> Option<&str> {
        self.doc_type.as_deref()
    }

    pub fn writable(&self) -> bool {
        self.log.writable()
    }

    pub async fn length(&self) -> Result<u64> {
        Ok(self.log.length().await?)
    }

    /// Refresh the cached view from the log.
    ///
    /// Verifies the key binding, then reads the header record if the log is
    /// non-empty. Idempotent: with no intervening append, repeated calls
    /// observe identical state.
    pub async fn update(&mut self) -> Result<()> {
        let log_key = self.log.key();
        if log_key != self.public_key {
            return Err(LedgerError::KeyBindingMismatch {
                did_key: self.public_key,
                log_key,
            });
        }

        let length = self.log.length().await?;
        self.initialized = length > 0;
        if self.initialized {
            let raw = self.log.get(0).await?;
            let record = Record::from_bytes(0, &raw)?;
            let header = Header::from_record(&record)?;
            self.doc_type = header.doc_type().map(str::to_owned);
            self.header = Some(header);
        }
        self.loaded = true;
        Ok(())
    }

    /// Whether this DID's log has been initialized.
    pub async fn exists(&mut self) -> Result<bool> {
        self.update().await?;
        Ok(self.initialized)
    }

    /// Write the header record, transitioning the log to initialized.
    ///
    /// This must happen exactly once per DID; a second call fails with
    /// [`LedgerError::AlreadyInitialized`].
    pub async fn initialize(&mut self, metadata: Map<String, Value>) -> Result<()> {
        self.update().await?;
        if self.initialized {
            return Err(LedgerError::AlreadyInitialized(self.did.clone()));
        }
        self.append(vec![header_event(metadata)]).await?;
        Ok(())
    }

    /// Append events, each wrapped with a format-version tag and timestamp.
    ///
    /// Returns the new log length. Ordering comes from the log's own append
    /// serialization; no local queuing is added.
    pub async fn append(&self, events: Vec<Event>) -> Result<u64> {
        let mut records = Vec::with_capacity(events.len());
        for event in events {
            records.push(Record::new(event).to_bytes()?);
        }
        Ok(self.log.append(records).await?)
    }

    /// Read the inner event payload of the record at `index`.
    pub async fn get_event(&self, index: u64) -> Result<Event> {
        let raw = match self.log.get(index).await {
            Err(StoreError::IndexOutOfRange { index, length }) => {
                return Err(LedgerError::IndexOutOfRange { index, length })
            }
            other => other?,
        };
        let record = Record::from_bytes(index, &raw)?;
        Ok(record.event)
    }

    /// All event payloads from index 0 to the current length, in order.
    ///
    /// Records are fetched concurrently; the result preserves index order.
    pub async fn events(&mut self) -> Result<Vec<Event>> {
        self.update().await?;
        let length = self.log.length().await?;
        try_join_all((0..length).map(|index| self.get_event(index))).await
    }

    /// Fold the event sequence into the resolved document value.
    ///
    /// Starting from an empty mapping, each event's `payload` sub-object is
    /// shallow-merged in index order: later keys overwrite earlier ones.
    /// Events without a `payload` field contribute nothing, the header
    /// included.
    pub async fn value(&mut self) -> Result<Value> {
        let events = self.events().await?;
        debug!(did = %self.did, events = events.len(), "folding document value");

        let mut value = Map::new();
        for event in &events {
            if let Some(payload) = event.get("payload").and_then(Value::as_object) {
                for (field, v) in payload {
                    value.insert(field.clone(), v.clone());
                }
            }
        }
        Ok(Value::Object(value))
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("did", &self.did)
            .field("loaded", &self.loaded)
            .field("initialized", &self.initialized)
            .field("doc_type", &self.doc_type)
            .finish()
    }
}
