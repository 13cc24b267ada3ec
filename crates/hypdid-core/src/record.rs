//! The record format for per-DID event logs.
//!
//! A record is immutable once appended. Index order is the only ordering;
//! there is no per-record causal metadata. Records are self-describing JSON
//! so any implementation can read a replicated log.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Format version stamped on every appended record.
pub const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `eventType` of the mandatory header record at index 0.
pub const INIT_EVENT_TYPE: &str = "init";

/// An event payload. Arbitrary structured data; the fold in the ledger only
/// looks at an event's `payload` sub-object.
pub type Event = Value;

/// One immutable element of a log: a format-version tag, an append
/// timestamp (unix milliseconds), and the event itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub version: String,
    pub at: i64,
    pub event: Event,
}

impl Record {
    /// Wrap an event for appending, stamped with the current time.
    pub fn new(event: Event) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            at: now_millis(),
            event,
        }
    }

    /// Serialize to the on-log byte form.
    pub fn to_bytes(&self) -> Result<Bytes, CoreError> {
        let raw = serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(Bytes::from(raw))
    }

    /// Parse a raw record read from index `index`.
    pub fn from_bytes(index: u64, bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::CorruptRecord {
            index,
            reason: e.to_string(),
        })
    }
}

/// Build the header event `{"eventType": "init", ...metadata}`.
pub fn header_event(metadata: Map<String, Value>) -> Event {
    let mut event = Map::new();
    event.insert("eventType".to_string(), Value::from(INIT_EVENT_TYPE));
    for (k, v) in metadata {
        event.insert(k, v);
    }
    Value::Object(event)
}

/// Parsed view of the record at index 0.
///
/// The header establishes the document's declared type. Its own fields are
/// metadata, not document state; they never take part in the fold.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    event: Map<String, Value>,
}

impl Header {
    /// Interpret a record 0 event as the header.
    pub fn from_record(record: &Record) -> Result<Self, CoreError> {
        match &record.event {
            Value::Object(map) => Ok(Self { event: map.clone() }),
            other => Err(CoreError::CorruptRecord {
                index: 0,
                reason: format!("header event is not an object: {other}"),
            }),
        }
    }

    /// The declared `eventType` of the header, if present.
    pub fn event_type(&self) -> Option<&str> {
        self.event.get("eventType").and_then(Value::as_str)
    }

    /// The document type declared by the header's `type` field.
    pub fn doc_type(&self) -> Option<&str> {
        self.event.get("type").and_then(Value::as_str)
    }

    /// Access an arbitrary header metadata field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.event.get(field)
    }
}

/// Current time in unix milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
