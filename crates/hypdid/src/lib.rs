//! # hypdid
//!
//! A decentralized identifier registry over append-only replicated logs.
//!
//! Each DID is `did:hyp:` followed by the base64url encoding of an Ed25519
//! public key, and resolves to a document folded from the event log written
//! under that key. Peers holding copies of the logs converge by replicating
//! over a shared discovery topic.
//!
//! [`DidClient`] is the entry point: it binds a log store and a swarm
//! together and exposes create / get / resolve / history plus the session
//! lifecycle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use hypdid::{ClientConfig, DidClient};
//! use hypdid_store::MemoryLogStore;
//! use hypdid_swarm::memory::MemoryNet;
//! use serde_json::{json, Map};
//!
//! # async fn demo() -> hypdid::Result<()> {
//! let config = ClientConfig::new("/var/lib/hypdid");
//! let store = Arc::new(MemoryLogStore::new());
//! let net = MemoryNet::new();
//! let swarm = Arc::new(net.create_swarm(&config.identity_keypair()));
//!
//! let client = DidClient::new(config, store, swarm);
//! client.connect().await?;
//!
//! let mut metadata = Map::new();
//! metadata.insert("type".into(), json!("profile"));
//! let ledger = client.create(metadata).await?;
//! println!("created {}", ledger.did());
//!
//! client.destroy().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::DidClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};

// The pieces callers need alongside the client.
pub use hypdid_core::{Did, Event, Header, Keypair, PublicKey};
pub use hypdid_ledger::Ledger;
pub use hypdid_swarm::{discovery_topic, LogStatus, Status, Topic};
